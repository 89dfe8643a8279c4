//! Event handling for crossterm terminal events
//!
//! Polls for keyboard, resize, and tick events and maps keys to commands.

use crate::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

/// Application events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// Key press event
    Key(KeyEvent),
    /// Timer tick for redraws
    Tick,
    /// Terminal resize event
    Resize(u16, u16),
}

/// What a key asks the app to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    ToggleHelp,
    ToggleInfo,
    ClearLog,
    Quit,
}

/// Poll for the next event with timeout
pub fn poll_event(timeout: Duration) -> Result<Option<AppEvent>> {
    if event::poll(timeout)? {
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(AppEvent::Key(key))),
            Event::Resize(width, height) => Ok(Some(AppEvent::Resize(width, height))),
            _ => Ok(Some(AppEvent::Tick)),
        }
    } else {
        Ok(Some(AppEvent::Tick))
    }
}

/// Check if a key event is a quit command (q or Ctrl+C)
pub fn is_quit_event(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

/// Map a key press to a command
pub fn command_for_key(key: KeyEvent) -> Option<Command> {
    if is_quit_event(key) {
        return Some(Command::Quit);
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }

    match key.code {
        KeyCode::Char('s') | KeyCode::Char('S') => Some(Command::Start),
        KeyCode::Char('p') | KeyCode::Char('P') => Some(Command::Pause),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Command::Resume),
        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => Some(Command::ToggleHelp),
        KeyCode::Char('i') | KeyCode::Char('I') => Some(Command::ToggleInfo),
        KeyCode::Char('c') | KeyCode::Char('C') => Some(Command::ClearLog),
        _ => None,
    }
}
