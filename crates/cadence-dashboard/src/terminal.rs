//! Raw mode and alternate screen handling
//!
//! The dashboard owns the whole terminal while it runs. [`TerminalGuard`]
//! and the panic hook installed by [`init`] make sure the shell gets its
//! screen back however the dashboard exits.

use crate::Result;
use cadence_core::CadenceError;
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::Once;

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

static PANIC_HOOK: Once = Once::new();

fn dashboard_err(step: &'static str) -> impl FnOnce(io::Error) -> CadenceError {
    move |e| CadenceError::Dashboard(format!("Failed to {}: {}", step, e))
}

/// Switch to raw mode on the alternate screen
pub fn init() -> Result<Tui> {
    install_panic_hook();

    enable_raw_mode().map_err(dashboard_err("enable raw mode"))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)
        .map_err(dashboard_err("enter alternate screen"))?;

    Terminal::new(CrosstermBackend::new(stdout)).map_err(dashboard_err("create terminal"))
}

/// Leave the alternate screen and raw mode
pub fn restore() -> Result<()> {
    execute!(io::stdout(), Show, LeaveAlternateScreen)
        .map_err(dashboard_err("leave alternate screen"))?;
    disable_raw_mode().map_err(dashboard_err("disable raw mode"))
}

/// Restore the screen before the default hook prints the panic message
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = restore();
            previous(info);
        }));
    });
}

/// Restores the terminal when dropped
#[derive(Default)]
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn new() -> Self {
        Self
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Nothing useful to do with an error here
        let _ = restore();
    }
}
