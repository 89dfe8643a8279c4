//! Main application state and logic
//!
//! The `App` owns the dashboard state, drains engine reports into it and
//! turns key commands into session calls.

use crate::event::Command;
use crate::sink::DashboardSink;
use crate::state::{DashboardConfig, DashboardState, UiEvent};
use cadence_core::{StatusLevel, StatusSink};
use cadence_engine::{Session, SessionSnapshot};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Popup drawn over the main view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    Help,
    Info,
}

/// Main application state
pub struct App {
    /// What the UI draws
    pub state: DashboardState,
    pub config: DashboardConfig,
    /// Latest session counters
    pub snapshot: Option<SessionSnapshot>,
    pub overlay: Overlay,
    /// Signal to exit the application
    pub should_quit: bool,
    session: Session,
    sink: DashboardSink,
    events: UnboundedReceiver<UiEvent>,
    /// Start/pause/resume, run in key-press order by one worker task
    controls: UnboundedSender<Command>,
    last_refresh: Option<Instant>,
}

impl App {
    pub fn new(
        session: Session,
        sink: DashboardSink,
        events: UnboundedReceiver<UiEvent>,
        config: DashboardConfig,
    ) -> Self {
        let controls = spawn_control_worker(session.clone());
        Self {
            state: DashboardState::new(config.max_log_entries),
            config,
            snapshot: None,
            overlay: Overlay::None,
            should_quit: false,
            session,
            sink,
            events,
            controls,
            last_refresh: None,
        }
    }

    pub fn session_id(&self) -> &str {
        self.session.id()
    }

    /// Apply every pending engine report; returns how many were applied
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            self.state.apply(event);
            applied += 1;
        }
        applied
    }

    /// Check if refresh interval has elapsed
    pub fn should_refresh(&self) -> bool {
        self.last_refresh
            .map_or(true, |at| at.elapsed() >= Duration::from_millis(self.config.refresh_ms))
    }

    /// Pull a fresh session snapshot
    pub async fn refresh(&mut self) {
        self.snapshot = Some(self.session.snapshot().await);
        self.last_refresh = Some(Instant::now());
    }

    /// Carry out a key command
    ///
    /// Session calls are queued to the control worker so input stays
    /// responsive while a start is logging in.
    pub fn dispatch(&mut self, command: Command) {
        debug!("Dashboard command: {:?}", command);
        match command {
            Command::Start | Command::Pause | Command::Resume => {
                if self.controls.send(command).is_err() {
                    warn!("Control worker gone, dropping {:?}", command);
                }
            }
            Command::ToggleHelp => self.toggle_overlay(Overlay::Help),
            Command::ToggleInfo => {
                self.toggle_overlay(Overlay::Info);
                if self.overlay == Overlay::Info {
                    self.load_user_info();
                }
            }
            Command::ClearLog => self.state.clear_log(),
            Command::Quit => self.should_quit = true,
        }
    }

    fn toggle_overlay(&mut self, overlay: Overlay) {
        self.overlay = if self.overlay == overlay {
            Overlay::None
        } else {
            overlay
        };
    }

    fn load_user_info(&self) {
        let session = self.session.clone();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            match session.user(true).await {
                Ok(user) => sink.update_user(&user),
                Err(e) => sink.set_status(
                    &format!("Could not load user info: {}", e),
                    StatusLevel::Warning,
                ),
            }
        });
    }
}

/// Run session controls one at a time, in the order they were sent
fn spawn_control_worker(session: Session) -> UnboundedSender<Command> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Command>();
    tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Start => {
                    // Failure is already reported through the status sink
                    let _ = session.start().await;
                }
                Command::Pause => {
                    session.pause().await;
                }
                Command::Resume => {
                    session.resume().await;
                }
                _ => {}
            }
        }
    });
    tx
}
