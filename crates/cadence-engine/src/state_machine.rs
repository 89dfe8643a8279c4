//! Pure run-state machine for the control operations
//!
//! No I/O, no async. The session feeds events in and carries out the
//! returned actions.
//!
//! - `transition(state, event) -> (state, actions)` is deterministic
//! - Requests that make no sense in the current state leave it unchanged
//!   and emit a warning (never panic)

use cadence_core::{RunState, StatusLevel};

/// Events that drive the run state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// User asked to start
    StartRequested,
    /// Login and initial fetches completed
    StartSucceeded,
    /// Login or initial fetches failed
    StartFailed { error: String, transient: bool },
    /// User asked to pause
    PauseRequested,
    /// User asked to resume
    ResumeRequested { cooldown_active: bool },
    /// User asked to stop
    StopRequested,
    /// Failure threshold reached, long pause begins
    ErrorPauseBegan,
    /// Long pause elapsed
    ErrorPauseEnded,
    /// Unrecoverable error inside the loop
    Halted { reason: String },
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Log in and fetch the initial snapshots
    Bootstrap,
    /// Make sure one orchestration loop is running
    SpawnLoop,
    /// Try starting again after the auto-restart delay
    ScheduleAutoRestart,
    /// Show a status line
    SetStatus { text: String, level: StatusLevel },
    /// Request ignored
    Warn { message: String },
    /// Append to the activity log
    LogActivity { message: String },
}

fn status(text: impl Into<String>, level: StatusLevel) -> Action {
    Action::SetStatus {
        text: text.into(),
        level,
    }
}

fn ignored(message: impl Into<String>) -> Action {
    let message = message.into();
    Action::Warn { message }
}

/// Pure state transition function
pub fn transition(state: RunState, event: Event) -> (RunState, Vec<Action>) {
    use RunState::*;

    match (state, event) {
        (Stopped, Event::StartRequested) => (Stopped, vec![Action::Bootstrap]),
        (state, Event::StartRequested) => (
            state,
            vec![ignored(format!("Start ignored: already {}", state.label()))],
        ),

        (Stopped, Event::StartSucceeded) => (
            Running,
            vec![
                status("Running", StatusLevel::Success),
                Action::LogActivity {
                    message: "Session started".to_string(),
                },
                Action::SpawnLoop,
            ],
        ),
        (state, Event::StartSucceeded) => (state, vec![]),

        (_, Event::StartFailed { error, transient }) => {
            let mut actions = vec![
                status(format!("Start failed: {}", error), StatusLevel::Error),
                Action::LogActivity {
                    message: format!("Start failed: {}", error),
                },
            ];
            if transient {
                actions.push(Action::ScheduleAutoRestart);
            }
            (Stopped, actions)
        }

        (Running | ErrorPaused, Event::PauseRequested) => (
            Paused,
            vec![
                status("Paused", StatusLevel::Warning),
                Action::LogActivity {
                    message: "Session paused".to_string(),
                },
            ],
        ),
        (state, Event::PauseRequested) => (
            state,
            vec![ignored(format!("Pause ignored: session is {}", state.label()))],
        ),

        // Cooldown rejection holds in every state
        (state, Event::ResumeRequested { cooldown_active: true }) => (
            state,
            vec![status(
                "Resume rejected: quota cooldown is active",
                StatusLevel::Warning,
            )],
        ),
        (Paused, Event::ResumeRequested { .. }) => (
            Running,
            vec![
                status("Resumed", StatusLevel::Success),
                Action::LogActivity {
                    message: "Session resumed".to_string(),
                },
                Action::SpawnLoop,
            ],
        ),
        (state, Event::ResumeRequested { .. }) => (
            state,
            vec![ignored(format!("Resume ignored: session is {}", state.label()))],
        ),

        (Stopped, Event::StopRequested) => (Stopped, vec![]),
        (_, Event::StopRequested) => (
            Stopped,
            vec![
                status("Stopped", StatusLevel::Info),
                Action::LogActivity {
                    message: "Session stopped".to_string(),
                },
            ],
        ),

        (Running, Event::ErrorPauseBegan) => (ErrorPaused, vec![]),
        (state, Event::ErrorPauseBegan) => (state, vec![]),

        (ErrorPaused, Event::ErrorPauseEnded) => (
            Running,
            vec![status("Resuming after error pause", StatusLevel::Info)],
        ),
        (state, Event::ErrorPauseEnded) => (state, vec![]),

        (Stopped, Event::Halted { .. }) => (Stopped, vec![]),
        (_, Event::Halted { reason }) => (
            Stopped,
            vec![
                status(reason.clone(), StatusLevel::Error),
                Action::LogActivity {
                    message: format!("Session halted: {}", reason),
                },
            ],
        ),
    }
}
