//! # cadence-dashboard
//!
//! Terminal dashboard for a Cadence session.
//!
//! Keys drive the session (`s` start, `p` pause, `r` resume) and the panels
//! show what the engine reports through [`DashboardSink`].
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ CADENCE  Session: 3f2a9c1e     [s]start [p]pause [r]resume … │
//! ├──────────────────────────────────────────────────────────────┤
//! │ STATUS   RUNNING   12:00:03  Message sent (14 total)         │
//! ├────────────────────────────────────┬─────────────────────────┤
//! │ ACCOUNT                            │ QUOTA                   │
//! │ User:   alice                      │ [██████░░░] 40/100 left │
//! │ Points: 150 (inference 100, ...)   │ Resets at 14:00:00      │
//! ├────────────────────────────────────┴─────────────────────────┤
//! │ EVENTS                                                       │
//! │ 12:00:03  Message sent (14 total)                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod app;
mod event;
mod run;
mod sink;
mod state;
mod terminal;
mod ui;
mod widgets;

pub use app::{App, Overlay};
pub use cadence_core::{CadenceError, Result};
pub use event::Command;
pub use run::run;
pub use sink::{channel, DashboardSink};
pub use state::{format_countdown, DashboardConfig, DashboardState, LogEntry, UiEvent};
pub use widgets::{AccountPanelWidget, EventLogWidget, QuotaPanelWidget, StatusBarWidget};
