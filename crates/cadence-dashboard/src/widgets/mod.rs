//! Dashboard widgets
//!
//! Each widget renders one panel from [`DashboardState`](crate::DashboardState)
//! through a static `render(state, area, buf)` method.

use cadence_core::RunState;
use ratatui::style::Color;

mod account_panel;
mod event_log;
mod quota_panel;
mod status_bar;

pub use account_panel::AccountPanelWidget;
pub use event_log::EventLogWidget;
pub use quota_panel::QuotaPanelWidget;
pub use status_bar::StatusBarWidget;

/// Convert a color name (from `StatusLevel::color_name()`) to a ratatui color
pub fn status_color_from_name(color_name: &str) -> Color {
    match color_name {
        "gray" => Color::DarkGray,
        "cyan" => Color::Cyan,
        "yellow" => Color::Yellow,
        "green" => Color::Green,
        "red" => Color::Red,
        _ => Color::White,
    }
}

pub fn run_state_color(state: RunState) -> Color {
    match state {
        RunState::Stopped => Color::DarkGray,
        RunState::Running => Color::Green,
        RunState::Paused => Color::Yellow,
        RunState::ErrorPaused => Color::Red,
    }
}
