//! Quota gauge with cooldown countdown

use crate::state::format_countdown;
use crate::DashboardState;
use chrono::{DateTime, Utc};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Gauge},
};

pub struct QuotaPanelWidget;

impl QuotaPanelWidget {
    pub fn render(state: &DashboardState, area: Rect, buf: &mut Buffer) {
        Self::render_at(state, Utc::now(), area, buf);
    }

    pub(crate) fn render_at(
        state: &DashboardState,
        now: DateTime<Utc>,
        area: Rect,
        buf: &mut Buffer,
    ) {
        let block = Block::default()
            .title(" QUOTA ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let inner = block.inner(area);
        block.render(area, buf);

        let Some(quota) = &state.quota else {
            buf.set_string(
                inner.x + 1,
                inner.y,
                "No quota data yet",
                Style::default().fg(Color::DarkGray),
            );
            return;
        };

        let ratio = quota.used_ratio().clamp(0.0, 1.0);
        let gauge_color = if quota.is_exhausted() {
            Color::Red
        } else if ratio >= 0.8 {
            Color::Yellow
        } else {
            Color::Green
        };

        if inner.height >= 1 {
            Gauge::default()
                .gauge_style(Style::default().fg(gauge_color))
                .ratio(ratio)
                .label(format!("{}/{} left", quota.remaining, quota.limit))
                .render(Rect { height: 1, ..inner }, buf);
        }

        if inner.height >= 2 {
            let reset = quota
                .reset_time
                .with_timezone(&chrono::Local)
                .format("%H:%M:%S");
            buf.set_string(
                inner.x + 1,
                inner.y + 1,
                format!("Resets at {}", reset),
                Style::default().fg(Color::Gray),
            );
        }

        if let (Some(remaining), true) = (state.cooldown_remaining(now), inner.height >= 3) {
            buf.set_string(
                inner.x + 1,
                inner.y + 2,
                format!("Cooling down: {}", format_countdown(remaining)),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        }
    }
}
