//! Run-state badge and current status line

use super::{run_state_color, status_color_from_name};
use crate::DashboardState;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

pub struct StatusBarWidget;

impl StatusBarWidget {
    pub fn render(state: &DashboardState, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" STATUS ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let badge = Span::styled(
            format!(" {} ", state.run_state.label()),
            Style::default()
                .fg(Color::Black)
                .bg(run_state_color(state.run_state))
                .add_modifier(Modifier::BOLD),
        );

        let message = match &state.status {
            Some(entry) => Span::styled(
                format!("{}  {}", entry.formatted_time(), entry.text),
                Style::default().fg(status_color_from_name(entry.level.color_name())),
            ),
            None => Span::styled(
                "Press [s] to start",
                Style::default().fg(Color::DarkGray),
            ),
        };

        Paragraph::new(Line::from(vec![badge, Span::raw("  "), message]))
            .block(block)
            .render(area, buf);
    }
}
