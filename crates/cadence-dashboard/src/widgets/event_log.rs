//! Event log widget
//!
//! Recent status lines, newest first.

use super::status_color_from_name;
use crate::state::LogEntry;
use crate::DashboardState;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem},
};

pub struct EventLogWidget;

impl EventLogWidget {
    pub fn render(state: &DashboardState, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" EVENTS ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let inner = block.inner(area);
        block.render(area, buf);

        if state.log.is_empty() {
            buf.set_string(
                inner.x + 1,
                inner.y,
                "No events yet",
                Style::default().fg(Color::DarkGray),
            );
            return;
        }

        let width = inner.width.saturating_sub(11) as usize;
        let items: Vec<ListItem> = state
            .log
            .iter()
            .take(inner.height as usize)
            .map(|entry| Self::format_entry(entry, width))
            .collect();

        Widget::render(List::new(items), inner, buf);
    }

    fn format_entry(entry: &LogEntry, max_len: usize) -> ListItem<'static> {
        let color = status_color_from_name(entry.level.color_name());
        let line = format!(
            "{}  {}",
            entry.formatted_time(),
            Self::truncate(&entry.text, max_len)
        );
        ListItem::new(line).style(Style::default().fg(color))
    }

    fn truncate(text: &str, max_len: usize) -> String {
        if text.chars().count() <= max_len {
            text.to_string()
        } else {
            let truncated: String = text.chars().take(max_len.saturating_sub(1)).collect();
            format!("{}…", truncated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(EventLogWidget::truncate("short", 10), "short");
        assert_eq!(EventLogWidget::truncate("abcdefghijk", 5), "abcd…");
    }

    #[test]
    fn test_empty_log() {
        let area = Rect::new(0, 0, 40, 4);
        let mut buf = Buffer::empty(area);
        EventLogWidget::render(&DashboardState::default(), area, &mut buf);

        let text: String = buf.content.iter().map(|c| c.symbol()).collect();
        assert!(text.contains("No events yet"));
    }
}
