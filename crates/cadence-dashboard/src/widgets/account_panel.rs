//! Account and session counters panel

use crate::DashboardState;
use cadence_engine::SessionSnapshot;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

pub struct AccountPanelWidget;

impl AccountPanelWidget {
    pub fn render(
        state: &DashboardState,
        snapshot: Option<&SessionSnapshot>,
        area: Rect,
        buf: &mut Buffer,
    ) {
        let block = Block::default()
            .title(" ACCOUNT ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        Paragraph::new(Self::lines(state, snapshot))
            .block(block)
            .render(area, buf);
    }

    fn lines(state: &DashboardState, snapshot: Option<&SessionSnapshot>) -> Vec<Line<'static>> {
        let label = Style::default().fg(Color::Gray);
        let value = Style::default().fg(Color::White);

        let user = state
            .user
            .as_ref()
            .map_or_else(|| "-".to_string(), |u| u.username.clone());
        let model = state
            .model
            .as_ref()
            .map_or_else(|| "-".to_string(), |m| m.name.clone());
        let points = state.points.as_ref().map_or_else(
            || "-".to_string(),
            |p| format!("{} (inference {}, referral {})", p.total, p.inference, p.referral),
        );

        let rate_color = match state.success_rate() {
            r if r >= 95.0 => Color::Green,
            r if r >= 80.0 => Color::Yellow,
            _ => Color::Red,
        };

        let mut lines = vec![
            Line::from(vec![
                Span::styled("User:   ", label),
                Span::styled(user, value),
            ]),
            Line::from(vec![
                Span::styled("Model:  ", label),
                Span::styled(model, value),
            ]),
            Line::from(vec![
                Span::styled("Points: ", label),
                Span::styled(points, value),
            ]),
            Line::from(vec![
                Span::styled("Sent:   ", label),
                Span::styled(format!("{:<6}", state.sends_ok), value),
                Span::styled("Failed: ", label),
                Span::styled(format!("{:<6}", state.sends_failed), value),
                Span::styled(
                    format!("{:.1}%", state.success_rate()),
                    Style::default().fg(rate_color),
                ),
            ]),
        ];

        if let Some(snap) = snapshot {
            let failures_color = if snap.consecutive_failures > 0 {
                Color::Yellow
            } else {
                Color::White
            };
            lines.push(Line::from(vec![
                Span::styled("Cycles: ", label),
                Span::styled(format!("{:<6}", snap.stats.cycles), value),
                Span::styled("Streak: ", label),
                Span::styled(
                    format!("{} failed", snap.consecutive_failures),
                    Style::default().fg(failures_color),
                ),
            ]));
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UiEvent;
    use cadence_core::{PointsSnapshot, UserInfo};

    #[test]
    fn test_lines_show_account() {
        let mut state = DashboardState::default();
        state.apply(UiEvent::User(UserInfo {
            id: "u-1".into(),
            username: "alice".into(),
            referral_code: None,
            created_at: None,
        }));
        state.apply(UiEvent::Points(PointsSnapshot {
            total: 150,
            inference: 100,
            referral: 50,
        }));

        let text: Vec<String> = AccountPanelWidget::lines(&state, None)
            .iter()
            .map(|l| l.to_string())
            .collect();

        assert!(text[0].contains("alice"));
        assert!(text[2].contains("150 (inference 100, referral 50)"));
        assert_eq!(text.len(), 4);
    }
}
