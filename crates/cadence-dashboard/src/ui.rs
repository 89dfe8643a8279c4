//! Main UI layout and rendering
//!
//! Defines the overall dashboard layout and delegates to individual widgets.

use crate::{
    app::{App, Overlay},
    widgets::{AccountPanelWidget, EventLogWidget, QuotaPanelWidget, StatusBarWidget},
};
use ratatui::{
    layout::{Constraint, Direction, Flex, Layout, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const KEYS: [(&str, &str); 7] = [
    ("s", "start"),
    ("p", "pause"),
    ("r", "resume"),
    ("i", "info"),
    ("c", "clear log"),
    ("h", "help"),
    ("q", "quit"),
];

/// Draw the entire dashboard UI
pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Status line
            Constraint::Length(7), // Account + quota
            Constraint::Min(5),    // Event log
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app);

    frame.render_widget(
        WidgetAdapter::new(|area, buf| StatusBarWidget::render(&app.state, area, buf)),
        chunks[1],
    );

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[2]);

    frame.render_widget(
        WidgetAdapter::new(|area, buf| {
            AccountPanelWidget::render(&app.state, app.snapshot.as_ref(), area, buf)
        }),
        middle[0],
    );
    frame.render_widget(
        WidgetAdapter::new(|area, buf| QuotaPanelWidget::render(&app.state, area, buf)),
        middle[1],
    );

    frame.render_widget(
        WidgetAdapter::new(|area, buf| EventLogWidget::render(&app.state, area, buf)),
        chunks[3],
    );

    match app.overlay {
        Overlay::None => {}
        Overlay::Help => render_popup(frame, " HELP ", help_lines()),
        Overlay::Info => render_popup(frame, " INFO ", info_lines(app)),
    }
}

/// Render the header with title and keybindings
fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let short_id: String = app.session_id().chars().take(8).collect();
    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "CADENCE",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("Session: {}", short_id),
            Style::default().fg(Color::Gray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, header_chunks[0]);

    let mut spans = Vec::new();
    for (key, action) in KEYS {
        spans.push(Span::styled(
            format!("[{}]", key),
            Style::default().fg(Color::Yellow),
        ));
        spans.push(Span::raw(format!("{} ", action)));
    }
    let keybindings = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Right);
    frame.render_widget(keybindings, header_chunks[1]);
}

fn help_lines() -> Vec<Line<'static>> {
    let mut lines = vec![Line::from("")];
    for (key, action) in KEYS {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<4}", key), Style::default().fg(Color::Yellow)),
            Span::raw(action),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Resume is refused while the quota is cooling down.",
        Style::default().fg(Color::Gray),
    )));
    lines
}

fn info_lines(app: &App) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::Gray);
    let row = |name: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("  {:<12}", name), label),
            Span::raw(value),
        ])
    };

    let state = &app.state;
    let mut lines = vec![Line::from(""), row("Session", app.session_id().to_string())];

    match &state.user {
        Some(user) => {
            lines.push(row("User", user.username.clone()));
            lines.push(row("User ID", user.id.clone()));
            if let Some(code) = &user.referral_code {
                lines.push(row("Referral", code.clone()));
            }
            if let Some(created) = user.created_at {
                lines.push(row("Joined", created.format("%Y-%m-%d").to_string()));
            }
        }
        None => lines.push(row("User", "not logged in".to_string())),
    }

    if let Some(model) = &state.model {
        lines.push(row("Model", format!("{} ({})", model.name, model.id)));
    }
    if let Some(snap) = &app.snapshot {
        lines.push(row("State", snap.run_state.to_string()));
        lines.push(row("Sent", snap.stats.messages_sent.to_string()));
        lines.push(row("Re-logins", snap.stats.reauths.to_string()));
        lines.push(row("Loop errors", snap.stats.loop_errors.to_string()));
    }
    lines
}

fn render_popup(frame: &mut Frame, title: &str, lines: Vec<Line<'static>>) {
    let height = (lines.len() as u16 + 3).min(frame.area().height);
    let area = centered_rect(frame.area(), 60, height);

    frame.render_widget(Clear, area);
    let popup = Paragraph::new(lines).block(
        Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(popup, area);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    cell
}

/// Widget adapter to bridge static render methods to ratatui's Widget trait
struct WidgetAdapter<F>
where
    F: Fn(Rect, &mut Buffer),
{
    render_fn: F,
}

impl<F> WidgetAdapter<F>
where
    F: Fn(Rect, &mut Buffer),
{
    fn new(render_fn: F) -> Self {
        Self { render_fn }
    }
}

impl<F> Widget for WidgetAdapter<F>
where
    F: Fn(Rect, &mut Buffer),
{
    fn render(self, area: Rect, buf: &mut Buffer) {
        (self.render_fn)(area, buf);
    }
}
