//! Dashboard state and the events that update it
//!
//! The engine reports through [`DashboardSink`](crate::DashboardSink), which
//! turns every call into a [`UiEvent`]. The app drains those events into
//! [`DashboardState`] once per tick, so drawing never takes a lock. The
//! screen is redrawn every tick, which also keeps the cooldown countdown live.

use cadence_core::{
    ModelInfo, PointsSnapshot, QuotaSnapshot, RunState, StatusLevel, UserInfo,
};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;

/// One engine report
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Status { text: String, level: StatusLevel },
    RunState(RunState),
    Cooldown(Option<DateTime<Utc>>),
    User(UserInfo),
    Points(PointsSnapshot),
    Quota(QuotaSnapshot),
    Model(ModelInfo),
    Send { success: bool },
    Render,
}

/// Line in the on-screen event log
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub text: String,
    pub level: StatusLevel,
}

impl LogEntry {
    /// Local wall-clock time for display
    pub fn formatted_time(&self) -> String {
        self.at
            .with_timezone(&chrono::Local)
            .format("%H:%M:%S")
            .to_string()
    }
}

/// Everything the UI draws
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub run_state: RunState,
    pub status: Option<LogEntry>,
    pub user: Option<UserInfo>,
    pub points: Option<PointsSnapshot>,
    pub quota: Option<QuotaSnapshot>,
    pub model: Option<ModelInfo>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub sends_ok: u64,
    pub sends_failed: u64,
    /// Newest first
    pub log: VecDeque<LogEntry>,
    pub max_log_entries: usize,
}

impl DashboardState {
    pub fn new(max_log_entries: usize) -> Self {
        Self {
            run_state: RunState::Stopped,
            status: None,
            user: None,
            points: None,
            quota: None,
            model: None,
            cooldown_until: None,
            sends_ok: 0,
            sends_failed: 0,
            log: VecDeque::new(),
            max_log_entries: max_log_entries.max(1),
        }
    }

    pub fn apply(&mut self, event: UiEvent) {
        self.apply_at(event, Utc::now());
    }

    pub(crate) fn apply_at(&mut self, event: UiEvent, now: DateTime<Utc>) {
        match event {
            UiEvent::Status { text, level } => {
                let entry = LogEntry {
                    at: now,
                    text,
                    level,
                };
                self.push_log(entry.clone());
                self.status = Some(entry);
            }
            UiEvent::RunState(state) => self.run_state = state,
            UiEvent::Cooldown(until) => self.cooldown_until = until,
            UiEvent::User(user) => self.user = Some(user),
            UiEvent::Points(points) => self.points = Some(points),
            UiEvent::Quota(quota) => self.quota = Some(quota),
            UiEvent::Model(model) => self.model = Some(model),
            UiEvent::Send { success: true } => self.sends_ok += 1,
            UiEvent::Send { success: false } => self.sends_failed += 1,
            UiEvent::Render => {}
        }
    }

    fn push_log(&mut self, entry: LogEntry) {
        self.log.push_front(entry);
        self.log.truncate(self.max_log_entries);
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Time left in the cooldown, `None` when not cooling down
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.cooldown_until
            .map(|until| (until - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// Share of sends that succeeded, as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.sends_ok + self.sends_failed;
        if total == 0 {
            return 100.0;
        }
        (self.sends_ok as f64 / total as f64) * 100.0
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(DashboardConfig::default().max_log_entries)
    }
}

/// Dashboard configuration
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Input poll timeout, also the redraw interval
    pub tick_ms: u64,
    /// How often to pull a session snapshot
    pub refresh_ms: u64,
    pub max_log_entries: usize,
    /// Start the session as soon as the dashboard opens
    pub autostart: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            refresh_ms: 1000,
            max_log_entries: 200,
            autostart: false,
        }
    }
}

/// Format a duration as `MM:SS`, or `H:MM:SS` past an hour
pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}
