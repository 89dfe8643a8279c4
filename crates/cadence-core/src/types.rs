//! Core types shared between the engine, the clients and the dashboard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one automation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Not started, or stopped after a failed start
    #[default]
    Stopped,
    /// Loop is scheduling cycles
    Running,
    /// Paused by the user
    Paused,
    /// Waiting out a long error pause, recovers on its own
    ErrorPaused,
}

impl RunState {
    pub fn label(&self) -> &'static str {
        match self {
            RunState::Stopped => "STOPPED",
            RunState::Running => "RUNNING",
            RunState::Paused => "PAUSED",
            RunState::ErrorPaused => "ERROR PAUSE",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Severity attached to status text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl StatusLevel {
    /// Color name used by the dashboard
    pub fn color_name(&self) -> &'static str {
        match self {
            StatusLevel::Info => "cyan",
            StatusLevel::Success => "green",
            StatusLevel::Warning => "yellow",
            StatusLevel::Error => "red",
        }
    }
}

/// Bearer credential returned by a successful login
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Account information for the logged-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Usage quota reported by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub limit: u32,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
    pub current_usage: u32,
}

impl QuotaSnapshot {
    /// No sends left in the current window
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Fraction of the window already used, 0.0 - 1.0
    pub fn used_ratio(&self) -> f64 {
        if self.limit == 0 {
            return 1.0;
        }
        let used = self.limit.saturating_sub(self.remaining);
        (used as f64 / self.limit as f64).min(1.0)
    }
}

/// Points balance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointsSnapshot {
    pub total: u64,
    pub inference: u64,
    pub referral: u64,
}

/// Model offered by the chat service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Identifier of a chat thread
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Acknowledgement of a delivered chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub thread_id: ThreadId,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub reply_chars: usize,
}
