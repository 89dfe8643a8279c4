//! Collaborator contracts consumed by the orchestration engine
//!
//! Remote services are async and fallible. Sinks are synchronous and
//! fire-and-forget: they never return errors into the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::{
    Ack, Credential, ModelInfo, PointsSnapshot, QuotaSnapshot, RunState, StatusLevel, ThreadId,
    UserInfo,
};
use crate::Result;

/// Supplies and validates the bearer credential
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Authenticate and store a fresh credential
    async fn login(&self) -> Result<Credential>;

    /// Fetch the current user, optionally from the local cache
    async fn current_user(&self, use_cache: bool) -> Result<UserInfo>;
}

/// Delivers chat messages
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn create_thread(&self) -> Result<ThreadId>;

    async fn send_message(&self, thread: &ThreadId, text: &str) -> Result<Ack>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}

/// Produces the text of the next message
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_message(&self) -> Result<String>;
}

/// Reports the account's usage quota
#[async_trait]
pub trait QuotaService: Send + Sync {
    async fn get_quota(&self) -> Result<QuotaSnapshot>;

    async fn is_cooldown_active(&self) -> Result<bool>;
}

/// Reports the account's points balance
#[async_trait]
pub trait PointsService: Send + Sync {
    async fn get_points(&self) -> Result<PointsSnapshot>;
}

/// Presentation layer fed by the engine
pub trait StatusSink: Send + Sync {
    fn set_status(&self, text: &str, level: StatusLevel);

    fn set_run_state(&self, state: RunState);

    fn show_cooldown_countdown(&self, reset_time: Option<DateTime<Utc>>);

    fn update_user(&self, _user: &UserInfo) {}

    fn update_points(&self, _points: &PointsSnapshot) {}

    fn update_quota(&self, _quota: &QuotaSnapshot) {}

    fn update_model(&self, _model: &ModelInfo) {}

    fn record_send(&self, _success: bool) {}

    /// Request a redraw
    fn render(&self) {}
}

/// Append-only diagnostic log
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, message: &str, context: Option<Value>);
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn set_status(&self, _text: &str, _level: StatusLevel) {}

    fn set_run_state(&self, _state: RunState) {}

    fn show_cooldown_countdown(&self, _reset_time: Option<DateTime<Utc>>) {}
}

impl DiagnosticSink for NullSink {
    fn record(&self, _message: &str, _context: Option<Value>) {}
}
