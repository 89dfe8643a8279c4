//! Status sink that writes to the tracing log, for headless runs

use cadence_core::{
    ModelInfo, PointsSnapshot, QuotaSnapshot, RunState, StatusLevel, StatusSink, UserInfo,
};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn set_status(&self, text: &str, level: StatusLevel) {
        match level {
            StatusLevel::Error => error!(target: "cadence::status", "{}", text),
            StatusLevel::Warning => warn!(target: "cadence::status", "{}", text),
            StatusLevel::Info | StatusLevel::Success => info!(target: "cadence::status", "{}", text),
        }
    }

    fn set_run_state(&self, state: RunState) {
        info!(target: "cadence::status", "State: {}", state);
    }

    fn show_cooldown_countdown(&self, reset_time: Option<DateTime<Utc>>) {
        match reset_time {
            Some(reset) => info!(
                target: "cadence::status",
                "Cooldown until {}",
                reset.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            None => info!(target: "cadence::status", "Cooldown cleared"),
        }
    }

    fn update_user(&self, user: &UserInfo) {
        info!(target: "cadence::status", "User: {} ({})", user.username, user.id);
    }

    fn update_points(&self, points: &PointsSnapshot) {
        debug!(
            target: "cadence::status",
            "Points: {} (inference {}, referral {})",
            points.total, points.inference, points.referral
        );
    }

    fn update_quota(&self, quota: &QuotaSnapshot) {
        debug!(
            target: "cadence::status",
            "Quota: {}/{} left, resets {}",
            quota.remaining, quota.limit, quota.reset_time
        );
    }

    fn update_model(&self, model: &ModelInfo) {
        info!(target: "cadence::status", "Model: {}", model.name);
    }
}
