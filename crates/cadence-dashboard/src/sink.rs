//! Status sink that forwards engine reports to the dashboard

use crate::state::UiEvent;
use cadence_core::{
    ModelInfo, PointsSnapshot, QuotaSnapshot, RunState, StatusLevel, StatusSink, UserInfo,
};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Create a sink and the receiver the dashboard drains
pub fn channel() -> (DashboardSink, UnboundedReceiver<UiEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DashboardSink { tx }, rx)
}

#[derive(Debug, Clone)]
pub struct DashboardSink {
    tx: UnboundedSender<UiEvent>,
}

impl DashboardSink {
    fn send(&self, event: UiEvent) {
        // Receiver is gone once the dashboard has exited
        if self.tx.send(event).is_err() {
            tracing::trace!("Dashboard closed, dropping status update");
        }
    }
}

impl StatusSink for DashboardSink {
    fn set_status(&self, text: &str, level: StatusLevel) {
        self.send(UiEvent::Status {
            text: text.to_string(),
            level,
        });
    }

    fn set_run_state(&self, state: RunState) {
        self.send(UiEvent::RunState(state));
    }

    fn show_cooldown_countdown(&self, reset_time: Option<DateTime<Utc>>) {
        self.send(UiEvent::Cooldown(reset_time));
    }

    fn update_user(&self, user: &UserInfo) {
        self.send(UiEvent::User(user.clone()));
    }

    fn update_points(&self, points: &PointsSnapshot) {
        self.send(UiEvent::Points(points.clone()));
    }

    fn update_quota(&self, quota: &QuotaSnapshot) {
        self.send(UiEvent::Quota(quota.clone()));
    }

    fn update_model(&self, model: &ModelInfo) {
        self.send(UiEvent::Model(model.clone()));
    }

    fn record_send(&self, success: bool) {
        self.send(UiEvent::Send { success });
    }

    fn render(&self) {
        self.send(UiEvent::Render);
    }
}
