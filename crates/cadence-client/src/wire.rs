//! Wire formats of the chat service API
//!
//! The service speaks camelCase JSON. These types stay private to the crate
//! and are converted into `cadence-core` types at the boundary.

use cadence_core::{ModelInfo, PointsSnapshot, QuotaSnapshot, UserInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<UserResponse> for UserInfo {
    fn from(user: UserResponse) -> Self {
        UserInfo {
            id: user.id,
            username: user.username,
            referral_code: user.referral_code,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaResponse {
    pub limit: u32,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
    #[serde(default)]
    pub current_usage: Option<u32>,
}

impl From<QuotaResponse> for QuotaSnapshot {
    fn from(quota: QuotaResponse) -> Self {
        let current_usage = quota
            .current_usage
            .unwrap_or_else(|| quota.limit.saturating_sub(quota.remaining));
        QuotaSnapshot {
            limit: quota.limit,
            remaining: quota.remaining,
            reset_time: quota.reset_time,
            current_usage,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsResponse {
    #[serde(default)]
    pub total_points: u64,
    #[serde(default)]
    pub inference_points: u64,
    #[serde(default)]
    pub referral_points: u64,
}

impl From<PointsResponse> for PointsSnapshot {
    fn from(points: PointsResponse) -> Self {
        PointsSnapshot {
            total: points.total_points,
            inference: points.inference_points,
            referral: points.referral_points,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl From<ModelEntry> for ModelInfo {
    fn from(model: ModelEntry) -> Self {
        ModelInfo {
            name: model.display_name.unwrap_or_else(|| model.id.clone()),
            id: model.id,
            is_default: model.is_default,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}
