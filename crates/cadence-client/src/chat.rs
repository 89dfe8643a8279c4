//! Chat transport, quota and points endpoints

use crate::client::ApiClient;
use crate::wire::{
    ModelsResponse, PointsResponse, QuotaResponse, SendMessageRequest, SendMessageResponse,
    ThreadResponse,
};
use async_trait::async_trait;
use cadence_core::{
    Ack, ChatTransport, ModelInfo, PointsService, PointsSnapshot, QuotaService, QuotaSnapshot,
    Result, ThreadId,
};
use chrono::Utc;

#[async_trait]
impl ChatTransport for ApiClient {
    async fn create_thread(&self) -> Result<ThreadId> {
        let thread: ThreadResponse = self
            .post_json("/chat/threads", &serde_json::json!({}))
            .await?;
        Ok(ThreadId(thread.id))
    }

    async fn send_message(&self, thread: &ThreadId, text: &str) -> Result<Ack> {
        let path = format!("/chat/threads/{}/messages", thread);
        let response: SendMessageResponse = self
            .post_json(
                &path,
                &SendMessageRequest {
                    content: text.to_string(),
                },
            )
            .await?;

        let reply_chars = response.content.as_deref().map_or(0, str::len);
        tracing::debug!("Message delivered to {} ({} chars reply)", thread, reply_chars);

        Ok(Ack {
            thread_id: thread.clone(),
            message_id: response.id,
            reply_chars,
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response: ModelsResponse = self.get_json("/chat/models").await?;
        Ok(response.models.into_iter().map(ModelInfo::from).collect())
    }
}

#[async_trait]
impl QuotaService for ApiClient {
    async fn get_quota(&self) -> Result<QuotaSnapshot> {
        let quota: QuotaResponse = self.get_json("/chat/quota").await?;
        Ok(quota.into())
    }

    async fn is_cooldown_active(&self) -> Result<bool> {
        let quota = self.get_quota().await?;
        Ok(quota.is_exhausted() && quota.reset_time > Utc::now())
    }
}

#[async_trait]
impl PointsService for ApiClient {
    async fn get_points(&self) -> Result<PointsSnapshot> {
        let points: PointsResponse = self.get_json("/users/me/points").await?;
        Ok(points.into())
    }
}
