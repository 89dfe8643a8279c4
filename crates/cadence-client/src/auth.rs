//! Authentication against the chat service
//!
//! The API key comes from the environment variable named in config
//! (`CADENCE_API_KEY` by default). Login exchanges it for a bearer token.

use crate::client::ApiClient;
use crate::wire::{LoginRequest, LoginResponse, UserResponse};
use async_trait::async_trait;
use cadence_core::{CadenceError, Credential, CredentialProvider, Result, UserInfo};
use std::env;

/// Read the API key from the named environment variable
pub fn resolve_api_key(var_name: &str) -> Result<String> {
    match env::var(var_name) {
        Ok(key) if !key.trim().is_empty() => {
            tracing::debug!("Using API key from {}", var_name);
            Ok(key.trim().to_string())
        }
        _ => Err(CadenceError::Auth(format!(
            "No API key found. Set {}=<your key> before starting.",
            var_name
        ))),
    }
}

#[async_trait]
impl CredentialProvider for ApiClient {
    async fn login(&self) -> Result<Credential> {
        let api_key = resolve_api_key(&self.api_key_env)?;

        let response: LoginResponse = self
            .post_anonymous("/auth/login", &LoginRequest { api_key })
            .await
            .map_err(|e| match e {
                CadenceError::Http {
                    status: 401 | 403,
                    message,
                } => CadenceError::Auth(format!("API key rejected: {}", message)),
                other => other,
            })?;

        let credential = Credential {
            token: response.access_token,
            expires_at: response.expires_at,
        };

        *self.credential.write().await = Some(credential.clone());
        // A new token may belong to a different account
        *self.user_cache.write().await = None;

        tracing::info!("Logged in to {}", self.base_url());
        Ok(credential)
    }

    async fn current_user(&self, use_cache: bool) -> Result<UserInfo> {
        if use_cache {
            if let Some(user) = self.user_cache.read().await.as_ref() {
                return Ok(user.clone());
            }
        }

        let user: UserInfo = self.get_json::<UserResponse>("/users/me").await?.into();
        *self.user_cache.write().await = Some(user.clone());
        Ok(user)
    }
}
