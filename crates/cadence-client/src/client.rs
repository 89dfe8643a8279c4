//! HTTP client for the chat service
//!
//! One `ApiClient` implements every remote collaborator the engine consumes.
//! Transport failures are classified here, once, into structured
//! `CadenceError` values; nothing downstream parses error text.

use cadence_core::config::ApiConfig;
use cadence_core::{CadenceError, Credential, NetworkErrorKind, Result, UserInfo};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

/// Client for the chat service REST API
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    pub(crate) api_key_env: String,
    pub(crate) credential: RwLock<Option<Credential>>,
    pub(crate) user_cache: RwLock<Option<UserInfo>>,
}

impl ApiClient {
    /// Create a client from API configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CadenceError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key_env: config.api_key_env.clone(),
            credential: RwLock::new(None),
            user_cache: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the stored bearer token, failing if we never logged in
    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let guard = self.credential.read().await;
        let credential = guard
            .as_ref()
            .ok_or_else(|| CadenceError::Auth("Not logged in".to_string()))?;
        Ok(request.bearer_auth(&credential.token))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        tracing::debug!("GET {}", path);
        let request = self.authorized(self.http.get(self.url(path))).await?;
        let response = request.send().await.map_err(map_reqwest_error)?;
        decode(check_status(response).await?).await
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!("POST {}", path);
        let request = self.authorized(self.http.post(self.url(path))).await?;
        let response = request.json(body).send().await.map_err(map_reqwest_error)?;
        decode(check_status(response).await?).await
    }

    /// POST without a bearer token (login)
    pub(crate) async fn post_anonymous<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!("POST {} (anonymous)", path);
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode(check_status(response).await?).await
    }
}

/// Turn a non-success status into a structured error
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown".to_string());

    if status.as_u16() == 429 {
        tracing::warn!("Rate limited (429): {}", error_text);
    }

    Err(CadenceError::http(status.as_u16(), error_text))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response.json::<T>().await.map_err(map_reqwest_error)
}

/// Classify a reqwest failure at the transport boundary
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> CadenceError {
    if err.is_timeout() {
        CadenceError::network(NetworkErrorKind::Timeout, err.to_string())
    } else if err.is_connect() {
        CadenceError::network(NetworkErrorKind::ConnectionRefused, err.to_string())
    } else if err.is_decode() {
        CadenceError::Other(format!("Failed to parse response: {}", err))
    } else if err.is_request() || err.is_body() {
        CadenceError::network(NetworkErrorKind::ConnectionReset, err.to_string())
    } else if let Some(status) = err.status() {
        CadenceError::http(status.as_u16(), err.to_string())
    } else {
        CadenceError::Other(format!("HTTP client error: {}", err))
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    //! Minimal one-shot HTTP responder for exercising the client

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `responses` to consecutive connections, return the base URL
    pub async fn serve(responses: Vec<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    pub fn json_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_server::{json_response, serve};
    use super::*;
    use cadence_core::ErrorKind;

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            timeout_secs: 2,
            ..ApiConfig::default()
        }
    }

    async fn logged_in(base_url: &str) -> ApiClient {
        let client = ApiClient::new(&config(base_url)).unwrap();
        *client.credential.write().await = Some(Credential::new("test-token"));
        client
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new(&config("https://chat.example.com/")).unwrap();
        assert_eq!(client.url("/chat/quota"), "https://chat.example.com/chat/quota");
    }

    #[tokio::test]
    async fn test_requests_without_login_fail_with_auth() {
        let client = ApiClient::new(&config("http://127.0.0.1:9")).unwrap();
        let err = client
            .get_json::<serde_json::Value>("/users/me")
            .await
            .unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        // Bind then drop to obtain a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = logged_in(&format!("http://{}", addr)).await;
        let err = client
            .get_json::<serde_json::Value>("/chat/quota")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CadenceError::Network {
                kind: NetworkErrorKind::ConnectionRefused,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let base = serve(vec![json_response(
            "503 Service Unavailable",
            r#"{"error":"overloaded"}"#,
        )])
        .await;
        let client = logged_in(&base).await;

        let err = client
            .get_json::<serde_json::Value>("/chat/quota")
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::Http { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_client_error_is_terminal() {
        let base = serve(vec![json_response(
            "422 Unprocessable Entity",
            r#"{"error":"bad message"}"#,
        )])
        .await;
        let client = logged_in(&base).await;

        let err = client
            .post_json::<_, serde_json::Value>("/chat/threads", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::Http { status: 422, .. }));
        assert_eq!(err.kind(), ErrorKind::Terminal);
    }

    #[tokio::test]
    async fn test_malformed_body_is_terminal() {
        let base = serve(vec![json_response("200 OK", "not json")]).await;
        let client = logged_in(&base).await;

        let err = client
            .get_json::<serde_json::Value>("/chat/quota")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Terminal);
    }
}
