//! HTTP client for the woresk admin API

use crate::panels::Resource;
use crate::session::SessionStore;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument};
use woresk_core::types::{
    ActivityEvent, IpWhitelistRequest, LoginRequest, LoginResponse, ProcessorStatus, UserCount,
};
use woresk_core::{Config, Error, Result};

/// API client for the admin backend
///
/// Cloning is cheap; clones share the connection pool and the session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Option<Arc<SessionStore>>,
}

impl ApiClient {
    /// Create a client for `base_url` with default settings
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::build(base_url.into(), std::time::Duration::from_secs(30))
    }

    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::build(config.api_base_url().to_string(), config.api.request_timeout())
    }

    fn build(base_url: String, timeout: std::time::Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("woresk-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: None,
        })
    }

    /// Attach the session whose token authorizes requests
    #[must_use]
    pub fn with_session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Base URL requests are made against
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.as_ref().and_then(|s| s.authorization()) {
            Some(value) => request.header(reqwest::header::AUTHORIZATION, value),
            None => request,
        }
    }

    async fn dispatch(&self, request: RequestBuilder, path: &str) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{path}: {e}")))?;

        let status = response.status();
        debug!(path, status = status.as_u16(), "API response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, path, &body))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> Result<T> {
        let response = self.dispatch(request, path).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("{path}: {e}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn execute(&self, request: RequestBuilder, path: &str) -> Result<()> {
        self.dispatch(request, path).await.map(drop)
    }

    /// Exchange credentials for a token
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the credentials are rejected.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse> {
        let path = "/login";
        let request = self.client.post(self.url(path)).json(credentials);
        self.fetch(request, path).await
    }

    /// Tell the backend `username` is signing out
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn logout(&self, username: &str) -> Result<()> {
        let path = "/logout";
        let request = self.client.post(self.url(path)).header("X-Username", username);
        self.execute(request, path).await
    }

    /// Add an address to the IP whitelist
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn whitelist_ip(&self, body: &IpWhitelistRequest) -> Result<()> {
        let path = "/ip_whitelist";
        let request = self.client.post(self.url(path)).json(body);
        self.execute(request, path).await
    }

    /// Fetch a whole collection
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not parse.
    pub async fn list<R: Resource>(&self) -> Result<Vec<R>> {
        let path = format!("/{}", R::COLLECTION);
        let request = self.client.get(self.url(&path));
        self.fetch(request, &path).await
    }

    /// Create a record in a collection
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create<R: Resource, B: Serialize + Sync>(&self, body: &B) -> Result<()> {
        let path = format!("/{}", R::COLLECTION);
        let request = self.client.post(self.url(&path)).json(body);
        self.execute(request, &path).await
    }

    /// Replace a record
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update<R: Resource, B: Serialize + Sync>(
        &self,
        id: &R::Id,
        body: &B,
    ) -> Result<()> {
        let path = format!("/{}/{}", R::COLLECTION, encode_id(id));
        let request = self.client.put(self.url(&path)).json(body);
        self.execute(request, &path).await
    }

    /// Delete a record
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete<R: Resource>(&self, id: &R::Id) -> Result<()> {
        let path = format!("/{}/{}", R::COLLECTION, encode_id(id));
        let request = self.client.delete(self.url(&path));
        self.execute(request, &path).await
    }

    /// Number of managed users
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not parse.
    pub async fn user_count(&self) -> Result<u64> {
        let path = "/user_roles/user_count";
        let request = self.client.get(self.url(path));
        let count: UserCount = self.fetch(request, path).await?;
        Ok(count.user_count)
    }

    /// Move a processor to `status`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn set_processor_status(&self, id: &str, status: ProcessorStatus) -> Result<()> {
        let path = format!("/processors/{}/status", urlencoding::encode(id));
        let request = self
            .client
            .patch(self.url(&path))
            .query(&[("new_status", status.as_str())]);
        self.execute(request, &path).await
    }

    /// Full activity log
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not parse.
    pub async fn activity_logs(&self) -> Result<Vec<ActivityEvent>> {
        self.list::<ActivityEvent>().await
    }

    /// Delete every activity log entry
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn clear_activity_logs(&self) -> Result<()> {
        let path = "/activity_logs/";
        let request = self.client.delete(self.url(path));
        self.execute(request, path).await
    }
}

fn encode_id(id: &impl std::fmt::Display) -> String {
    urlencoding::encode(&id.to_string()).into_owned()
}

/// Map a non-success response to the error taxonomy
fn status_error(status: StatusCode, path: &str, body: &str) -> Error {
    let message = error_message(status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(message),
        StatusCode::NOT_FOUND => Error::NotFound {
            resource: path.to_string(),
        },
        _ => Error::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Pull a human-readable message out of an error body
///
/// Understands `{"detail": "..."}`, `{"detail": [{"msg": "..."}, ...]}` and
/// `{"message": "..."}`; anything else becomes `Error <status>`.
#[must_use]
pub fn error_message(status: StatusCode, body: &str) -> String {
    let fallback = || format!("Error {}", status.as_u16());
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return fallback();
    };

    match value.get("detail") {
        Some(serde_json::Value::String(detail)) if !detail.is_empty() => return detail.clone(),
        Some(serde_json::Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            if !msgs.is_empty() {
                return msgs.join(" | ");
            }
        }
        _ => {}
    }

    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .filter(|m| !m.is_empty())
        .map_or_else(fallback, ToString::to_string)
}
