//! Test helper functions and utilities

use serde_json::Value;
use std::sync::{Arc, Once};
use woresk_console::{ConsoleState, MemoryStorage, SessionStore};
use woresk_core::{Config, Result, SessionKey};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT_LOGGER: Once = Once::new();

/// Initialize test logging (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

/// Configuration pointing the console at `server`
pub fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.api.request_timeout_secs = 5;
    config.push.enabled = false;
    config
}

/// Console state over a fresh in-memory session
pub fn signed_out_state(server: &MockServer) -> Result<ConsoleState> {
    ConsoleState::with_session(test_config(server), Arc::new(SessionStore::in_memory()))
}

/// Console state whose session already holds a token
pub fn signed_in_state(server: &MockServer) -> Result<ConsoleState> {
    let storage = MemoryStorage::with_entries([
        (SessionKey::AccessToken.as_str(), TEST_TOKEN),
        (SessionKey::TokenType.as_str(), "bearer"),
        (SessionKey::Username.as_str(), "admin"),
        (SessionKey::WelcomeMessage.as_str(), "Welcome, admin"),
        (SessionKey::Role.as_str(), "SUPER_ADMIN"),
    ]);
    ConsoleState::with_session(test_config(server), Arc::new(SessionStore::open(storage)))
}

/// Token used by [`signed_in_state`]
pub const TEST_TOKEN: &str = "test-token";

/// Mount a `GET` returning `body`
pub async fn mount_get(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Number of requests the server saw for `verb` on `route`
pub async fn request_count(server: &MockServer, verb: &str, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == route)
        .count()
}
