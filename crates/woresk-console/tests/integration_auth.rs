//! Integration tests for sign-in, sign-out and the route guard

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use woresk_console::{GuardDecision, Route, SessionState};
use woresk_core::types::{IpWhitelistRequest, SuperAdminForm};
use woresk_core::{Error, Result, SessionKey};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Login stores the session, the guard opens, logout closes it again
#[tokio::test]
async fn test_login_then_logout_round_trip() -> Result<()> {
    init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({"username": "admin", "password": "supersecret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .and(header("X-Username", "admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "bye"})))
        .expect(1)
        .mount(&server)
        .await;

    let state = signed_out_state(&server)?;
    assert_eq!(
        state.guard.check(Route::Dashboard),
        GuardDecision::Redirect(Route::Login)
    );

    state.auth().login("admin", "supersecret").await?;

    assert_eq!(state.session.token().as_deref(), Some("abc.def.ghi"));
    assert_eq!(state.session.welcome_message(), "Welcome back, admin");
    assert_eq!(state.session.role().as_deref(), Some("SUPER_ADMIN"));
    assert_eq!(state.session.state(), SessionState::Authenticated);
    assert_eq!(state.guard.check(Route::Dashboard), GuardDecision::Allow);

    state.auth().logout().await?;

    for key in SessionKey::ALL {
        assert!(state.session.get(key).is_none(), "{key} survived logout");
    }
    assert_eq!(state.session.state(), SessionState::Cleared);
    assert_eq!(state.guard.navigate("/dashboard"), Route::Login);
    Ok(())
}

/// Short credentials never reach the backend
#[tokio::test]
async fn test_login_validation_makes_no_request() -> Result<()> {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .expect(0)
        .mount(&server)
        .await;

    let state = signed_out_state(&server)?;

    let short_user = state.auth().login("ad", "supersecret").await;
    assert!(matches!(short_user, Err(Error::Validation { ref field, .. }) if field == "username"));

    let short_password = state.auth().login("admin", "short").await;
    assert!(matches!(short_password, Err(Error::Validation { ref field, .. }) if field == "password"));

    assert!(!state.session.is_authenticated());
    Ok(())
}

/// Rejected credentials surface the backend's message and store nothing
#[tokio::test]
async fn test_login_rejected() -> Result<()> {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let state = signed_out_state(&server)?;
    let err = state
        .auth()
        .login("admin", "wrongpassword")
        .await
        .err()
        .ok_or_else(|| Error::Other("login should fail".to_string()))?;

    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Not authorized: Invalid credentials");
    assert_eq!(state.session.state(), SessionState::Init);
    Ok(())
}

/// A failing logout call still clears the local session
#[tokio::test]
async fn test_logout_clears_session_when_server_fails() -> Result<()> {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let state = signed_in_state(&server)?;
    let result = state.auth().logout().await;

    assert!(matches!(result, Err(Error::Api { status: 500, .. })));
    assert!(!state.session.is_authenticated());
    assert_eq!(
        state.guard.check(Route::Processors),
        GuardDecision::Redirect(Route::Login)
    );
    Ok(())
}

/// Requests carry `Authorization: {token_type} {token}`
#[tokio::test]
async fn test_authorization_header_is_sent() -> Result<()> {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user_roles/user_count"))
        .and(header("Authorization", format!("bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_count": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let state = signed_in_state(&server)?;
    assert_eq!(state.api.user_count().await?, 7);
    Ok(())
}

/// A revoked token is reported, but the session is left in place
#[tokio::test]
async fn test_unauthorized_response_keeps_session() -> Result<()> {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/processors"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .mount(&server)
        .await;

    let state = signed_in_state(&server)?;
    let result = state.api.list::<woresk_core::Processor>().await;

    assert!(result.is_err_and(|e| e.is_unauthorized()));
    assert!(state.session.is_authenticated());
    Ok(())
}

/// Bootstrap validates locally, then posts without a token
#[tokio::test]
async fn test_bootstrap_super_admin() -> Result<()> {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/super_admins"))
        .and(body_json(json!({"username": "root", "password": "longenough"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let state = signed_out_state(&server)?;

    let too_short = SuperAdminForm {
        username: "root".to_string(),
        password: "short".to_string(),
        ip_address: String::new(),
    };
    assert!(state.auth().bootstrap_super_admin(&too_short).await.is_err());

    let form = SuperAdminForm {
        username: "root".to_string(),
        password: "longenough".to_string(),
        ip_address: String::new(),
    };
    state.auth().bootstrap_super_admin(&form).await?;

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.iter().all(|r| !r.headers.contains_key("authorization")));
    Ok(())
}

/// Whitelisting posts the full body and requires the password
#[tokio::test]
async fn test_whitelist_ip() -> Result<()> {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ip_whitelist"))
        .and(body_json(json!({
            "ip_address": "203.0.113.7",
            "description": "office",
            "password": "supersecret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let state = signed_in_state(&server)?;

    let missing_password = IpWhitelistRequest {
        ip_address: "203.0.113.7".to_string(),
        description: "office".to_string(),
        password: String::new(),
    };
    assert!(state.auth().whitelist_ip(&missing_password).await.is_err());

    let request = IpWhitelistRequest {
        password: "supersecret".to_string(),
        ..missing_password
    };
    state.auth().whitelist_ip(&request).await?;
    Ok(())
}
