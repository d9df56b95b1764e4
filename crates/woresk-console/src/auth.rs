//! Sign-in, sign-out and the actions reachable from the login screen

use crate::api_client::ApiClient;
use crate::panels::Editable;
use crate::session::SessionStore;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;
use woresk_core::types::{IpWhitelistRequest, LoginRequest, SuperAdminForm};
use woresk_core::{LoginResponse, Result, SuperAdmin};

/// Authentication flows bound to one session
#[derive(Debug, Clone)]
pub struct AuthService {
    api: ApiClient,
    session: Arc<SessionStore>,
}

impl AuthService {
    /// Service issuing calls through `api` and recording into `session`
    #[must_use]
    pub const fn new(api: ApiClient, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    /// Sign in and store the returned token and profile
    ///
    /// Credentials are validated locally first; a short username or password
    /// never reaches the network.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or the API error when the backend refuses.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let credentials = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        credentials.validate()?;

        let response = self.api.login(&credentials).await?;
        self.session.store_login(&response);
        info!(username = %response.username, role = %response.role, "Signed in");
        Ok(response)
    }

    /// Sign out; the session is cleared whatever the backend answers
    ///
    /// # Errors
    ///
    /// Returns the backend error, after the session has been cleared.
    pub async fn logout(&self) -> Result<()> {
        let username = self.session.username();
        let result = self.api.logout(&username).await;
        self.session.clear();

        match &result {
            Ok(()) => info!(%username, "Signed out"),
            Err(e) => warn!(%username, error = %e, "Logout call failed, local session cleared"),
        }
        result
    }

    /// Create the first super-admin account without signing in
    ///
    /// # Errors
    ///
    /// Returns a validation error (username under 3 or password under 8
    /// characters), or the API error.
    pub async fn bootstrap_super_admin(&self, form: &SuperAdminForm) -> Result<()> {
        SuperAdmin::check_form(form, true)?;
        self.api.create::<SuperAdmin, _>(form).await?;
        info!(username = %form.username, "Super-admin created");
        Ok(())
    }

    /// Allow an IP address, confirmed with the admin password
    ///
    /// # Errors
    ///
    /// Returns a validation error for missing fields, or the API error.
    pub async fn whitelist_ip(&self, request: &IpWhitelistRequest) -> Result<()> {
        request.validate()?;
        self.api.whitelist_ip(request).await?;
        info!(ip = %request.ip_address, "IP address whitelisted");
        Ok(())
    }
}
