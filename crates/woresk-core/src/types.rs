//! Core data types for the woresk admin console

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Keys the session keeps in persistent storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// Bearer token issued by `POST /login`
    AccessToken,
    /// Token scheme, usually `bearer`
    TokenType,
    /// Signed-in username
    Username,
    /// Greeting returned by the login call
    WelcomeMessage,
    /// Role of the signed-in account
    Role,
    /// Newest activity timestamp the user has acknowledged
    LastSeenActivity,
}

impl SessionKey {
    /// Every key, in storage order
    pub const ALL: [Self; 6] = [
        Self::AccessToken,
        Self::TokenType,
        Self::Username,
        Self::WelcomeMessage,
        Self::Role,
        Self::LastSeenActivity,
    ];

    /// Storage key string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::TokenType => "token_type",
            Self::Username => "username",
            Self::WelcomeMessage => "welcome_message",
            Self::Role => "role",
            Self::LastSeenActivity => "last_seen_activity",
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials posted to `/login`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// Account name
    #[validate(length(min = 3, message = "username must be at least 3 characters"))]
    pub username: String,

    /// Account password
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

/// Successful `/login` response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token
    pub access_token: String,
    /// Token scheme
    pub token_type: String,
    /// Canonical username
    pub username: String,
    /// Welcome banner text
    pub message: String,
    /// Account role
    pub role: String,
}

/// Body for `POST /ip_whitelist`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IpWhitelistRequest {
    /// Address to allow
    #[validate(length(min = 1, message = "IP address is required"))]
    pub ip_address: String,

    /// Free-form note
    #[serde(default)]
    pub description: String,

    /// Admin password confirming the change
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// One entry of the activity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Log entry id
    pub id: i64,

    /// Category-coded event name, e.g. `login-success`
    pub event: String,

    /// Acting user, when known
    #[serde(default)]
    pub username: Option<String>,

    /// Client address the event came from
    pub ip_addr: String,

    /// ISO-8601 timestamp; all entries share one format and timezone
    pub timestamp: String,
}

/// Badge colour for an activity event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSeverity {
    /// Successful login
    Success,
    /// Failed login
    Error,
    /// Anything else
    Default,
}

impl fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ActivityEvent {
    /// Event name with `_` and `-` replaced by spaces
    #[must_use]
    pub fn label(&self) -> String {
        self.event.replace(['_', '-'], " ")
    }

    /// Severity derived from the event prefix
    #[must_use]
    pub fn severity(&self) -> EventSeverity {
        if self.event.starts_with("login-success") {
            EventSeverity::Success
        } else if self.event.starts_with("login-failed") {
            EventSeverity::Error
        } else {
            EventSeverity::Default
        }
    }
}

/// Role a managed user can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleName {
    /// Administrator
    Admin,
    /// Analyst
    Analyst,
    /// Accountant
    Accountant,
    /// Team lead
    TeamLead,
}

impl Default for RoleName {
    fn default() -> Self {
        Self::Admin
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::Analyst => write!(f, "ANALYST"),
            Self::Accountant => write!(f, "ACCOUNTANT"),
            Self::TeamLead => write!(f, "TEAM_LEAD"),
        }
    }
}

impl std::str::FromStr for RoleName {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "ADMIN" => Ok(Self::Admin),
            "ANALYST" => Ok(Self::Analyst),
            "ACCOUNTANT" => Ok(Self::Accountant),
            "TEAM_LEAD" => Ok(Self::TeamLead),
            other => Err(crate::Error::validation(
                "role_name",
                format!("unknown role '{other}'"),
            )),
        }
    }
}

/// Maps an `is_active` flag to the label shown in tables
#[must_use]
pub const fn activity_label(is_active: bool) -> &'static str {
    if is_active { "active" } else { "inactive" }
}

/// A managed user and its role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    /// Row id
    pub id: i64,
    /// Login name
    pub username: String,
    /// Address the user signs in from
    pub ip_address: String,
    /// Assigned role
    pub role_name: RoleName,
    /// Whether the account is enabled
    pub is_active: bool,
}

/// Create/update body for `/user_roles`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct UserRoleForm {
    /// Login name
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,

    /// New password; omitted from updates when blank
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Address the user signs in from
    pub ip_address: String,

    /// Assigned role
    pub role_name: RoleName,
}

/// A super-admin account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperAdmin {
    /// Row id
    pub id: i64,
    /// Login name
    pub username: String,
    /// Address the admin signs in from
    #[serde(default)]
    pub ip_address: String,
    /// Whether the account is enabled
    pub is_active: bool,
}

impl SuperAdmin {
    /// `active` / `inactive`
    #[must_use]
    pub const fn status(&self) -> &'static str {
        activity_label(self.is_active)
    }
}

/// Create/update body for `/super_admins`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SuperAdminForm {
    /// Login name
    #[validate(length(min = 3, message = "username must be at least 3 characters"))]
    pub username: String,

    /// Password; omitted from updates when blank
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Address the admin signs in from
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
}

/// Payment gateway behind a processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessorKind {
    /// Stripe
    Stripe,
    /// NMI
    Nmi,
    /// Adyen
    Adyen,
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stripe => write!(f, "STRIPE"),
            Self::Nmi => write!(f, "NMI"),
            Self::Adyen => write!(f, "ADYEN"),
        }
    }
}

impl std::str::FromStr for ProcessorKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "STRIPE" => Ok(Self::Stripe),
            "NMI" => Ok(Self::Nmi),
            "ADYEN" => Ok(Self::Adyen),
            other => Err(crate::Error::validation(
                "kind",
                format!("unknown gateway '{other}'"),
            )),
        }
    }
}

/// Whether a processor accepts payments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessorStatus {
    /// Taking payments
    Active,
    /// Paused
    OnHold,
}

impl ProcessorStatus {
    /// The status a toggle moves to
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::OnHold,
            Self::OnHold => Self::Active,
        }
    }

    /// Query-string value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::OnHold => "ON_HOLD",
        }
    }
}

impl fmt::Display for ProcessorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured payment processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Processor {
    /// Processor id
    pub id: String,
    /// Display name
    pub name: String,
    /// Gateway type
    pub kind: ProcessorKind,
    /// Whether the credentials were verified by the backend
    pub verified: bool,
    /// Current status
    pub status: ProcessorStatus,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
}

impl Processor {
    /// `yes` / `no`
    #[must_use]
    pub const fn verified_label(&self) -> &'static str {
        if self.verified { "yes" } else { "no" }
    }
}

/// Gateway credentials, shaped by the processor kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcessorCredentials {
    /// Stripe secret key
    Stripe {
        /// Secret API key
        secret_key: String,
    },
    /// NMI key pair
    Nmi {
        /// API key
        api_key: String,
        /// Merchant id
        merchant_id: String,
    },
    /// Adyen needs nothing up front
    None {},
}

/// Body for `POST /processors`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ProcessorDraft {
    /// Display name
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    /// Gateway type
    pub kind: ProcessorKind,
    /// Gateway credentials
    pub credentials: ProcessorCredentials,
}

impl ProcessorDraft {
    /// Check that the credentials match the gateway type
    ///
    /// # Errors
    ///
    /// Returns a validation error for missing or mismatched credentials.
    pub fn check(&self) -> crate::Result<()> {
        self.validate()?;
        match (&self.kind, &self.credentials) {
            (ProcessorKind::Stripe, ProcessorCredentials::Stripe { secret_key })
                if !secret_key.is_empty() =>
            {
                Ok(())
            }
            (ProcessorKind::Stripe, _) => Err(crate::Error::validation(
                "secret_key",
                "Stripe processors need a secret key",
            )),
            (ProcessorKind::Nmi, ProcessorCredentials::Nmi { api_key, merchant_id })
                if !api_key.is_empty() && !merchant_id.is_empty() =>
            {
                Ok(())
            }
            (ProcessorKind::Nmi, _) => Err(crate::Error::validation(
                "api_key",
                "NMI processors need an API key and a merchant id",
            )),
            (ProcessorKind::Adyen, _) => Ok(()),
        }
    }
}

/// `GET /user_roles/user_count` body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCount {
    /// Number of managed users
    pub user_count: u64,
}
