//! Configuration management for the woresk admin console

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Push channel configuration
    #[serde(default)]
    pub push: PushConfig,

    /// Background polling configuration
    #[serde(default)]
    pub polling: PollingConfig,

    /// Session storage configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend, without a trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Push channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Subscribe to processor updates while watching processors
    #[serde(default = "default_push_enabled")]
    pub enabled: bool,

    /// Socket server origin (http, https, ws or wss)
    #[serde(default = "default_socket_url")]
    pub socket_url: String,

    /// Socket.IO namespace carrying the admin events
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// Background polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Poll period in seconds
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,

    /// Maximum random delay added to each period, in milliseconds
    #[serde(default)]
    pub jitter_ms: u64,
}

/// Session storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session file location; the platform data directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json or pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_push_enabled() -> bool {
    true
}

fn default_socket_url() -> String {
    "http://localhost:4000".to_string()
}

fn default_namespace() -> String {
    "/sa".to_string()
}

const fn default_poll_interval() -> u64 {
    15
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: default_push_enabled(),
            socket_url: default_socket_url(),
            namespace: default_namespace(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            jitter_ms: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a [`Duration`]
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PollingConfig {
    /// Poll period as a [`Duration`]; never zero
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// Maximum jitter as a [`Duration`]
    #[must_use]
    pub const fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }
}

impl Config {
    /// Load configuration from `woresk.toml` (optional) and `WORESK__*` environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or parsed.
    pub fn load() -> crate::Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit file, layered under the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or invalid.
    pub fn load_from(path: Option<&std::path::Path>) -> crate::Result<Self> {
        let file = path.map_or_else(
            || config::File::with_name("woresk").required(false),
            |p| config::File::from(p).required(true),
        );

        let config = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix("WORESK").separator("__"))
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Check cross-field constraints the deserializer cannot express
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the offending setting.
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            return Err(crate::Error::configuration(format!(
                "api.base_url must be an http(s) URL, got '{}'",
                self.api.base_url
            )));
        }
        if !self.push.namespace.starts_with('/') {
            return Err(crate::Error::configuration(format!(
                "push.namespace must start with '/', got '{}'",
                self.push.namespace
            )));
        }
        if self.polling.interval_secs == 0 {
            return Err(crate::Error::configuration(
                "polling.interval_secs must be at least 1",
            ));
        }
        Ok(())
    }

    /// Base URL with any trailing slash removed
    #[must_use]
    pub fn api_base_url(&self) -> &str {
        self.api.base_url.trim_end_matches('/')
    }
}
