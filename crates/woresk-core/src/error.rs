//! Error types for the woresk admin console

use std::{error::Error as StdError, fmt};

/// Main error type for the admin console
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Configuration error
    Configuration {
        /// Error message
        message: String,
    },

    /// Client-side form validation failed
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// The request never produced an HTTP response
    Transport(String),

    /// The API answered with a non-success status
    Api {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// The API rejected the session token (401/403)
    Unauthorized(String),

    /// Not found error
    NotFound {
        /// Resource that was not found
        resource: String,
    },

    /// Serialization error
    Serialization(serde_json::Error),

    /// Push channel error
    PushChannel(String),

    /// Other error
    Other(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new configuration error
    #[must_use]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new validation error
    #[must_use]
    pub fn validation<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the error came back from the API as an authorization failure
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Configuration { message } => write!(f, "Configuration error: {message}"),
            Self::Validation { field, message } => {
                write!(f, "Validation error: {field} - {message}")
            }
            Self::Transport(msg) => write!(f, "Network error: {msg}"),
            Self::Api { status, message } => write!(f, "API error ({status}): {message}"),
            Self::Unauthorized(msg) => write!(f, "Not authorized: {msg}"),
            Self::NotFound { resource } => write!(f, "Resource not found: {resource}"),
            Self::Serialization(err) => write!(f, "Serialization error: {err}"),
            Self::PushChannel(msg) => write!(f, "Push channel error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

// From implementations for automatic conversions
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    /// Reports the first failing field, which is what a form shows inline.
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        fields
            .into_iter()
            .find_map(|(field, errs)| {
                errs.first().map(|err| {
                    let message = err
                        .message
                        .as_ref()
                        .map_or_else(|| err.code.to_string(), ToString::to_string);
                    Self::validation(field.to_string(), message)
                })
            })
            .unwrap_or_else(|| Self::validation("form", "invalid input"))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::uninlined_format_args,
    clippy::match_same_arms
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io;
    use validator::Validate;

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let app_error = Error::from(io_error);

        match app_error {
            Error::Io(_) => {}
            _ => panic!("Expected Io error variant"),
        }

        assert!(format!("{}", app_error).contains("I/O error"));
        assert!(app_error.source().is_some());
    }

    #[test]
    fn test_validation_error_display() {
        let error = Error::validation("username", "at least 3 characters");
        assert_eq!(
            error.to_string(),
            "Validation error: username - at least 3 characters"
        );
    }

    #[test]
    fn test_api_error_display() {
        let error = Error::Api {
            status: 422,
            message: "name missing".to_string(),
        };
        assert_eq!(error.to_string(), "API error (422): name missing");
        assert!(error.source().is_none());
    }

    #[test]
    fn test_unauthorized_flag() {
        assert!(Error::Unauthorized("expired".to_string()).is_unauthorized());
        assert!(!Error::Transport("refused".to_string()).is_unauthorized());
    }

    #[test]
    fn test_serialization_error_source() {
        let json_error = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let app_error = Error::from(json_error);

        assert!(matches!(app_error, Error::Serialization(_)));
        assert!(app_error.source().is_some());
    }

    #[derive(Validate)]
    struct Form {
        #[validate(length(min = 3, message = "too short"))]
        username: String,
    }

    #[test]
    fn test_validation_errors_conversion() {
        let form = Form {
            username: "ab".to_string(),
        };
        let error = Error::from(form.validate().unwrap_err());

        match error {
            Error::Validation { field, message } => {
                assert_eq!(field, "username");
                assert_eq!(message, "too short");
            }
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_all_error_display_variants() {
        let test_cases = vec![
            (Error::Io(io::Error::other("test")), "I/O error:"),
            (Error::configuration("bad url"), "Configuration error: bad url"),
            (Error::Transport("refused".to_string()), "Network error: refused"),
            (Error::Unauthorized("expired".to_string()), "Not authorized: expired"),
            (
                Error::NotFound {
                    resource: "/processors/p9".to_string(),
                },
                "Resource not found: /processors/p9",
            ),
            (Error::PushChannel("closed".to_string()), "Push channel error: closed"),
            (Error::Other("other error".to_string()), "other error"),
        ];

        for (error, expected_contains) in test_cases {
            let display_str = format!("{}", error);
            assert!(
                display_str.contains(expected_contains),
                "Error display '{}' should contain '{}'",
                display_str,
                expected_contains
            );
        }
    }
}
