//! Error types for task submission.

use thiserror::Error;

/// Result type used throughout the submitter.
pub type SubmitResult<T> = Result<T, SubmitError>;

/// Main error type for task submission.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// One or more required environment variables are not set
    #[error("Missing required configuration: {}", vars.join(", "))]
    MissingConfig {
        /// Names of the missing variables
        vars: Vec<String>,
    },

    /// Caller-supplied input was rejected before any remote call
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// Could not obtain credentials for the queue service
    #[error("Authentication error: {message}")]
    AuthError {
        /// Error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transport-level failure talking to the queue service
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The queue service answered with an error status
    #[error("API error: {code} {status} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Canonical status string (e.g. `NOT_FOUND`)
        status: String,
        /// Message returned by the service
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SubmitError {
    /// Create a missing configuration error
    pub fn missing_config<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingConfig {
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create an authentication error without an underlying cause
    pub fn auth(message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
            source: None,
        }
    }

    /// Create an authentication error wrapping its cause
    pub fn auth_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::AuthError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an API error from a service response
    pub fn api(code: u16, status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            status: status.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the configuration was incomplete and usage should be shown
    pub fn is_missing_config(&self) -> bool {
        matches!(self, Self::MissingConfig { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_lists_vars() {
        let err = SubmitError::missing_config(["QUEUE_ID", "LOCATION_ID"]);
        assert!(err.is_missing_config());
        assert_eq!(
            err.to_string(),
            "Missing required configuration: QUEUE_ID, LOCATION_ID"
        );
    }

    #[test]
    fn test_api_error_display() {
        let err = SubmitError::api(404, "NOT_FOUND", "Queue does not exist.");
        assert!(!err.is_missing_config());
        assert_eq!(err.to_string(), "API error: 404 NOT_FOUND - Queue does not exist.");
    }
}
