//! Configuration types for the task submitter.
//!
//! Configuration comes from the environment: the queue coordinates are
//! required, everything else has a default. Loading goes through
//! [`SubmitterConfig::from_lookup`] so tests can feed variables without
//! touching the process environment.

use crate::error::{SubmitError, SubmitResult};
use crate::task::QueueName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Project id variable
pub const ENV_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
/// Queue id variable
pub const ENV_QUEUE: &str = "QUEUE_ID";
/// Location id variable
pub const ENV_LOCATION: &str = "LOCATION_ID";
/// Service-account key file variable
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Pre-minted OAuth access token variable
pub const ENV_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
/// API endpoint override variable
pub const ENV_ENDPOINT: &str = "CLOUD_TASKS_ENDPOINT";
/// Local emulator `host:port` variable
pub const ENV_EMULATOR_HOST: &str = "CLOUD_TASKS_EMULATOR_HOST";
/// Request timeout variable, in seconds
pub const ENV_TIMEOUT_SECS: &str = "CLOUD_TASKS_TIMEOUT_SECS";

/// Default Cloud Tasks REST endpoint
pub const DEFAULT_ENDPOINT: &str = "https://cloudtasks.googleapis.com";

/// Main configuration for the submitter.
///
/// # Examples
///
/// ```rust
/// use smithyq_cloudtasks::config::SubmitterConfig;
///
/// let config = SubmitterConfig::new("my-project", "us-central1", "my-queue")
///     .with_timeout(10)
///     .with_endpoint("http://localhost:8123");
///
/// assert!(config.validate().is_ok());
/// assert_eq!(
///     config.queue_name().unwrap().to_string(),
///     "projects/my-project/locations/us-central1/queues/my-queue"
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitterConfig {
    /// Google Cloud project id
    pub project_id: String,

    /// Queue location (e.g. `us-central1`)
    pub location_id: String,

    /// Queue id
    pub queue_id: String,

    /// Base URL of the Cloud Tasks REST API
    pub endpoint: String,

    /// Request timeout (in seconds)
    pub timeout_secs: u64,

    /// Credential settings
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl SubmitterConfig {
    /// Create a configuration for the given queue with default settings.
    pub fn new(
        project_id: impl Into<String>,
        location_id: impl Into<String>,
        queue_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            location_id: location_id.into(),
            queue_id: queue_id.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> SubmitResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unset and empty variables are treated alike. All missing required
    /// variables are reported together.
    pub fn from_lookup<F>(lookup: F) -> SubmitResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let project_id = get(ENV_PROJECT);
        let queue_id = get(ENV_QUEUE);
        let location_id = get(ENV_LOCATION);

        let (project_id, location_id, queue_id) = match (project_id, location_id, queue_id) {
            (Some(project), Some(location), Some(queue)) => (project, location, queue),
            (project, location, queue) => {
                let missing = [
                    (ENV_PROJECT, project.is_none()),
                    (ENV_QUEUE, queue.is_none()),
                    (ENV_LOCATION, location.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, is_missing)| is_missing.then_some(name));
                return Err(SubmitError::missing_config(missing));
            }
        };

        let mut config = Self::new(project_id, location_id, queue_id);

        if let Some(endpoint) = get(ENV_ENDPOINT) {
            config.endpoint = endpoint;
        }

        if let Some(host) = get(ENV_EMULATOR_HOST) {
            config = config.with_emulator(&host);
        }

        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            config.timeout_secs = raw.trim().parse().map_err(|_| {
                SubmitError::config(format!("{ENV_TIMEOUT_SECS} must be a whole number: {raw}"))
            })?;
        }

        config.auth.credentials_path = get(ENV_CREDENTIALS);
        if let Some(token) = get(ENV_ACCESS_TOKEN) {
            config.auth.access_token = Some(token);
        }

        Ok(config)
    }

    /// Build the fully-qualified queue reference.
    pub fn queue_name(&self) -> SubmitResult<QueueName> {
        QueueName::new(&self.project_id, &self.location_id, &self.queue_id)
    }

    /// Request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Set the API endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Point at a local emulator; disables authentication.
    pub fn with_emulator(mut self, host: &str) -> Self {
        self.endpoint = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };
        self.auth.disabled = true;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Use a fixed bearer token instead of looking one up.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.auth.access_token = Some(token.into());
        self
    }

    /// Replace the logging configuration.
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = self.queue_name() {
            errors.push(e.to_string());
        }

        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            errors.push(format!(
                "Endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            ));
        }

        if self.timeout_secs == 0 {
            errors.push("Request timeout must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Credential settings.
///
/// Sources are tried in order: explicit access token, service-account key
/// file, then the metadata server.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Pre-minted OAuth access token
    #[serde(skip_serializing)]
    pub access_token: Option<String>,

    /// Path to a service-account JSON key
    pub credentials_path: Option<String>,

    /// Send requests without credentials (emulators)
    pub disabled: bool,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("credentials_path", &self.credentials_path)
            .field("disabled", &self.disabled)
            .finish()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: LogLevel,

    /// Enable structured JSON logging
    pub json_format: bool,

    /// Enable colored output (ignored if json_format is true)
    pub colored: bool,

    /// Include timestamps in logs
    pub include_timestamps: bool,

    /// Include target module in logs
    pub include_targets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            json_format: false,
            colored: true,
            include_timestamps: true,
            include_targets: false,
        }
    }
}

impl LoggingConfig {
    /// Pick the level from a `-v` count: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        self.level = match verbose {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        };
        self
    }

    /// Switch to JSON output.
    pub fn with_json(mut self, json_format: bool) -> Self {
        self.json_format = json_format;
        self
    }
}

/// Log level enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warn level
    Warn,
    /// Error level
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
