//! Task descriptors, queue references and created-task responses.
//!
//! These types mirror the Cloud Tasks v2 REST resources closely enough to be
//! serialized straight onto the wire: bodies are base64 encoded and schedule
//! times are RFC 3339 timestamps in UTC.

use crate::error::{SubmitError, SubmitResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relative URI every submitted task is delivered to.
pub const LOG_PAYLOAD_URI: &str = "/log_payload";

/// HTTP method the service uses when dispatching a task
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// POST, the only method tasks are dispatched with
    #[default]
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// Fully-qualified queue name: `projects/{project}/locations/{location}/queues/{queue}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueName {
    project_id: String,
    location_id: String,
    queue_id: String,
}

impl QueueName {
    /// Build a queue reference, rejecting empty components
    pub fn new(
        project_id: impl Into<String>,
        location_id: impl Into<String>,
        queue_id: impl Into<String>,
    ) -> SubmitResult<Self> {
        let name = Self {
            project_id: project_id.into(),
            location_id: location_id.into(),
            queue_id: queue_id.into(),
        };

        for (field, value) in [
            ("project id", &name.project_id),
            ("location id", &name.location_id),
            ("queue id", &name.queue_id),
        ] {
            if value.trim().is_empty() {
                return Err(SubmitError::invalid_input(format!("{field} must not be empty")));
            }
            if value.contains('/') {
                return Err(SubmitError::invalid_input(format!(
                    "{field} must not contain '/': {value}"
                )));
            }
        }

        Ok(name)
    }

    /// Project id component
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Location id component
    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    /// Queue id component
    pub fn queue_id(&self) -> &str {
        &self.queue_id
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/locations/{}/queues/{}",
            self.project_id, self.location_id, self.queue_id
        )
    }
}

/// The App Engine request the service will dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEngineHttpRequest {
    /// HTTP method
    pub http_method: HttpMethod,
    /// Path on the target App Engine service
    pub relative_uri: String,
    /// Request body
    #[serde(default, with = "base64_body", skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
}

/// A task ready to be submitted.
///
/// Fields are private; a descriptor never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescriptor {
    app_engine_http_request: AppEngineHttpRequest,
    #[serde(default, with = "rfc3339_seconds", skip_serializing_if = "Option::is_none")]
    schedule_time: Option<DateTime<Utc>>,
}

impl TaskDescriptor {
    /// Build a `POST /log_payload` task with optional body and schedule time
    pub fn new(body: Option<Vec<u8>>, schedule_time: Option<DateTime<Utc>>) -> Self {
        Self {
            app_engine_http_request: AppEngineHttpRequest {
                http_method: HttpMethod::Post,
                relative_uri: LOG_PAYLOAD_URI.to_string(),
                body,
            },
            schedule_time,
        }
    }

    /// Build a task scheduled `delay_seconds` after `now`, if a delay is given
    pub fn log_payload(
        payload: Option<Vec<u8>>,
        delay_seconds: Option<u64>,
        now: DateTime<Utc>,
    ) -> SubmitResult<Self> {
        let schedule_time = delay_seconds
            .map(|delay| schedule_time_after(now, delay))
            .transpose()?;
        Ok(Self::new(payload, schedule_time))
    }

    /// HTTP method
    pub fn http_method(&self) -> HttpMethod {
        self.app_engine_http_request.http_method
    }

    /// Relative URI
    pub fn relative_uri(&self) -> &str {
        &self.app_engine_http_request.relative_uri
    }

    /// Request body, if any
    pub fn body(&self) -> Option<&[u8]> {
        self.app_engine_http_request.body.as_deref()
    }

    /// Earliest dispatch time, if any
    pub fn schedule_time(&self) -> Option<DateTime<Utc>> {
        self.schedule_time
    }

    /// The App Engine request part of the task
    pub fn app_engine_http_request(&self) -> &AppEngineHttpRequest {
        &self.app_engine_http_request
    }
}

impl fmt::Display for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{app_engine_http_request: {{http_method: {}, relative_uri: {:?}",
            self.http_method(),
            self.relative_uri()
        )?;
        if let Some(body) = self.body() {
            write!(f, ", body: {:?}", String::from_utf8_lossy(body))?;
        }
        f.write_str("}")?;
        if let Some(at) = self.schedule_time {
            write!(
                f,
                ", schedule_time: {}",
                at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            )?;
        }
        f.write_str("}")
    }
}

/// Compute `now + delay_seconds`, with `now` truncated to whole seconds
pub fn schedule_time_after(now: DateTime<Utc>, delay_seconds: u64) -> SubmitResult<DateTime<Utc>> {
    let delay = i64::try_from(delay_seconds)
        .map_err(|_| SubmitError::invalid_input(format!("delay too large: {delay_seconds}s")))?;

    now.timestamp()
        .checked_add(delay)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| SubmitError::invalid_input(format!("delay too large: {delay_seconds}s")))
}

/// Task resource returned by the service after creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTask {
    /// Generated task name (`{queue}/tasks/{id}`)
    #[serde(default)]
    pub name: String,
    /// Schedule time as stored by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_time: Option<DateTime<Utc>>,
    /// When the service created the task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    /// Number of dispatch attempts so far
    #[serde(default)]
    pub dispatch_count: u32,
    /// Response view (`BASIC` or `FULL`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
}

impl CreatedTask {
    /// Task id, the last path segment of the name
    pub fn task_id(&self) -> Option<&str> {
        self.name
            .rsplit_once("/tasks/")
            .map(|(_, id)| id)
            .filter(|id| !id.is_empty())
    }
}

mod base64_body {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(body: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match body {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

mod rfc3339_seconds {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(at: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match at {
            Some(at) => serializer.serialize_some(&at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|at| at.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}
