//! Cloud Tasks REST v2 client.
//!
//! One `POST {endpoint}/v2/{parent}/tasks` per submission. The request body
//! is `{"task": ...}` with the descriptor in its wire form; error responses
//! are decoded from Google's standard `{"error": {...}}` envelope and
//! returned untouched. There is no retry.

use super::TaskQueueClient;
use crate::auth::{self, TokenSource};
use crate::config::SubmitterConfig;
use crate::error::{SubmitError, SubmitResult};
use crate::task::{CreatedTask, QueueName, TaskDescriptor};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// HTTP client for the Cloud Tasks API
pub struct CloudTasksClient {
    client: Client,
    base_url: Url,
    token_source: Option<Box<dyn TokenSource>>,
}

impl std::fmt::Debug for CloudTasksClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudTasksClient")
            .field("base_url", &self.base_url.as_str())
            .field("auth", &self.token_source.as_ref().map(|s| s.kind()))
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskRequest<'a> {
    task: &'a TaskDescriptor,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl CloudTasksClient {
    /// Create a client from validated configuration, picking credentials
    /// from the configured sources.
    pub fn new(config: &SubmitterConfig) -> SubmitResult<Self> {
        Self::with_token_source(config, auth::token_source(&config.auth))
    }

    /// Create a client with an explicit token source (`None` sends no credentials).
    pub fn with_token_source(
        config: &SubmitterConfig,
        token_source: Option<Box<dyn TokenSource>>,
    ) -> SubmitResult<Self> {
        if let Err(errors) = config.validate() {
            return Err(SubmitError::config(errors.join("; ")));
        }

        let base_url = Url::parse(config.endpoint.trim_end_matches('/'))
            .map_err(|e| SubmitError::config(format!("Invalid endpoint URL: {e}")))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("smithyq-cloudtasks/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        debug!(
            endpoint = %base_url,
            auth = token_source.as_ref().map(|s| s.kind()).unwrap_or("none"),
            "cloud tasks client ready"
        );

        Ok(Self {
            client,
            base_url,
            token_source,
        })
    }

    /// URL tasks for `parent` are created at
    pub fn tasks_url(&self, parent: &QueueName) -> String {
        format!(
            "{}/v2/{}/tasks",
            self.base_url.as_str().trim_end_matches('/'),
            parent
        )
    }
}

#[async_trait]
impl TaskQueueClient for CloudTasksClient {
    async fn create_task(
        &self,
        parent: &QueueName,
        task: &TaskDescriptor,
    ) -> SubmitResult<CreatedTask> {
        let url = self.tasks_url(parent);
        let mut request = self
            .client
            .post(&url)
            .json(&CreateTaskRequest { task });

        if let Some(source) = &self.token_source {
            let token = source.access_token(&self.client).await?;
            request = request.bearer_auth(token);
        }

        debug!(%url, "sending create task request");
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = error_body(response).await;
            let err = api_error(status, &body);
            warn!(queue = %parent, status = status.as_u16(), "create task rejected");
            return Err(err);
        }

        let body = response.text().await?;
        let created: CreatedTask = serde_json::from_str(&body)?;
        info!(queue = %parent, task = %created.name, "task created");
        Ok(created)
    }
}

/// Read an error response body, keeping the read failure itself as the
/// text when the body cannot be read.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) => body,
        Err(e) => format!("<failed to read response body: {e}>"),
    }
}

/// Turn a non-success response into `SubmitError::Api`, keeping the
/// service's own code, status and message when the body carries them.
fn api_error(status: StatusCode, body: &str) -> SubmitError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => SubmitError::api(
            if error.code == 0 {
                status.as_u16()
            } else {
                error.code
            },
            error.status,
            error.message,
        ),
        Err(_) => SubmitError::api(
            status.as_u16(),
            status
                .canonical_reason()
                .unwrap_or("UNKNOWN")
                .to_uppercase()
                .replace(' ', "_"),
            body.trim(),
        ),
    }
}
