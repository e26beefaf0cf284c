//! The task submitter.
//!
//! Validation and construction happen in [`TaskSubmitter::prepare`], the
//! single remote call in [`TaskSubmitter::send`]. Splitting the two lets a
//! caller show the request before it goes out.

use crate::config::SubmitterConfig;
use crate::error::SubmitResult;
use crate::queue::{CloudTasksClient, TaskQueueClient};
use crate::task::{CreatedTask, QueueName, TaskDescriptor};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// What to submit: an optional body and an optional delay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitRequest {
    /// Request body for the task
    pub payload: Option<Vec<u8>>,
    /// Seconds from now before the task may be dispatched
    pub delay_seconds: Option<u64>,
}

impl SubmitRequest {
    /// An empty request: no body, dispatched as soon as possible.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a body.
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Delay dispatch by `seconds`.
    pub fn with_delay(mut self, seconds: u64) -> Self {
        self.delay_seconds = Some(seconds);
        self
    }
}

/// A validated task bound to its queue, not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTask {
    /// Queue the task goes to
    pub parent: QueueName,
    /// The task itself
    pub task: TaskDescriptor,
}

/// Builds tasks and submits them to one queue.
///
/// # Examples
///
/// ```rust
/// use smithyq_cloudtasks::prelude::*;
///
/// # async fn example() -> SubmitResult<()> {
/// let config = SubmitterConfig::new("p", "l", "q");
/// let submitter = TaskSubmitter::with_queue(&config, InMemoryTaskQueue::new())?;
///
/// let created = submitter
///     .submit(SubmitRequest::new().with_payload("hello").with_delay(10))
///     .await?;
/// assert!(created.name.starts_with("projects/p/locations/l/queues/q/tasks/"));
/// # Ok(())
/// # }
/// ```
pub struct TaskSubmitter {
    queue: Arc<dyn TaskQueueClient>,
    parent: QueueName,
}

impl std::fmt::Debug for TaskSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSubmitter")
            .field("parent", &self.parent.to_string())
            .finish_non_exhaustive()
    }
}

impl TaskSubmitter {
    /// Create a submitter for `parent` using any queue client.
    pub fn new<Q: TaskQueueClient + 'static>(parent: QueueName, queue: Q) -> Self {
        Self {
            queue: Arc::new(queue),
            parent,
        }
    }

    /// Create a submitter for the configured queue using a custom client.
    pub fn with_queue<Q: TaskQueueClient + 'static>(
        config: &SubmitterConfig,
        queue: Q,
    ) -> SubmitResult<Self> {
        Ok(Self::new(config.queue_name()?, queue))
    }

    /// Create a submitter talking to Cloud Tasks.
    pub fn from_config(config: &SubmitterConfig) -> SubmitResult<Self> {
        Self::with_queue(config, CloudTasksClient::new(config)?)
    }

    /// Queue this submitter targets.
    pub fn parent(&self) -> &QueueName {
        &self.parent
    }

    /// Build the task for `request`, scheduling relative to the current time.
    pub fn prepare(&self, request: &SubmitRequest) -> SubmitResult<PreparedTask> {
        self.prepare_at(request, Utc::now())
    }

    /// Build the task for `request`, scheduling relative to `now`.
    pub fn prepare_at(
        &self,
        request: &SubmitRequest,
        now: DateTime<Utc>,
    ) -> SubmitResult<PreparedTask> {
        let task = TaskDescriptor::log_payload(request.payload.clone(), request.delay_seconds, now)?;
        debug!(queue = %self.parent, %task, "task prepared");
        Ok(PreparedTask {
            parent: self.parent.clone(),
            task,
        })
    }

    /// Send a prepared task. Errors come back exactly as the queue client
    /// reported them.
    pub async fn send(&self, prepared: PreparedTask) -> SubmitResult<CreatedTask> {
        let created = self
            .queue
            .create_task(&prepared.parent, &prepared.task)
            .await?;
        info!(queue = %prepared.parent, task = %created.name, "task submitted");
        Ok(created)
    }

    /// Prepare and send in one step.
    pub async fn submit(&self, request: SubmitRequest) -> SubmitResult<CreatedTask> {
        let prepared = self.prepare(&request)?;
        self.send(prepared).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubmitError;
    use crate::queue::InMemoryTaskQueue;
    use crate::task::HttpMethod;
    use chrono::TimeZone;

    fn submitter_with(memory: &InMemoryTaskQueue) -> TaskSubmitter {
        let config = SubmitterConfig::new("p", "l", "q");
        TaskSubmitter::with_queue(&config, memory.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_reference_example() {
        let memory = InMemoryTaskQueue::new();
        let submitter = submitter_with(&memory);
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();

        let request = SubmitRequest::new().with_payload("hello").with_delay(10);
        let prepared = submitter.prepare_at(&request, now).unwrap();

        assert_eq!(prepared.parent.to_string(), "projects/p/locations/l/queues/q");
        assert_eq!(prepared.task.http_method(), HttpMethod::Post);
        assert_eq!(prepared.task.relative_uri(), "/log_payload");
        assert_eq!(prepared.task.body(), Some(&b"hello"[..]));
        assert_eq!(
            prepared.task.schedule_time(),
            Some(Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 10).unwrap())
        );

        let created = submitter.send(prepared.clone()).await.unwrap();
        let stored = memory.tasks(&prepared.parent).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, created.name);
        assert_eq!(stored[0].task, prepared.task);
    }

    #[tokio::test]
    async fn test_submit_schedules_relative_to_call_time() {
        let memory = InMemoryTaskQueue::new();
        let submitter = submitter_with(&memory);

        let before = Utc::now().timestamp();
        submitter
            .submit(SubmitRequest::new().with_delay(30))
            .await
            .unwrap();
        let after = Utc::now().timestamp();

        let stored = memory.tasks(submitter.parent()).await;
        let scheduled = stored[0].task.schedule_time().unwrap().timestamp();
        assert!(scheduled >= before + 30 && scheduled <= after + 30);
        assert_eq!(stored[0].task.body(), None);
    }

    #[tokio::test]
    async fn test_no_delay_means_no_schedule_time() {
        let memory = InMemoryTaskQueue::new();
        let submitter = submitter_with(&memory);

        submitter
            .submit(SubmitRequest::new().with_payload(vec![0u8, 159, 146, 150]))
            .await
            .unwrap();

        let stored = memory.tasks(submitter.parent()).await;
        assert_eq!(stored[0].task.schedule_time(), None);
        assert_eq!(stored[0].task.body(), Some(&[0u8, 159, 146, 150][..]));
    }

    #[tokio::test]
    async fn test_queue_errors_pass_through() {
        let other = QueueName::new("p", "l", "other").unwrap();
        let memory = InMemoryTaskQueue::with_queues([other]);
        let submitter = submitter_with(&memory);

        let err = submitter.submit(SubmitRequest::new()).await.unwrap_err();
        match err {
            SubmitError::Api { code, status, .. } => {
                assert_eq!(code, 404);
                assert_eq!(status, "NOT_FOUND");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_queue_id_rejected() {
        let config = SubmitterConfig::new("p", "l", "");
        let err = TaskSubmitter::with_queue(&config, InMemoryTaskQueue::new()).unwrap_err();
        assert!(matches!(err, SubmitError::InvalidInput { .. }));
    }
}
