//! In-memory queue client.
//!
//! Records every submitted task instead of sending it anywhere. Names are
//! generated the way the service shapes them (`{queue}/tasks/{id}`), so
//! callers see the same output they would get from a real submission.
//! Optionally restricted to a set of known queues, in which case unknown
//! queues are rejected with the service's `NOT_FOUND` error.

use super::TaskQueueClient;
use crate::error::{SubmitError, SubmitResult};
use crate::task::{CreatedTask, QueueName, TaskDescriptor};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A task accepted by the in-memory queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTask {
    /// Generated task name
    pub name: String,
    /// The descriptor as submitted
    pub task: TaskDescriptor,
    /// When it was accepted
    pub created_at: DateTime<Utc>,
}

/// In-memory queue client implementation
#[derive(Debug, Default, Clone)]
pub struct InMemoryTaskQueue {
    /// Accepted tasks per queue, in submission order
    tasks: Arc<RwLock<HashMap<QueueName, Vec<StoredTask>>>>,
    /// Queues that exist; `None` accepts any queue
    known_queues: Option<HashSet<QueueName>>,
}

impl InMemoryTaskQueue {
    /// Create a queue client that accepts tasks for any queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue client that only knows the given queues
    pub fn with_queues<I>(queues: I) -> Self
    where
        I: IntoIterator<Item = QueueName>,
    {
        Self {
            tasks: Arc::default(),
            known_queues: Some(queues.into_iter().collect()),
        }
    }

    /// Tasks accepted for `queue`, oldest first
    pub async fn tasks(&self, queue: &QueueName) -> Vec<StoredTask> {
        self.tasks
            .read()
            .await
            .get(queue)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of accepted tasks
    pub async fn len(&self) -> usize {
        self.tasks.read().await.values().map(Vec::len).sum()
    }

    /// Whether nothing has been accepted yet
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TaskQueueClient for InMemoryTaskQueue {
    async fn create_task(
        &self,
        parent: &QueueName,
        task: &TaskDescriptor,
    ) -> SubmitResult<CreatedTask> {
        if let Some(known) = &self.known_queues {
            if !known.contains(parent) {
                return Err(SubmitError::api(
                    404,
                    "NOT_FOUND",
                    format!("Queue does not exist: {parent}"),
                ));
            }
        }

        let now = Utc::now();
        let id = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("{parent}/tasks/{id}");

        self.tasks
            .write()
            .await
            .entry(parent.clone())
            .or_default()
            .push(StoredTask {
                name: name.clone(),
                task: task.clone(),
                created_at: now,
            });

        debug!(queue = %parent, task = %name, "task recorded in memory");

        Ok(CreatedTask {
            name,
            schedule_time: Some(task.schedule_time().unwrap_or(now)),
            create_time: Some(now),
            dispatch_count: 0,
            view: Some("BASIC".to_string()),
        })
    }
}
