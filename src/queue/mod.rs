//! Queue clients for task submission.
//!
//! Two clients implement [`TaskQueueClient`]:
//! - **Cloud Tasks**: the REST v2 API, used for real submissions
//! - **In-Memory**: records tasks locally, used for dry runs and tests
//!
//! # Examples
//!
//! ```rust,no_run
//! use smithyq_cloudtasks::prelude::*;
//!
//! # async fn example() -> SubmitResult<()> {
//! let config = SubmitterConfig::from_env()?;
//!
//! // Real queue service
//! let queue = QueueFactory::cloud_tasks(&config)?;
//!
//! // Local stand-in
//! let queue = QueueFactory::in_memory();
//! # Ok(())
//! # }
//! ```

use crate::config::SubmitterConfig;
use crate::error::SubmitResult;
use crate::task::{CreatedTask, QueueName, TaskDescriptor};
use async_trait::async_trait;

pub mod http;
pub mod memory;

pub use http::CloudTasksClient;
pub use memory::InMemoryTaskQueue;

/// Trait that all queue clients must implement
#[async_trait]
pub trait TaskQueueClient: Send + Sync {
    /// Create `task` in the queue named by `parent`.
    ///
    /// Exactly one remote call; failures are returned as the service reported them.
    async fn create_task(&self, parent: &QueueName, task: &TaskDescriptor)
    -> SubmitResult<CreatedTask>;
}

/// Convenient type alias for a boxed queue client
pub type TaskQueue = Box<dyn TaskQueueClient>;

#[async_trait]
impl<T: TaskQueueClient + ?Sized> TaskQueueClient for Box<T> {
    async fn create_task(
        &self,
        parent: &QueueName,
        task: &TaskDescriptor,
    ) -> SubmitResult<CreatedTask> {
        (**self).create_task(parent, task).await
    }
}

#[async_trait]
impl<T: TaskQueueClient + ?Sized> TaskQueueClient for std::sync::Arc<T> {
    async fn create_task(
        &self,
        parent: &QueueName,
        task: &TaskDescriptor,
    ) -> SubmitResult<CreatedTask> {
        (**self).create_task(parent, task).await
    }
}

/// Factory methods for creating queue clients
pub struct QueueFactory;

impl QueueFactory {
    /// Create an in-memory queue
    pub fn in_memory() -> TaskQueue {
        Box::new(InMemoryTaskQueue::new())
    }

    /// Create a Cloud Tasks REST client
    pub fn cloud_tasks(config: &SubmitterConfig) -> SubmitResult<TaskQueue> {
        Ok(Box::new(CloudTasksClient::new(config)?))
    }
}
