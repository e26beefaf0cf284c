//! # SmithyQ Cloud Tasks
//!
//! Enqueue App Engine tasks into Google Cloud Tasks queues.
//!
//! ## Features
//!
//! - **Task descriptors**: `POST /log_payload` tasks with optional body and delay
//! - **Pluggable queue clients**: Cloud Tasks REST API or an in-memory stand-in
//! - **Ambient credentials**: access token, service-account key file or metadata server
//! - **Observability**: Built-in logging through `tracing`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smithyq_cloudtasks::prelude::*;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> SubmitResult<()> {
//!     let config = SubmitterConfig::from_env()?;
//!     let submitter = TaskSubmitter::from_config(&config)?;
//!
//!     let created = submitter
//!         .submit(SubmitRequest::new().with_payload("hello").with_delay(10))
//!         .await?;
//!     println!("Created task {}", created.name);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod queue;
pub mod submitter;
pub mod task;

#[cfg(test)]
mod test_support;

pub mod prelude {
    pub use crate::config::{LogLevel, LoggingConfig, SubmitterConfig};
    pub use crate::error::{SubmitError, SubmitResult};
    pub use crate::queue::{
        CloudTasksClient, InMemoryTaskQueue, QueueFactory, TaskQueue, TaskQueueClient,
    };
    pub use crate::submitter::{PreparedTask, SubmitRequest, TaskSubmitter};
    pub use crate::task::{CreatedTask, HttpMethod, QueueName, TaskDescriptor};
    pub use async_trait::async_trait;
}

pub use crate::config::SubmitterConfig;
pub use crate::error::{SubmitError, SubmitResult};
pub use crate::queue::{QueueFactory, TaskQueue, TaskQueueClient};
pub use crate::submitter::{SubmitRequest, TaskSubmitter};
pub use crate::task::{CreatedTask, QueueName, TaskDescriptor};
pub use async_trait::async_trait;
