//! Command-line front end for `create_task`.
//!
//! Argument parsing lives here rather than in the binary so the whole flow
//! (configuration, usage fallback, console report) can be driven from tests.

use crate::config::SubmitterConfig;
use crate::error::SubmitResult;
use crate::queue::TaskQueue;
use crate::submitter::{SubmitRequest, TaskSubmitter};
use crate::task::CreatedTask;
use clap::{ArgAction, Parser};
use std::io::Write;

/// Printed when the queue coordinates are not configured.
pub const USAGE: &str = "\
Usage: create_task <payload> <seconds>

Environment variables:
  GOOGLE_CLOUD_PROJECT must be set to your Google Cloud project ID
  QUEUE_ID must be set to your Google App Engine queue ID
  LOCATION_ID must be set to your Google App Engine location
  GOOGLE_APPLICATION_CREDENTIALS set to the path to your JSON credentials

";

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "create_task")]
#[command(about = "Create an App Engine task in a Cloud Tasks queue")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Request body of the task
    pub payload: Option<String>,

    /// Delay, in seconds, before the task may be dispatched
    pub seconds: Option<u64>,

    /// Build and record the task locally without calling the service
    #[arg(long)]
    pub dry_run: bool,

    /// Cloud Tasks API base URL
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// OAuth access token to send instead of discovering credentials
    #[arg(long, value_name = "TOKEN")]
    pub access_token: Option<String>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// The submission described by the positional arguments.
    pub fn request(&self) -> SubmitRequest {
        SubmitRequest {
            payload: self.payload.clone().map(String::into_bytes),
            delay_seconds: self.seconds,
        }
    }

    /// Layer command-line overrides on top of environment configuration.
    pub fn apply(&self, mut config: SubmitterConfig) -> SubmitterConfig {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(token) = &self.access_token {
            config.auth.access_token = Some(token.clone());
            config.auth.disabled = false;
        }
        config.logging = config
            .logging
            .with_verbosity(self.verbose)
            .with_json(self.log_json);
        config
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Configuration was incomplete; usage was printed and nothing was sent
    Usage,
    /// The service accepted the task
    Submitted(CreatedTask),
}

/// Run one submission, reporting progress to `out`.
///
/// `connect` is only called once the configuration is complete, so an
/// incomplete environment never opens a queue client.
pub async fn execute<W, F>(
    config: SubmitResult<SubmitterConfig>,
    request: &SubmitRequest,
    connect: F,
    out: &mut W,
) -> SubmitResult<Outcome>
where
    W: Write,
    F: FnOnce(&SubmitterConfig) -> SubmitResult<TaskQueue>,
{
    let config = match config {
        Ok(config) => config,
        Err(e) if e.is_missing_config() => {
            tracing::debug!(error = %e, "incomplete configuration");
            out.write_all(USAGE.as_bytes())?;
            return Ok(Outcome::Usage);
        }
        Err(e) => return Err(e),
    };

    let submitter = TaskSubmitter::with_queue(&config, connect(&config)?)?;
    let prepared = submitter.prepare(request)?;

    writeln!(out, "Sending task {}", prepared.task)?;
    let created = submitter.send(prepared).await?;

    if !created.name.is_empty() {
        writeln!(out, "Created task {}", created.name)?;
    }
    Ok(Outcome::Submitted(created))
}
