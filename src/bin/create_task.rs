//! # create_task
//!
//! Create an App Engine task in a Cloud Tasks queue.
//!
//! ```text
//! create_task [OPTIONS] [PAYLOAD] [SECONDS]
//! ```
//!
//! The queue is taken from `GOOGLE_CLOUD_PROJECT`, `LOCATION_ID` and
//! `QUEUE_ID`; if any is missing the usage text is printed instead.

use clap::Parser;
use smithyq_cloudtasks::cli::{self, Cli, Outcome};
use smithyq_cloudtasks::config::LoggingConfig;
use smithyq_cloudtasks::{QueueFactory, SubmitterConfig, logging};
use std::process::ExitCode;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Cli::parse();
    let config = SubmitterConfig::from_env().map(|config| args.apply(config));

    let logging_config = match &config {
        Ok(config) => config.logging.clone(),
        Err(_) => LoggingConfig::default()
            .with_verbosity(args.verbose)
            .with_json(args.log_json),
    };
    if let Err(e) = logging::init(&logging_config) {
        eprintln!("warning: {e}");
    }

    let request = args.request();
    let mut stdout = std::io::stdout();

    let result = if args.dry_run {
        cli::execute(config, &request, |_| Ok(QueueFactory::in_memory()), &mut stdout).await
    } else {
        cli::execute(config, &request, QueueFactory::cloud_tasks, &mut stdout).await
    };

    match result {
        Ok(Outcome::Usage) | Ok(Outcome::Submitted(_)) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "task submission failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
