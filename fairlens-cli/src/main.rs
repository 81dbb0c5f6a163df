//! fairlens command-line interface.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use fairlens::error::FairlensError;
use fairlens::logging::setup::{init_logging, LoggingConfig};
use tracing::debug;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log = cli.global.log_config();
    let logging = LoggingConfig::from(&log).with_json_format(cli.global.json_logs);
    if let Err(e) = init_logging(logging) {
        eprintln!("⚠️  {e}");
    }

    match commands::execute(cli, log).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(error = ?err, "Command failed");
            eprintln!("❌ {}", user_message(&err));
            ExitCode::FAILURE
        }
    }
}

/// Library errors carry their own user-facing wording; anything else prints its chain.
fn user_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<FairlensError>() {
        Some(e) => e.user_message(),
        None => format!("{err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_user_message_prefers_library_wording() {
        let err = anyhow::Error::new(FairlensError::EmptyInput);
        assert_eq!(
            user_message(&err),
            "Error processing dataset: Empty CSV file"
        );

        let wrapped: anyhow::Result<()> =
            Err(FairlensError::network("connection refused")).context("uploading");
        let message = user_message(&wrapped.unwrap_err());
        assert!(message.starts_with("Network or API error: connection refused"));
    }

    #[test]
    fn test_user_message_falls_back_to_chain() {
        let err = anyhow::anyhow!("disk full").context("Failed to write report");
        assert_eq!(user_message(&err), "Failed to write report: disk full");
    }
}
