//! CLI command implementations
//!
//! Each subcommand has its own module with a `run`-style entry point taking
//! the shared [`CommandContext`].

pub mod attach;
pub mod complete;
pub mod config;
pub mod doctor;
pub mod lesson;
pub mod probe;
pub mod upload;
pub mod video;

use colored::Colorize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::api::ApiClient;
use crate::auth::{resolve_provider, TokenProvider};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::ingest::{FailureStage, IngestionPipeline, IngestionReport, IngestionSession};
use crate::progress::format_duration;
use crate::Cli;

/// Settings and credentials resolved once per invocation
#[derive(Clone)]
pub struct CommandContext {
    pub config: Config,
    pub tokens: Arc<dyn TokenProvider>,
}

impl CommandContext {
    pub fn new(config: Config, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { config, tokens }
    }

    /// Config file and environment, then command-line flags on top
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = Config::load()?;
        if let Some(ref url) = cli.server_url {
            config.set_server_url(url.clone());
        }
        config.set_verbose(cli.verbose);

        let tokens = resolve_provider(cli.token.clone(), cli.token_file.clone());
        Ok(Self::new(config, tokens))
    }

    pub fn api_client(&self) -> Result<ApiClient> {
        ApiClient::new(&self.config, Arc::clone(&self.tokens))
    }

    pub fn pipeline(&self) -> Result<IngestionPipeline> {
        IngestionPipeline::new(self.api_client()?, &self.config)
    }
}

/// A token that is cancelled on Ctrl-C
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling upload");
            trigger.cancel();
        }
    });
    cancel
}

/// Print the outcome of an upload or attach run
pub(crate) fn report_outcome(
    session: &IngestionSession,
    outcome: Result<IngestionReport>,
    json: bool,
) -> Result<()> {
    match outcome {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{} {}", "✓".green(), "Upload completed!".green().bold());
                println!("  Lesson:     {}", report.lesson_id);
                println!("  Object key: {}", report.object_key);
                println!("  Duration:   {}", format_duration(report.duration_seconds));
                if let Some(ref lesson) = report.lesson {
                    println!("  Status:     {}", lesson.video_status);
                }
            }
            Ok(())
        },
        Err(e) => {
            if let Some(hint) = handoff_hint(session, &e) {
                eprintln!("{}", "The video is in storage but the server was not notified.".yellow());
                eprintln!("Finish without re-uploading:");
                eprintln!("  {}", hint);
            }
            Err(e)
        },
    }
}

/// Command that re-sends a failed completion call
fn handoff_hint(session: &IngestionSession, err: &CliError) -> Option<String> {
    let failure = err.stage_failure()?;
    if failure.stage != FailureStage::Notification || failure.is_cancelled() {
        return None;
    }
    Some(format!(
        "lectern complete --lesson {} --object-key {} --duration {}",
        session.lesson_id()?,
        session.object_key()?,
        session.duration_seconds()?
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::ingest::{FailureCause, StageFailure};

    #[test]
    fn test_context_builds_clients() {
        let ctx = CommandContext::new(Config::default(), Arc::new(StaticToken::new("t")));
        assert_eq!(ctx.api_client().unwrap().api_base(), "http://localhost:8080/api/v1");
        assert!(ctx.pipeline().is_ok());
    }

    #[test]
    fn test_no_hint_without_uploaded_object() {
        let session = IngestionSession::new();
        let err = CliError::Ingestion(StageFailure::new(
            FailureStage::Notification,
            FailureCause::Network("reset".into()),
        ));
        assert!(handoff_hint(&session, &err).is_none());
        assert!(handoff_hint(&session, &CliError::config("x")).is_none());
    }
}
