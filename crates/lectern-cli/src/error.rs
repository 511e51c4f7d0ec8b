//! Error types for the Lectern CLI
//!
//! Messages are user-facing: each says what went wrong and, where there is
//! something to do about it, how to fix it.

use lectern_common::types::LessonId;
use lectern_common::LecternError;
use thiserror::Error;

use crate::api::ApiError;
use crate::ingest::session::StageFailure;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// API call outside an ingestion session failed
    #[error("Server error: {0}. Check the server URL and your access token (run 'lectern doctor').")]
    Api(#[from] ApiError),

    /// An ingestion session halted at one of its stages
    #[error("Ingestion failed at {0}")]
    Ingestion(#[from] StageFailure),

    /// Another session in this process already targets the lesson
    #[error("An upload for lesson {0} is already in progress. Wait for it to finish before starting another.")]
    SessionInProgress(LessonId),

    /// The session state machine refused a step
    #[error("Invalid session state: {0}")]
    SessionState(String),

    /// No usable bearer token
    #[error("Missing access token: {0}. Pass --token, --token-file, or set LECTERN_ACCESS_TOKEN.")]
    MissingToken(String),

    /// Required file is missing
    #[error("File not found: '{0}'. Verify the file path exists and you have read permissions.")]
    FileNotFound(String),

    /// A command-line value could not be used
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or config file.")]
    Config(String),

    /// Gave up waiting on the server
    #[error("Timed out: {0}")]
    Timeout(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built or a request failed outright
    #[error("Network request failed: {0}. Check your internet connection and server URL.")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// TOML config parsing failed
    #[error("Failed to parse config file: {0}. Check the file syntax at the indicated line/column.")]
    TomlParse(#[from] toml::de::Error),

    /// Error from the shared types crate
    #[error(transparent)]
    Common(#[from] LecternError),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// The stage failure behind this error, if any
    pub fn stage_failure(&self) -> Option<&StageFailure> {
        match self {
            Self::Ingestion(failure) => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::session::{FailureCause, FailureStage};

    #[test]
    fn test_error_messages_are_actionable() {
        let err = CliError::MissingToken("LECTERN_ACCESS_TOKEN is not set".into());
        assert!(err.to_string().contains("--token"));

        let err = CliError::SessionInProgress(LessonId(77));
        assert!(err.to_string().contains("lesson 77"));
    }

    #[test]
    fn test_stage_failure_conversion() {
        let failure = StageFailure::new(
            FailureStage::Notification,
            FailureCause::Network("connection reset".into()),
        );
        let err: CliError = failure.clone().into();
        assert_eq!(err.stage_failure(), Some(&failure));
        assert!(err.to_string().starts_with("Ingestion failed at NotificationFailed"));
        assert!(CliError::config("x").stage_failure().is_none());
    }
}
