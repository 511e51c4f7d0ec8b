//! Error types shared across Lectern crates

use thiserror::Error;

/// Result type alias for Lectern operations
pub type Result<T> = std::result::Result<T, LecternError>;

/// Main error type for Lectern
#[derive(Error, Debug)]
pub enum LecternError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown video status: {0}")]
    UnknownVideoStatus(String),

    #[error("Unknown lesson type: {0}")]
    UnknownLessonType(String),
}

impl LecternError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = LecternError::UnknownVideoStatus("DONE".to_string());
        assert_eq!(err.to_string(), "Unknown video status: DONE");

        let err = LecternError::parse("bad lesson id");
        assert_eq!(err.to_string(), "Parse error: bad lesson id");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: LecternError = io.into();
        assert!(matches!(err, LecternError::Io(_)));
    }
}
