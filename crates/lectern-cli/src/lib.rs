//! Lectern CLI Library
//!
//! Command-line client for publishing video lessons to a course platform.
//!
//! # Overview
//!
//! - **Upload**: Create a lesson and attach a video in one go (`lectern upload`)
//! - **Attach**: Upload a video to an existing lesson (`lectern attach`)
//! - **Handoff**: Re-send the completion call for an uploaded object (`lectern complete`)
//! - **Inspect**: Check a local file and read its duration (`lectern probe`)
//! - **Lessons**: Read or wait on a lesson's video status (`lectern lesson status`)
//! - **Videos**: Detach a lesson's video (`lectern video delete`)
//! - **Diagnostics**: Check server, token, and ffprobe (`lectern doctor`)
//! - **Configuration**: Inspect effective settings (`lectern config`)
//!
//! Video bytes go straight from disk to object storage through a presigned
//! URL; the platform API only ever sees metadata.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod error;
pub mod ingest;
pub mod progress;

// Re-export commonly used types
pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use error::{CliError, Result};
pub use ingest::{IngestionPipeline, IngestionReport, IngestionSession};

use clap::{Parser, Subcommand};
use lectern_common::types::{ChapterId, LessonId};
use std::path::PathBuf;

/// Lectern - video lesson publishing
#[derive(Parser, Debug)]
#[command(name = "lectern")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Print the command reference as Markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Server URL (overrides the config file)
    #[arg(long, env = "LECTERN_SERVER_URL", global = true)]
    pub server_url: Option<String>,

    /// Bearer token for the platform API (falls back to LECTERN_ACCESS_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Read the bearer token from a file
    #[arg(long, global = true, conflicts_with = "token")]
    pub token_file: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a video lesson and upload its video
    Upload {
        /// Video file to upload
        file: PathBuf,

        /// Chapter the new lesson belongs to
        #[arg(short, long)]
        chapter: ChapterId,

        /// Lesson title
        #[arg(short, long)]
        title: String,

        /// Short lesson description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Declared media type (guessed from the extension by default)
        #[arg(long)]
        content_type: Option<String>,

        /// Extra attempts for the completion call on transient errors
        #[arg(long, default_value = "0")]
        notify_retries: u8,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload a video to an existing lesson
    Attach {
        /// Video file to upload
        file: PathBuf,

        /// Lesson to attach the video to
        #[arg(short, long)]
        lesson: LessonId,

        /// Declared media type (guessed from the extension by default)
        #[arg(long)]
        content_type: Option<String>,

        /// Extra attempts for the completion call on transient errors
        #[arg(long, default_value = "0")]
        notify_retries: u8,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-send the completion call for an object already in storage
    Complete {
        /// Lesson the object was uploaded for
        #[arg(short, long)]
        lesson: LessonId,

        /// Object key returned with the upload URL
        #[arg(long)]
        object_key: String,

        /// Video duration in whole seconds
        #[arg(long)]
        duration: u32,
    },

    /// Check a local video and print its duration
    Probe {
        /// Video file to inspect
        file: PathBuf,

        /// Declared media type (guessed from the extension by default)
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Lesson operations
    Lesson {
        #[command(subcommand)]
        command: LessonCommand,
    },

    /// Video operations
    Video {
        #[command(subcommand)]
        command: VideoCommand,
    },

    /// Check connectivity, credentials, and local tooling
    Doctor,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Lesson subcommands
#[derive(Subcommand, Debug)]
pub enum LessonCommand {
    /// Show a lesson's video status
    Status {
        /// Lesson id
        lesson: LessonId,

        /// Poll until the video is ready or failed
        #[arg(short, long)]
        wait: bool,

        /// Seconds between polls
        #[arg(long, default_value = "5")]
        interval: u64,

        /// Give up waiting after this many seconds
        #[arg(long, default_value = "600")]
        timeout: u64,
    },
}

/// Video subcommands
#[derive(Subcommand, Debug)]
pub enum VideoCommand {
    /// Remove the video attached to a lesson
    Delete {
        /// Lesson id
        lesson: LessonId,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Get configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Show all configuration
    Show,

    /// Print the config file location
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_upload_args() {
        let cli = Cli::try_parse_from([
            "lectern", "upload", "intro.mp4", "--chapter", "3", "--title", "Intro",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        match cli.command {
            Some(Commands::Upload { chapter, title, notify_retries, .. }) => {
                assert_eq!(chapter, ChapterId(3));
                assert_eq!(title, "Intro");
                assert_eq!(notify_retries, 0);
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_positive_ids() {
        assert!(Cli::try_parse_from(["lectern", "lesson", "status", "0"]).is_err());
        assert!(Cli::try_parse_from(["lectern", "video", "delete", "abc"]).is_err());
    }
}
