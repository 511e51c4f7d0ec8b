//! Lectern Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the Lectern workspace.
//!
//! # Overview
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Centralized `tracing` setup shared by every binary
//! - **Types**: Lesson and video domain types as the course platform serves them
//!
//! # Example
//!
//! ```no_run
//! use lectern_common::types::VideoStatus;
//!
//! let status: VideoStatus = "PROCESSING".parse().unwrap();
//! assert!(status.is_in_progress());
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{LecternError, Result};
