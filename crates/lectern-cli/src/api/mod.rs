//! API client module
//!
//! HTTP client for the course platform's lesson endpoints.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::{ApiClient, ApiError};
pub use types::*;
