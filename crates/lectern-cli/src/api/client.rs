//! HTTP API client for the course platform
//!
//! Every call carries the bearer token from the injected [`TokenProvider`].
//! Errors stay typed ([`ApiError`]) so the ingestion stages can classify them.

use crate::api::{endpoints, types::*};
use crate::auth::TokenProvider;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::ingest::session::FailureCause;
use lectern_common::types::{ChapterId, Lesson, LessonId};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Longest server error body echoed back to the user
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Failure of a single API call
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Auth(String),

    #[error("server responded with {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<ApiError> for FailureCause {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(msg) => FailureCause::Auth(msg),
            ApiError::Status { status, message } => FailureCause::Status {
                status: status.as_u16(),
                message,
            },
            ApiError::Transport(e) => FailureCause::Network(e.to_string()),
            ApiError::Decode(msg) => FailureCause::MalformedResponse(msg),
        }
    }
}

/// API client for the lesson endpoints
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    server_url: String,
    api_base: String,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: &Config, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.api_timeout())
            .user_agent(concat!("lectern/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CliError::Http)?;

        Ok(Self {
            client,
            server_url: config.server_url.trim_end_matches('/').to_string(),
            api_base: endpoints::api_base(&config.server_url, &config.api_prefix),
            tokens,
        })
    }

    /// Check server health (best effort, unauthenticated)
    pub async fn health_check(&self) -> bool {
        let url = endpoints::health_url(&self.server_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Create a lesson in a chapter
    pub async fn create_lesson(
        &self,
        chapter_id: ChapterId,
        request: &CreateLessonRequest,
    ) -> std::result::Result<Lesson, ApiError> {
        let url = endpoints::chapter_lessons_url(&self.api_base, chapter_id);
        let response = self.authorized(self.client.post(&url))?.json(request).send().await?;
        read_json(response).await
    }

    /// Fetch a lesson, including its server-owned video status
    pub async fn get_lesson(&self, lesson_id: LessonId) -> std::result::Result<Lesson, ApiError> {
        let url = endpoints::lesson_url(&self.api_base, lesson_id);
        let response = self.authorized(self.client.get(&url))?.send().await?;
        read_json(response).await
    }

    /// Ask for a presigned URL scoped to the lesson
    pub async fn request_upload_url(
        &self,
        lesson_id: LessonId,
    ) -> std::result::Result<UploadUrlResponse, ApiError> {
        let url = endpoints::request_upload_url(&self.api_base, lesson_id);
        let response = self.authorized(self.client.get(&url))?.send().await?;
        read_json(response).await
    }

    /// Tell the server the binary is in storage
    ///
    /// Returns the updated lesson when the server sends one back.
    pub async fn upload_complete(
        &self,
        lesson_id: LessonId,
        request: &UploadCompleteRequest,
    ) -> std::result::Result<Option<Lesson>, ApiError> {
        let url = endpoints::upload_complete_url(&self.api_base, lesson_id);
        let response = self.authorized(self.client.post(&url))?.json(request).send().await?;
        read_optional_json(response).await
    }

    /// Remove the video attached to a lesson
    pub async fn delete_video(
        &self,
        lesson_id: LessonId,
    ) -> std::result::Result<Option<Lesson>, ApiError> {
        let url = endpoints::lesson_video_url(&self.api_base, lesson_id);
        let response = self.authorized(self.client.delete(&url))?.send().await?;
        read_optional_json(response).await
    }

    /// Get the server URL
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Get the versioned API base URL
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn authorized(&self, request: RequestBuilder) -> std::result::Result<RequestBuilder, ApiError> {
        let token = self
            .tokens
            .bearer_token()
            .map_err(|e| ApiError::Auth(e.to_string()))?;
        Ok(request.bearer_auth(token))
    }
}

/// Turn a non-2xx response into [`ApiError::Status`]
async fn ensure_success(response: Response) -> std::result::Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| truncate(body.trim(), MAX_ERROR_BODY_CHARS));
    let message = if message.is_empty() {
        status.canonical_reason().unwrap_or("no details").to_string()
    } else {
        message
    };

    Err(ApiError::Status { status, message })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> std::result::Result<T, ApiError> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice::<ApiEnvelope<T>>(&bytes)
        .map(ApiEnvelope::into_inner)
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Like [`read_json`], but an empty or unrecognised 2xx body is not an error
async fn read_optional_json<T: DeserializeOwned>(
    response: Response,
) -> std::result::Result<Option<T>, ApiError> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    match serde_json::from_slice::<ApiEnvelope<T>>(&bytes) {
        Ok(envelope) => Ok(Some(envelope.into_inner())),
        Err(e) => {
            debug!(error = %e, "Ignoring unrecognised success body");
            Ok(None)
        },
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
