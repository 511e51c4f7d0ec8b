//! Direct-to-storage upload
//!
//! The file is streamed from disk straight to the presigned URL. The API
//! server never sees the bytes, and no bearer token is sent to storage.

use futures::TryStreamExt;
use reqwest::{Body, Client};
use std::time::Duration;
use tokio::fs::File;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, instrument};

use super::credential::UploadCredential;
use super::metadata::MediaFile;
use super::session::{FailureCause, FailureStage, StageFailure};
use crate::error::{CliError, Result};

/// Highest percentage reported while bytes are still in flight
const IN_FLIGHT_CAP: u8 = 99;

/// Turns byte counts into whole percentages, emitting only on change
///
/// 100 is never produced here: it is reserved for the storage service's
/// 2xx acknowledgement.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    sent: u64,
    last: Option<u8>,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            sent: 0,
            last: None,
        }
    }

    /// Account for `bytes` more and return the new percentage if it moved
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        self.sent = self.sent.saturating_add(bytes);
        let percent = if self.total == 0 {
            IN_FLIGHT_CAP
        } else {
            let raw = self.sent.min(self.total).saturating_mul(100) / self.total;
            (raw as u8).min(IN_FLIGHT_CAP)
        };
        if self.last == Some(percent) {
            return None;
        }
        self.last = Some(percent);
        Some(percent)
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

/// Streams a file to a presigned URL
#[derive(Clone)]
pub struct DirectUploadTransport {
    client: Client,
}

impl DirectUploadTransport {
    /// A client of its own: no API base URL, no auth, a long timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lectern/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CliError::Http)?;
        Ok(Self { client })
    }

    /// PUT the file to the credential's URL
    ///
    /// The credential is consumed: a transfer attempt never reuses one.
    /// Percentages are sent on `progress` as they change; 100 only once
    /// storage acknowledged the write.
    #[instrument(
        skip(self, credential, file, progress),
        fields(object_key = %credential.object_key(), size = file.size_bytes)
    )]
    pub async fn upload(
        &self,
        credential: UploadCredential,
        file: &MediaFile,
        progress: UnboundedSender<u8>,
    ) -> std::result::Result<(), StageFailure> {
        let fail = |cause| StageFailure::new(FailureStage::Transport, cause);

        let handle = File::open(&file.path).await.map_err(|e| {
            fail(FailureCause::Network(format!(
                "cannot read {}: {}",
                file.path.display(),
                e
            )))
        })?;

        let mut tracker = ProgressTracker::new(file.size_bytes);
        let chunk_progress = progress.clone();
        let stream = ReaderStream::new(handle).inspect_ok(move |chunk| {
            if let Some(percent) = tracker.advance(chunk.len() as u64) {
                let _ = chunk_progress.send(percent);
            }
        });

        let response = self
            .client
            .put(credential.presigned_url().clone())
            .header(reqwest::header::CONTENT_TYPE, file.content_type.as_ref())
            .header(reqwest::header::CONTENT_LENGTH, file.size_bytes)
            .body(Body::wrap_stream(stream))
            .send()
            .await
            .map_err(|e| fail(FailureCause::Network(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, body = %body, "Storage rejected upload");
            return Err(fail(FailureCause::Status {
                status: status.as_u16(),
                message: storage_error_message(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string()),
            }));
        }

        let _ = progress.send(100);
        info!(
            "Uploaded {} ({:.2} MB)",
            file.file_name,
            file.size_bytes as f64 / (1024.0 * 1024.0)
        );
        Ok(())
    }
}

/// The `<Message>` of an S3-style XML error body
fn storage_error_message(body: &str) -> Option<String> {
    let start = body.find("<Message>")? + "<Message>".len();
    let end = body[start..].find("</Message>")? + start;
    let message = body[start..end].trim();
    (!message.is_empty()).then(|| message.to_string())
}
