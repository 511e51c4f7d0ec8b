//! Completion handoff
//!
//! Tells the server that the binary is in storage so it can bind the object
//! to the lesson and start processing. Until this succeeds the upload is
//! invisible to the lesson.

use lectern_common::types::{Lesson, LessonId};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

use super::session::{FailureCause, FailureStage, StageFailure};
use crate::api::{ApiClient, UploadCompleteRequest};

/// Bounded retries for the completion call
///
/// Only the handoff is retried automatically: every earlier stage either
/// mints new server state or re-sends the whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyRetryPolicy {
    max_retries: u8,
    base_delay: Duration,
}

impl Default for NotifyRetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl NotifyRetryPolicy {
    pub fn new(max_retries: u8) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(2),
        }
    }

    /// Single attempt
    pub fn none() -> Self {
        Self::new(0)
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn max_retries(&self) -> u8 {
        self.max_retries
    }

    pub fn should_retry(&self, attempt: u8, cause: &FailureCause) -> bool {
        if attempt >= self.max_retries {
            return false;
        }

        cause.is_retryable()
    }

    pub fn delay_for(&self, attempt: u8) -> Duration {
        let multiplier = 2u32.saturating_pow(u32::from(attempt));
        self.base_delay.saturating_mul(multiplier)
    }

    pub async fn wait_before_retry(&self, attempt: u8) {
        let delay = self.delay_for(attempt);
        info!(
            "Retrying completion in {}ms (attempt {})",
            delay.as_millis(),
            attempt + 2
        );
        sleep(delay).await;
    }
}

/// Sends the upload-complete call
#[derive(Clone)]
pub struct CompletionNotifier {
    api: ApiClient,
    retry: NotifyRetryPolicy,
}

impl CompletionNotifier {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            retry: NotifyRetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: NotifyRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Hand the stored object over to the server
    ///
    /// Returns the updated lesson when the server sends one back.
    #[instrument(skip(self), fields(lesson_id = %lesson_id))]
    pub async fn notify(
        &self,
        lesson_id: LessonId,
        object_key: &str,
        duration_seconds: u32,
    ) -> Result<Option<Lesson>, StageFailure> {
        let request = UploadCompleteRequest {
            object_key: object_key.to_string(),
            duration_seconds,
        };

        let mut attempt = 0u8;
        loop {
            match self.api.upload_complete(lesson_id, &request).await {
                Ok(lesson) => {
                    info!(object_key, duration_seconds, "Server notified of upload");
                    return Ok(lesson);
                },
                Err(e) => {
                    let cause = FailureCause::from(e);
                    if !self.retry.should_retry(attempt, &cause) {
                        return Err(StageFailure::new(FailureStage::Notification, cause));
                    }
                    warn!(error = %cause, attempt = attempt + 1, "Completion call failed");
                    self.retry.wait_before_retry(attempt).await;
                    attempt += 1;
                },
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_single_attempt() {
        let policy = NotifyRetryPolicy::default();
        assert!(!policy.should_retry(0, &FailureCause::Network("reset".into())));
    }

    #[test]
    fn test_retry_only_transient_causes() {
        let policy = NotifyRetryPolicy::new(2);
        assert!(policy.should_retry(0, &FailureCause::Network("reset".into())));
        assert!(policy.should_retry(1, &FailureCause::Status { status: 502, message: String::new() }));
        assert!(!policy.should_retry(2, &FailureCause::Network("reset".into())));
        assert!(!policy.should_retry(0, &FailureCause::Status { status: 400, message: String::new() }));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = NotifyRetryPolicy::new(3).with_base_delay(Duration::from_millis(100));
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }
}
