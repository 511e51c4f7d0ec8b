//! Ingestion orchestration
//!
//! Drives one [`IngestionSession`] through its stages in order:
//!
//! ```text
//! validate -> extract metadata -> create lesson -> request credential
//!          -> upload to storage -> notify completion
//! ```
//!
//! Each stage starts only after the previous one succeeded. The first
//! failure halts the run and is recorded on the session; nothing is rolled
//! back. Cancellation is checked around every awaited stage.

use lectern_common::types::{Lesson, LessonId};
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use uuid::Uuid;

use super::credential::UploadCredentialBroker;
use super::draft::{LessonDraft, LessonDraftManager};
use super::metadata::{validate_media_file, FfprobeProbe, MediaFile, MediaProbe, MetadataExtractor};
use super::notifier::{CompletionNotifier, NotifyRetryPolicy};
use super::session::{FailureCause, FailureStage, IngestionSession, Phase, StageFailure};
use super::transport::DirectUploadTransport;
use crate::api::ApiClient;
use crate::config::Config;
use crate::error::{CliError, Result};

/// Lessons with an ingestion currently running in this process
#[derive(Debug, Clone, Default)]
pub struct ActiveSessions {
    lessons: Arc<Mutex<HashSet<LessonId>>>,
}

impl ActiveSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a lesson; `None` if another session already holds it
    pub fn try_acquire(&self, lesson_id: LessonId) -> Option<SessionLease> {
        if !lock(&self.lessons).insert(lesson_id) {
            return None;
        }
        Some(SessionLease {
            lesson_id,
            lessons: Arc::clone(&self.lessons),
        })
    }

    pub fn is_active(&self, lesson_id: LessonId) -> bool {
        lock(&self.lessons).contains(&lesson_id)
    }
}

/// Claim on a lesson, released on drop
#[derive(Debug)]
pub struct SessionLease {
    lesson_id: LessonId,
    lessons: Arc<Mutex<HashSet<LessonId>>>,
}

impl SessionLease {
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        lock(&self.lessons).remove(&self.lesson_id);
    }
}

fn lock(lessons: &Mutex<HashSet<LessonId>>) -> MutexGuard<'_, HashSet<LessonId>> {
    lessons.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Outcome of a completed ingestion
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    pub session_id: Uuid,
    pub lesson_id: LessonId,
    pub object_key: String,
    pub duration_seconds: u32,
    /// Lesson as returned by the completion call, when the server sent one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson: Option<Lesson>,
}

/// The stage components wired together
#[derive(Clone)]
pub struct IngestionPipeline {
    extractor: MetadataExtractor,
    drafts: LessonDraftManager,
    broker: UploadCredentialBroker,
    transport: DirectUploadTransport,
    notifier: CompletionNotifier,
    active: ActiveSessions,
    max_upload_bytes: u64,
}

impl IngestionPipeline {
    pub fn new(api: ApiClient, config: &Config) -> Result<Self> {
        Ok(Self {
            extractor: MetadataExtractor::new(Arc::new(FfprobeProbe::new(&config.ffprobe_path))),
            drafts: LessonDraftManager::new(api.clone()),
            broker: UploadCredentialBroker::new(api.clone(), config.credential_ttl()),
            transport: DirectUploadTransport::new(config.upload_timeout())?,
            notifier: CompletionNotifier::new(api),
            active: ActiveSessions::new(),
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    /// Replace the duration decoder (ffprobe by default)
    pub fn with_probe(mut self, probe: Arc<dyn MediaProbe>) -> Self {
        self.extractor = MetadataExtractor::new(probe);
        self
    }

    pub fn with_notify_retry(mut self, policy: NotifyRetryPolicy) -> Self {
        self.notifier = self.notifier.with_retry(policy);
        self
    }

    /// Share the active-session registry with other pipelines
    pub fn with_active_sessions(mut self, active: ActiveSessions) -> Self {
        self.active = active;
        self
    }

    pub fn active_sessions(&self) -> &ActiveSessions {
        &self.active
    }

    /// Create a new lesson from `draft` and attach `file` to it
    #[instrument(skip_all, fields(session_id = %session.id(), file = %file.file_name))]
    pub async fn run(
        &self,
        session: &mut IngestionSession,
        draft: LessonDraft,
        file: &MediaFile,
        cancel: &CancellationToken,
    ) -> Result<IngestionReport> {
        ensure_idle(session)?;
        let duration_seconds = self.extract(session, file, cancel).await?;

        session.transition(Phase::LessonCreating)?;
        let lesson_id = guarded(session, cancel, self.drafts.create_lesson(&draft)).await?;
        session.set_lesson(lesson_id);

        let _lease = match self.active.try_acquire(lesson_id) {
            Some(lease) => lease,
            None => {
                return Err(halt(
                    session,
                    StageFailure::new(
                        FailureStage::LessonCreation,
                        FailureCause::Invalid(format!("lesson {} is already being uploaded", lesson_id)),
                    ),
                ))
            },
        };

        self.upload_and_notify(session, lesson_id, duration_seconds, file, cancel)
            .await
    }

    /// Attach `file` to an existing lesson
    ///
    /// Fails with [`CliError::SessionInProgress`] before touching the session
    /// when another session in this process is already on the lesson.
    #[instrument(skip_all, fields(session_id = %session.id(), lesson_id = %lesson_id))]
    pub async fn run_for_lesson(
        &self,
        session: &mut IngestionSession,
        lesson_id: LessonId,
        file: &MediaFile,
        cancel: &CancellationToken,
    ) -> Result<IngestionReport> {
        ensure_idle(session)?;
        let _lease = self
            .active
            .try_acquire(lesson_id)
            .ok_or(CliError::SessionInProgress(lesson_id))?;

        let duration_seconds = self.extract(session, file, cancel).await?;
        session.set_lesson(lesson_id);

        self.upload_and_notify(session, lesson_id, duration_seconds, file, cancel)
            .await
    }

    /// Re-send the completion handoff of a session that failed only there
    ///
    /// Uses the object key and duration already on the session; the file is
    /// not uploaded again.
    #[instrument(skip_all, fields(session_id = %session.id()))]
    pub async fn retry_notification(
        &self,
        session: &mut IngestionSession,
        cancel: &CancellationToken,
    ) -> Result<IngestionReport> {
        if session.phase() != Phase::Failed(FailureStage::Notification) {
            return Err(CliError::SessionState(format!(
                "only a session that failed at notification can be retried, this one is {}",
                session.phase()
            )));
        }
        let (Some(lesson_id), Some(object_key), Some(duration_seconds)) = (
            session.lesson_id(),
            session.object_key().map(str::to_string),
            session.duration_seconds(),
        ) else {
            return Err(CliError::SessionState(
                "session has no uploaded object to hand off".to_string(),
            ));
        };

        let _lease = self
            .active
            .try_acquire(lesson_id)
            .ok_or(CliError::SessionInProgress(lesson_id))?;

        self.notify(session, lesson_id, object_key, duration_seconds, cancel)
            .await
    }

    /// Validation and metadata extraction; returns the whole-second duration
    async fn extract(
        &self,
        session: &mut IngestionSession,
        file: &MediaFile,
        cancel: &CancellationToken,
    ) -> Result<u32> {
        if let Err(failure) = validate_media_file(file, self.max_upload_bytes) {
            return Err(session.reject(failure).into());
        }

        session.transition(Phase::MetadataExtracting)?;
        let metadata = guarded(session, cancel, self.extractor.extract(file)).await?;
        session.set_duration(metadata.duration_seconds);
        Ok(metadata.duration_seconds)
    }

    async fn upload_and_notify(
        &self,
        session: &mut IngestionSession,
        lesson_id: LessonId,
        duration_seconds: u32,
        file: &MediaFile,
        cancel: &CancellationToken,
    ) -> Result<IngestionReport> {
        session.transition(Phase::CredentialRequesting)?;
        let credential = guarded(session, cancel, self.broker.request_credential(lesson_id)).await?;
        if let Err(failure) = credential.ensure_fresh(chrono::Utc::now()) {
            return Err(halt(session, failure));
        }
        let object_key = credential.object_key().to_string();
        session.set_object_key(object_key.clone());

        session.transition(Phase::Uploading)?;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = {
            let upload = self.transport.upload(credential, file, tx);
            tokio::pin!(upload);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        break Err(StageFailure::cancelled(FailureStage::Transport));
                    }
                    Some(percent) = rx.recv() => session.record_progress(percent),
                    result = &mut upload => break result,
                }
            }
        };
        while let Ok(percent) = rx.try_recv() {
            session.record_progress(percent);
        }
        if let Err(failure) = outcome {
            return Err(halt(session, failure));
        }
        session.record_progress(100);

        self.notify(session, lesson_id, object_key, duration_seconds, cancel)
            .await
    }

    async fn notify(
        &self,
        session: &mut IngestionSession,
        lesson_id: LessonId,
        object_key: String,
        duration_seconds: u32,
        cancel: &CancellationToken,
    ) -> Result<IngestionReport> {
        session.transition(Phase::CompletionNotifying)?;
        let lesson = guarded(
            session,
            cancel,
            self.notifier.notify(lesson_id, &object_key, duration_seconds),
        )
        .await?;
        session.transition(Phase::Completed)?;

        info!(lesson_id = %lesson_id, object_key = %object_key, "Ingestion completed");
        Ok(IngestionReport {
            session_id: session.id(),
            lesson_id,
            object_key,
            duration_seconds,
            lesson,
        })
    }
}

fn ensure_idle(session: &IngestionSession) -> Result<()> {
    if session.phase() != Phase::Idle {
        return Err(CliError::SessionState(format!(
            "session already ran (phase {})",
            session.phase()
        )));
    }
    Ok(())
}

/// Record `failure` on the session and turn it into the error to return
fn halt(session: &mut IngestionSession, failure: StageFailure) -> CliError {
    match session.fail(failure) {
        Ok(failure) => CliError::Ingestion(failure),
        Err(e) => e,
    }
}

/// Await a stage, racing it against cancellation
async fn guarded<T, F>(
    session: &mut IngestionSession,
    cancel: &CancellationToken,
    stage: F,
) -> Result<T>
where
    F: Future<Output = std::result::Result<T, StageFailure>>,
{
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StageFailure::cancelled(session.phase().failure_stage())),
        result = stage => result,
    };
    outcome.map_err(|failure| halt(session, failure))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_released_on_drop() {
        let active = ActiveSessions::new();
        let lease = active.try_acquire(LessonId(7)).unwrap();
        assert_eq!(lease.lesson_id(), LessonId(7));
        assert!(active.is_active(LessonId(7)));
        assert!(active.try_acquire(LessonId(7)).is_none());
        assert!(active.try_acquire(LessonId(8)).is_some());

        drop(lease);
        assert!(!active.is_active(LessonId(7)));
        assert!(active.try_acquire(LessonId(7)).is_some());
    }

    #[test]
    fn test_registry_is_shared_between_clones() {
        let active = ActiveSessions::new();
        let other = active.clone();
        let _lease = active.try_acquire(LessonId(3)).unwrap();
        assert!(other.try_acquire(LessonId(3)).is_none());
    }

    #[test]
    fn test_only_idle_sessions_run() {
        let mut session = IngestionSession::new();
        assert!(ensure_idle(&session).is_ok());
        session.transition(Phase::MetadataExtracting).unwrap();
        assert!(matches!(ensure_idle(&session), Err(CliError::SessionState(_))));
    }
}
