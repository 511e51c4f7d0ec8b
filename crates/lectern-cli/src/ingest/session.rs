//! Ingestion session state
//!
//! An [`IngestionSession`] is the client-owned, in-memory record of one video
//! ingestion. Only the pipeline mutates it; presentation layers subscribe to
//! [`SessionSnapshot`]s and derive everything they show from them.

use chrono::{DateTime, Utc};
use lectern_common::types::LessonId;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{CliError, Result};

/// Pipeline stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureStage {
    Validation,
    LessonCreation,
    CredentialRequest,
    Transport,
    Notification,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Validation => write!(f, "ValidationFailed"),
            FailureStage::LessonCreation => write!(f, "LessonCreationFailed"),
            FailureStage::CredentialRequest => write!(f, "CredentialRequestFailed"),
            FailureStage::Transport => write!(f, "TransportFailed"),
            FailureStage::Notification => write!(f, "NotificationFailed"),
        }
    }
}

/// Why a stage failed
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum FailureCause {
    #[error("{0}")]
    Invalid(String),

    #[error("could not read media: {0}")]
    Probe(String),

    #[error("not authenticated: {0}")]
    Auth(String),

    #[error("server responded with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    MalformedResponse(String),

    #[error("upload credential expired at {0}")]
    CredentialExpired(DateTime<Utc>),

    #[error("cancelled")]
    Cancelled,
}

impl FailureCause {
    /// Transient causes worth another attempt at an idempotent stage
    pub fn is_retryable(&self) -> bool {
        match self {
            FailureCause::Network(_) => true,
            FailureCause::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// A stage outcome that halted the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{stage}: {cause}")]
pub struct StageFailure {
    pub stage: FailureStage,
    pub cause: FailureCause,
}

impl StageFailure {
    pub fn new(stage: FailureStage, cause: FailureCause) -> Self {
        Self { stage, cause }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(FailureStage::Validation, FailureCause::Invalid(msg.into()))
    }

    pub fn cancelled(stage: FailureStage) -> Self {
        Self::new(stage, FailureCause::Cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cause == FailureCause::Cancelled
    }
}

/// Phase of an ingestion session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    Idle,
    MetadataExtracting,
    LessonCreating,
    CredentialRequesting,
    Uploading,
    CompletionNotifying,
    Completed,
    Failed(FailureStage),
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed(_))
    }

    /// Stage a failure in this phase is attributed to
    pub fn failure_stage(self) -> FailureStage {
        match self {
            Phase::Idle | Phase::MetadataExtracting => FailureStage::Validation,
            Phase::LessonCreating => FailureStage::LessonCreation,
            Phase::CredentialRequesting => FailureStage::CredentialRequest,
            Phase::Uploading => FailureStage::Transport,
            Phase::CompletionNotifying => FailureStage::Notification,
            Phase::Completed => FailureStage::Notification,
            Phase::Failed(stage) => stage,
        }
    }

    /// Whether `self -> next` is a legal step
    ///
    /// Steps are strictly sequential. Lesson creation is skipped when the
    /// video is attached to an existing lesson, and the only way out of a
    /// failed state is re-sending the completion handoff.
    pub fn can_transition_to(self, next: Phase) -> bool {
        use Phase::*;
        match (self, next) {
            (Idle, MetadataExtracting)
            | (MetadataExtracting, LessonCreating)
            | (MetadataExtracting, CredentialRequesting)
            | (LessonCreating, CredentialRequesting)
            | (CredentialRequesting, Uploading)
            | (Uploading, CompletionNotifying)
            | (CompletionNotifying, Completed) => true,
            (Failed(FailureStage::Notification), CompletionNotifying) => true,
            (from, Failed(_)) => !from.is_terminal() && from != Idle,
            _ => false,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::MetadataExtracting => write!(f, "MetadataExtracting"),
            Phase::LessonCreating => write!(f, "LessonCreating"),
            Phase::CredentialRequesting => write!(f, "CredentialRequesting"),
            Phase::Uploading => write!(f, "Uploading"),
            Phase::CompletionNotifying => write!(f, "CompletionNotifying"),
            Phase::Completed => write!(f, "Completed"),
            Phase::Failed(stage) => write!(f, "Failed({})", stage),
        }
    }
}

/// Coarse status category for presentation (maps onto a color)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Neutral,
    Active,
    Success,
    Error,
}

/// Everything a presentation layer may know about a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub progress_percent: u8,
    pub last_error: Option<StageFailure>,
}

impl SessionSnapshot {
    fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            progress_percent: 0,
            last_error: None,
        }
    }

    /// No further change will be published for this run
    pub fn is_settled(&self) -> bool {
        self.phase.is_terminal() || (self.phase == Phase::Idle && self.last_error.is_some())
    }

    pub fn status_tone(&self) -> StatusTone {
        match self.phase {
            Phase::Idle if self.last_error.is_some() => StatusTone::Error,
            Phase::Idle => StatusTone::Neutral,
            Phase::Completed => StatusTone::Success,
            Phase::Failed(_) => StatusTone::Error,
            _ => StatusTone::Active,
        }
    }

    pub fn status_text(&self) -> String {
        match self.phase {
            Phase::Idle => match &self.last_error {
                Some(failure) => format!("File rejected: {}", failure.cause),
                None => "Ready to upload".to_string(),
            },
            Phase::MetadataExtracting => "Reading video metadata...".to_string(),
            Phase::LessonCreating => "Creating lesson...".to_string(),
            Phase::CredentialRequesting => "Requesting upload URL...".to_string(),
            Phase::Uploading => format!("Uploading... {}%", self.progress_percent),
            Phase::CompletionNotifying => "Processing video...".to_string(),
            Phase::Completed => "Upload completed!".to_string(),
            Phase::Failed(stage) => failure_text(stage, self.progress_percent, self.last_error.as_ref()),
        }
    }
}

fn failure_text(stage: FailureStage, progress: u8, failure: Option<&StageFailure>) -> String {
    if failure.is_some_and(StageFailure::is_cancelled) {
        return "Upload cancelled.".to_string();
    }
    match stage {
        FailureStage::Validation => "Video could not be read. Choose a different file.".to_string(),
        FailureStage::LessonCreation => "Could not create the lesson. Please try again.".to_string(),
        FailureStage::CredentialRequest => {
            "Could not get an upload URL. Please try again.".to_string()
        },
        FailureStage::Transport => format!("Upload failed at {}%. Please try again.", progress),
        FailureStage::Notification => {
            "Video uploaded, but the server was not notified. Retry to finish without re-uploading."
                .to_string()
        },
    }
}

/// Mutable state of one ingestion
#[derive(Debug)]
pub struct IngestionSession {
    id: Uuid,
    phase: Phase,
    progress_percent: u8,
    last_error: Option<StageFailure>,
    lesson_id: Option<LessonId>,
    duration_seconds: Option<u32>,
    object_key: Option<String>,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl Default for IngestionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestionSession {
    pub fn new() -> Self {
        let now = Utc::now();
        let (snapshots, _) = watch::channel(SessionSnapshot::idle());
        Self {
            id: Uuid::new_v4(),
            phase: Phase::Idle,
            progress_percent: 0,
            last_error: None,
            lesson_id: None,
            duration_seconds: None,
            object_key: None,
            started_at: now,
            updated_at: now,
            snapshots,
        }
    }

    /// Receive a snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            progress_percent: self.progress_percent,
            last_error: self.last_error.clone(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn last_error(&self) -> Option<&StageFailure> {
        self.last_error.as_ref()
    }

    pub fn lesson_id(&self) -> Option<LessonId> {
        self.lesson_id
    }

    pub fn duration_seconds(&self) -> Option<u32> {
        self.duration_seconds
    }

    pub fn object_key(&self) -> Option<&str> {
        self.object_key.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub(crate) fn transition(&mut self, next: Phase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(CliError::SessionState(format!(
                "cannot move from {} to {}",
                self.phase, next
            )));
        }
        debug!(session_id = %self.id, from = %self.phase, to = %next, "Phase transition");
        if next == Phase::Uploading {
            self.progress_percent = 0;
        }
        if !matches!(next, Phase::Failed(_)) {
            self.last_error = None;
        }
        self.phase = next;
        self.publish();
        Ok(())
    }

    /// Halt the pipeline at the current phase
    pub(crate) fn fail(&mut self, failure: StageFailure) -> Result<StageFailure> {
        let next = Phase::Failed(failure.stage);
        if !self.phase.can_transition_to(next) {
            return Err(CliError::SessionState(format!(
                "cannot fail from {} with {}",
                self.phase, failure
            )));
        }
        warn!(
            session_id = %self.id,
            stage = %failure.stage,
            cause = %failure.cause,
            progress = self.progress_percent,
            "Ingestion stage failed"
        );
        self.phase = next;
        self.last_error = Some(failure.clone());
        self.publish();
        Ok(failure)
    }

    /// Refuse the input file; the session never leaves `Idle`
    pub(crate) fn reject(&mut self, failure: StageFailure) -> StageFailure {
        warn!(session_id = %self.id, cause = %failure.cause, "File rejected before ingestion");
        self.last_error = Some(failure.clone());
        self.publish();
        failure
    }

    /// Record upload progress; ignored outside `Uploading` and when it would go backwards
    pub(crate) fn record_progress(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.phase != Phase::Uploading || percent <= self.progress_percent {
            return;
        }
        self.progress_percent = percent;
        self.publish();
    }

    pub(crate) fn set_duration(&mut self, seconds: u32) {
        self.duration_seconds = Some(seconds);
    }

    pub(crate) fn set_lesson(&mut self, lesson_id: LessonId) {
        self.lesson_id = Some(lesson_id);
    }

    /// Only ever called with the key of a credential issued during this session
    pub(crate) fn set_object_key(&mut self, key: String) {
        self.object_key = Some(key);
    }

    fn publish(&mut self) {
        self.updated_at = Utc::now();
        self.snapshots.send_replace(self.snapshot());
    }
}
