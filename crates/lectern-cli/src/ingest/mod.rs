//! Video lesson ingestion
//!
//! One module per stage, plus the session state they report into and the
//! pipeline that runs them in order.

pub mod credential;
pub mod draft;
pub mod metadata;
pub mod notifier;
pub mod pipeline;
pub mod session;
pub mod transport;

pub use credential::{UploadCredential, UploadCredentialBroker};
pub use draft::{LessonDraft, LessonDraftManager};
pub use metadata::{validate_media_file, FfprobeProbe, MediaFile, MediaMetadata, MediaProbe, MetadataExtractor};
pub use notifier::{CompletionNotifier, NotifyRetryPolicy};
pub use pipeline::{ActiveSessions, IngestionPipeline, IngestionReport, SessionLease};
pub use session::{
    FailureCause, FailureStage, IngestionSession, Phase, SessionSnapshot, StageFailure, StatusTone,
};
pub use transport::{DirectUploadTransport, ProgressTracker};
