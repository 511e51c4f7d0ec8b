//! Lesson record creation
//!
//! The lesson must exist before a credential can be requested: upload
//! credentials are scoped per lesson.

use lectern_common::types::{ChapterId, LessonId, LessonType};
use tracing::{info, instrument};

use super::session::{FailureCause, FailureStage, StageFailure};
use crate::api::{ApiClient, CreateLessonRequest};

/// Input for a new video lesson; immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonDraft {
    chapter_id: ChapterId,
    title: String,
    description: String,
}

impl LessonDraft {
    /// Validated draft; the title must contain something other than whitespace
    pub fn new(
        chapter_id: ChapterId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, StageFailure> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(StageFailure::validation("lesson title must not be empty"));
        }
        if chapter_id.0 <= 0 {
            return Err(StageFailure::validation(format!(
                "chapter id must be positive, got {}",
                chapter_id
            )));
        }
        Ok(Self {
            chapter_id,
            title,
            description: description.into(),
        })
    }

    pub fn chapter_id(&self) -> ChapterId {
        self.chapter_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn lesson_type(&self) -> LessonType {
        LessonType::Video
    }

    fn to_request(&self) -> CreateLessonRequest {
        CreateLessonRequest {
            title: self.title.clone(),
            description: self.description.clone(),
            lesson_type: self.lesson_type(),
        }
    }
}

/// Creates the durable lesson record a video will be attached to
#[derive(Clone)]
pub struct LessonDraftManager {
    api: ApiClient,
}

impl LessonDraftManager {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[instrument(skip(self, draft), fields(chapter_id = %draft.chapter_id()))]
    pub async fn create_lesson(&self, draft: &LessonDraft) -> Result<LessonId, StageFailure> {
        let lesson = self
            .api
            .create_lesson(draft.chapter_id(), &draft.to_request())
            .await
            .map_err(|e| StageFailure::new(FailureStage::LessonCreation, FailureCause::from(e)))?;

        info!(lesson_id = %lesson.id, title = %draft.title(), "Lesson created");
        Ok(lesson.id)
    }
}
