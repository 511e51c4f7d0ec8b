//! API request and response types

use lectern_common::types::LessonType;
use serde::{Deserialize, Serialize};

/// Response body, either bare or wrapped in a `{ "data": ... }` envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiEnvelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> ApiEnvelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            ApiEnvelope::Wrapped { data } => data,
            ApiEnvelope::Bare(data) => data,
        }
    }
}

/// Error body the server sends with non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.trim().is_empty())
    }
}

/// Body of `POST /chapters/{chapterId}/lessons`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLessonRequest {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub lesson_type: LessonType,
}

/// Response of `GET /lessons/{lessonId}/request-upload-url`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    #[serde(alias = "uploadUrl")]
    pub presigned_url: String,
    #[serde(alias = "fileKey")]
    pub object_key: String,
}

/// Body of `POST /lessons/{lessonId}/upload-complete`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCompleteRequest {
    pub object_key: String,
    pub duration_seconds: u32,
}
