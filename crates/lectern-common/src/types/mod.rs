//! Course-content types shared by Lectern clients
//!
//! These mirror the lesson resources served by the course platform API.
//! The video lifecycle ([`VideoStatus`]) is owned by the server: clients
//! read it, they never drive it past [`VideoStatus::Uploaded`].

use crate::error::LecternError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a lesson on the course platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonId(pub i64);

impl std::fmt::Display for LessonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for LessonId {
    type Err = LecternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_positive_id(s).map(LessonId)
    }
}

/// Identifier of a chapter on the course platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterId(pub i64);

impl std::fmt::Display for ChapterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ChapterId {
    type Err = LecternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_positive_id(s).map(ChapterId)
    }
}

fn parse_positive_id(s: &str) -> Result<i64, LecternError> {
    let id: i64 = s
        .trim()
        .parse()
        .map_err(|_| LecternError::parse(format!("'{}' is not a numeric id", s)))?;
    if id <= 0 {
        return Err(LecternError::parse(format!("id must be positive, got {}", id)));
    }
    Ok(id)
}

/// Server-owned lifecycle of a lesson's video
///
/// `NONE → UPLOADED → PROCESSING → READY | FAILED`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum VideoStatus {
    /// No binary attached yet
    #[default]
    None,
    /// Binary stored, waiting for transcoding
    Uploaded,
    /// Transcoding in progress
    Processing,
    /// Streaming-ready
    Ready,
    /// Transcoding failed
    Failed,
}

impl VideoStatus {
    /// Uploaded or being transcoded
    pub fn is_in_progress(self) -> bool {
        matches!(self, VideoStatus::Uploaded | VideoStatus::Processing)
    }

    /// No further server-side transition is expected
    pub fn is_terminal(self) -> bool {
        matches!(self, VideoStatus::Ready | VideoStatus::Failed)
    }
}

impl std::str::FromStr for VideoStatus {
    type Err = LecternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NONE" => Ok(VideoStatus::None),
            "UPLOADED" => Ok(VideoStatus::Uploaded),
            "PROCESSING" => Ok(VideoStatus::Processing),
            "READY" => Ok(VideoStatus::Ready),
            "FAILED" => Ok(VideoStatus::Failed),
            _ => Err(LecternError::UnknownVideoStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoStatus::None => write!(f, "NONE"),
            VideoStatus::Uploaded => write!(f, "UPLOADED"),
            VideoStatus::Processing => write!(f, "PROCESSING"),
            VideoStatus::Ready => write!(f, "READY"),
            VideoStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Kind of lesson content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LessonType {
    Video,
    Document,
    Quiz,
    Assignment,
}

impl std::str::FromStr for LessonType {
    type Err = LecternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "VIDEO" => Ok(LessonType::Video),
            "DOCUMENT" => Ok(LessonType::Document),
            "QUIZ" => Ok(LessonType::Quiz),
            "ASSIGNMENT" => Ok(LessonType::Assignment),
            _ => Err(LecternError::UnknownLessonType(s.to_string())),
        }
    }
}

impl std::fmt::Display for LessonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LessonType::Video => write!(f, "VIDEO"),
            LessonType::Document => write!(f, "DOCUMENT"),
            LessonType::Quiz => write!(f, "QUIZ"),
            LessonType::Assignment => write!(f, "ASSIGNMENT"),
        }
    }
}

/// A lesson as returned by lesson-read calls
///
/// Only `id` is required; the remaining fields are tolerated missing so that
/// the lean `{ id }` creation response and the full lesson resource both parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    #[serde(alias = "lessonId")]
    pub id: LessonId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<ChapterId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub lesson_type: Option<LessonType>,

    #[serde(default, alias = "shortDescription", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Missing or null means no video has been attached
    #[serde(default, deserialize_with = "deserialize_video_status")]
    pub video_status: VideoStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_object_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn deserialize_video_status<'de, D>(deserializer: D) -> Result<VideoStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<VideoStatus> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_video_status_from_str() {
        assert_eq!("none".parse::<VideoStatus>().unwrap(), VideoStatus::None);
        assert_eq!("UPLOADED".parse::<VideoStatus>().unwrap(), VideoStatus::Uploaded);
        assert_eq!("Processing".parse::<VideoStatus>().unwrap(), VideoStatus::Processing);
        assert_eq!("ready".parse::<VideoStatus>().unwrap(), VideoStatus::Ready);
        assert_eq!("FAILED".parse::<VideoStatus>().unwrap(), VideoStatus::Failed);
        assert!("DONE".parse::<VideoStatus>().is_err());
    }

    #[test]
    fn test_video_status_lifecycle_helpers() {
        assert!(!VideoStatus::None.is_in_progress());
        assert!(VideoStatus::Uploaded.is_in_progress());
        assert!(VideoStatus::Processing.is_in_progress());
        assert!(VideoStatus::Ready.is_terminal());
        assert!(VideoStatus::Failed.is_terminal());
        assert!(!VideoStatus::Processing.is_terminal());
    }

    #[test]
    fn test_lesson_id_parsing() {
        assert_eq!("77".parse::<LessonId>().unwrap(), LessonId(77));
        assert!("0".parse::<LessonId>().is_err());
        assert!("-3".parse::<LessonId>().is_err());
        assert!("abc".parse::<ChapterId>().is_err());
        assert_eq!(" 3 ".parse::<ChapterId>().unwrap(), ChapterId(3));
    }

    #[test]
    fn test_lesson_minimal_response() {
        let lesson: Lesson = serde_json::from_str(r#"{"id": 77}"#).unwrap();
        assert_eq!(lesson.id, LessonId(77));
        assert_eq!(lesson.video_status, VideoStatus::None);
        assert!(lesson.video_object_key.is_none());
    }

    #[test]
    fn test_lesson_full_response() {
        let json = r#"{
            "id": 77,
            "chapterId": 3,
            "title": "Intro",
            "type": "VIDEO",
            "shortDescription": "Welcome",
            "videoStatus": "PROCESSING",
            "videoObjectKey": "lessons/77/video.mp4",
            "durationSeconds": 125
        }"#;
        let lesson: Lesson = serde_json::from_str(json).unwrap();
        assert_eq!(lesson.chapter_id, Some(ChapterId(3)));
        assert_eq!(lesson.lesson_type, Some(LessonType::Video));
        assert_eq!(lesson.description.as_deref(), Some("Welcome"));
        assert_eq!(lesson.video_status, VideoStatus::Processing);
        assert_eq!(lesson.duration_seconds, Some(125));
    }

    #[test]
    fn test_lesson_null_video_status() {
        let lesson: Lesson =
            serde_json::from_str(r#"{"lessonId": 5, "videoStatus": null}"#).unwrap();
        assert_eq!(lesson.id, LessonId(5));
        assert_eq!(lesson.video_status, VideoStatus::None);
    }
}
