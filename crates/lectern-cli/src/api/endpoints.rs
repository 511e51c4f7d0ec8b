//! API endpoint URL builders

use lectern_common::types::{ChapterId, LessonId};

/// Join the server URL and the versioned API prefix without doubled slashes
pub fn api_base(server_url: &str, prefix: &str) -> String {
    let server = server_url.trim_end_matches('/');
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        server.to_string()
    } else {
        format!("{}/{}", server, prefix)
    }
}

/// `POST` target for creating a lesson in a chapter
pub fn chapter_lessons_url(api_base: &str, chapter_id: ChapterId) -> String {
    format!("{}/chapters/{}/lessons", api_base, chapter_id)
}

/// Lesson resource (read)
pub fn lesson_url(api_base: &str, lesson_id: LessonId) -> String {
    format!("{}/lessons/{}", api_base, lesson_id)
}

/// Presigned upload credential for a lesson
pub fn request_upload_url(api_base: &str, lesson_id: LessonId) -> String {
    format!("{}/lessons/{}/request-upload-url", api_base, lesson_id)
}

/// Completion handoff after the binary is in storage
pub fn upload_complete_url(api_base: &str, lesson_id: LessonId) -> String {
    format!("{}/lessons/{}/upload-complete", api_base, lesson_id)
}

/// A lesson's attached video (delete)
pub fn lesson_video_url(api_base: &str, lesson_id: LessonId) -> String {
    format!("{}/lessons/{}/video", api_base, lesson_id)
}

/// Build health check URL
pub fn health_url(server_url: &str) -> String {
    format!("{}/health", server_url.trim_end_matches('/'))
}
