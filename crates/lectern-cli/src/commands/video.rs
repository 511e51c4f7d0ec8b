//! `lectern video` command implementation

use colored::Colorize;
use lectern_common::types::LessonId;
use tracing::info;

use super::CommandContext;
use crate::error::Result;

/// Detach the video from a lesson
///
/// Storage cleanup of the object is the server's business.
pub async fn delete(ctx: &CommandContext, lesson_id: LessonId) -> Result<()> {
    let api = ctx.api_client()?;
    let updated = api.delete_video(lesson_id).await?;

    info!(lesson_id = %lesson_id, "Lesson video deleted");
    println!("{} Removed the video from lesson {}", "✓".green(), lesson_id);
    if let Some(lesson) = updated {
        println!("  Video status: {}", lesson.video_status);
    }
    Ok(())
}
