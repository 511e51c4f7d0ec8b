//! `lectern complete` command implementation
//!
//! Re-sends the completion call for an object that is already in storage,
//! e.g. after an upload whose final step failed. Nothing is uploaded.

use colored::Colorize;
use lectern_common::types::LessonId;

use super::CommandContext;
use crate::error::{CliError, Result};
use crate::ingest::CompletionNotifier;

pub async fn run(
    ctx: &CommandContext,
    lesson: LessonId,
    object_key: String,
    duration_seconds: u32,
) -> Result<()> {
    let object_key = object_key.trim();
    if object_key.is_empty() {
        return Err(CliError::invalid_argument("--object-key must not be empty"));
    }

    let notifier = CompletionNotifier::new(ctx.api_client()?);
    let updated = notifier.notify(lesson, object_key, duration_seconds).await?;

    println!("{} Lesson {} notified of {}", "✓".green(), lesson, object_key);
    if let Some(lesson) = updated {
        println!("  Status: {}", lesson.video_status);
    }
    Ok(())
}
