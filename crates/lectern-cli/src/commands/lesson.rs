//! `lectern lesson` command implementation
//!
//! Reads the server-owned video status of a lesson, optionally waiting for
//! transcoding to finish.

use colored::Colorize;
use lectern_common::types::{Lesson, LessonId, VideoStatus};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use super::CommandContext;
use crate::api::ApiClient;
use crate::error::{CliError, Result};
use crate::progress::{create_spinner, format_duration};

/// Show a lesson's video status
pub async fn status(
    ctx: &CommandContext,
    lesson_id: LessonId,
    wait: bool,
    interval_secs: u64,
    timeout_secs: u64,
) -> Result<()> {
    let api = ctx.api_client()?;
    let lesson = if wait {
        wait_for_terminal(
            &api,
            lesson_id,
            Duration::from_secs(interval_secs.max(1)),
            Duration::from_secs(timeout_secs),
        )
        .await?
    } else {
        api.get_lesson(lesson_id).await?
    };

    print_lesson(&lesson);
    if lesson.video_status == VideoStatus::Failed {
        return Err(CliError::Other(anyhow::anyhow!(
            "video processing failed for lesson {}",
            lesson_id
        )));
    }
    Ok(())
}

/// Poll until the video is ready or failed
///
/// A lesson without a video never gets there, so waiting on one is refused.
pub async fn wait_for_terminal(
    api: &ApiClient,
    lesson_id: LessonId,
    interval: Duration,
    timeout: Duration,
) -> Result<Lesson> {
    // A timeout past the clock's range means wait indefinitely
    let deadline = Instant::now().checked_add(timeout);
    let spinner = create_spinner(&format!("Waiting for lesson {}...", lesson_id));

    loop {
        let lesson = api.get_lesson(lesson_id).await?;
        debug!(lesson_id = %lesson_id, status = %lesson.video_status, "Polled lesson");

        if lesson.video_status.is_terminal() {
            spinner.finish_and_clear();
            return Ok(lesson);
        }
        if lesson.video_status == VideoStatus::None {
            spinner.finish_and_clear();
            return Err(CliError::invalid_argument(format!(
                "lesson {} has no video to wait for",
                lesson_id
            )));
        }
        let out_of_time = deadline.is_some_and(|deadline| {
            Instant::now()
                .checked_add(interval)
                .map_or(true, |next_poll| next_poll > deadline)
        });
        if out_of_time {
            spinner.finish_and_clear();
            return Err(CliError::timeout(format!(
                "lesson {} is still {} after {}s",
                lesson_id,
                lesson.video_status,
                timeout.as_secs()
            )));
        }

        spinner.set_message(format!("Lesson {}: {}", lesson_id, lesson.video_status));
        sleep(interval).await;
    }
}

fn print_lesson(lesson: &Lesson) {
    let status = lesson.video_status.to_string();
    let status = match lesson.video_status {
        VideoStatus::Ready => status.green(),
        VideoStatus::Failed => status.red(),
        VideoStatus::Uploaded | VideoStatus::Processing => status.yellow(),
        VideoStatus::None => status.bright_black(),
    };

    let title = lesson.title.as_deref().unwrap_or("(untitled)");
    println!("{} {}", format!("Lesson {}", lesson.id).cyan().bold(), title);
    println!("  Video status: {}", status);
    if let Some(ref key) = lesson.video_object_key {
        println!("  Object key:   {}", key);
    }
    if let Some(seconds) = lesson.duration_seconds {
        println!("  Duration:     {}", format_duration(seconds));
    }
}
