//! `lectern attach` command implementation
//!
//! Uploads a video to a lesson that already exists.

use lectern_common::types::LessonId;
use std::path::PathBuf;

use super::{cancel_on_ctrl_c, report_outcome, CommandContext};
use crate::error::Result;
use crate::ingest::{IngestionSession, MediaFile, NotifyRetryPolicy};
use crate::progress::{create_upload_progress, SessionRenderer};

/// Upload `file` and bind it to `lesson`
pub async fn run(
    ctx: &CommandContext,
    file: PathBuf,
    lesson: LessonId,
    content_type: Option<String>,
    notify_retries: u8,
    json: bool,
) -> Result<()> {
    let file = MediaFile::open(&file, content_type.as_deref()).await?;
    let pipeline = ctx
        .pipeline()?
        .with_notify_retry(NotifyRetryPolicy::new(notify_retries));

    let mut session = IngestionSession::new();
    let cancel = cancel_on_ctrl_c();
    let renderer =
        (!json).then(|| SessionRenderer::spawn(session.subscribe(), create_upload_progress()));

    let outcome = pipeline
        .run_for_lesson(&mut session, lesson, &file, &cancel)
        .await;

    if let Some(renderer) = renderer {
        renderer.finish().await;
    }
    report_outcome(&session, outcome, json)
}
