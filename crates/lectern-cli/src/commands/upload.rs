//! `lectern upload` command implementation
//!
//! Creates a video lesson and uploads its video in a single session.

use lectern_common::types::ChapterId;
use std::path::PathBuf;
use tracing::info;

use super::{cancel_on_ctrl_c, report_outcome, CommandContext};
use crate::error::Result;
use crate::ingest::{IngestionSession, LessonDraft, MediaFile, NotifyRetryPolicy};
use crate::progress::{create_upload_progress, format_bytes, SessionRenderer};

/// Arguments of `lectern upload`
#[derive(Debug, Clone)]
pub struct UploadArgs {
    pub file: PathBuf,
    pub chapter: ChapterId,
    pub title: String,
    pub description: String,
    pub content_type: Option<String>,
    pub notify_retries: u8,
    pub json: bool,
}

/// Create the lesson, upload the file, and hand it off
pub async fn run(ctx: &CommandContext, args: UploadArgs) -> Result<()> {
    let file = MediaFile::open(&args.file, args.content_type.as_deref()).await?;
    let draft = LessonDraft::new(args.chapter, args.title, args.description)?;
    let pipeline = ctx
        .pipeline()?
        .with_notify_retry(NotifyRetryPolicy::new(args.notify_retries));

    info!(
        file = %file.file_name,
        size = %format_bytes(file.size_bytes),
        chapter = %args.chapter,
        "Starting upload"
    );

    let mut session = IngestionSession::new();
    let cancel = cancel_on_ctrl_c();
    let renderer = (!args.json)
        .then(|| SessionRenderer::spawn(session.subscribe(), create_upload_progress()));

    let outcome = pipeline.run(&mut session, draft, &file, &cancel).await;

    if let Some(renderer) = renderer {
        renderer.finish().await;
    }
    report_outcome(&session, outcome, args.json)
}
