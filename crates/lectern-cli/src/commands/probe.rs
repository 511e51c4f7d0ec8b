//! `lectern probe` command implementation
//!
//! Runs the local checks of an upload (media type, size, duration) without
//! contacting the server.

use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use super::CommandContext;
use crate::error::{CliError, Result};
use crate::ingest::{validate_media_file, FfprobeProbe, MediaFile, MetadataExtractor};
use crate::progress::{format_bytes, format_duration};

pub async fn run(ctx: &CommandContext, file: PathBuf, content_type: Option<String>) -> Result<()> {
    let file = MediaFile::open(&file, content_type.as_deref()).await?;
    validate_media_file(&file, ctx.config.max_upload_bytes)
        .map_err(|failure| CliError::invalid_argument(failure.cause.to_string()))?;

    let extractor = MetadataExtractor::new(Arc::new(FfprobeProbe::new(&ctx.config.ffprobe_path)));
    let metadata = extractor.extract(&file).await?;

    println!("{}", file.file_name.cyan().bold());
    println!("  Type:     {}", file.content_type);
    println!("  Size:     {}", format_bytes(file.size_bytes));
    println!(
        "  Duration: {} ({}s)",
        format_duration(metadata.duration_seconds),
        metadata.duration_seconds
    );
    Ok(())
}
