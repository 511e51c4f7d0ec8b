//! Local media inspection
//!
//! Everything here runs without touching the network: the declared media
//! type and size are checked first, then the duration is decoded by a
//! [`MediaProbe`] (ffprobe by default).

use async_trait::async_trait;
use mime::Mime;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::session::{FailureCause, FailureStage, StageFailure};
use crate::error::{CliError, Result};

/// A local file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub file_name: String,
    /// Declared media type, sent as `Content-Type` on upload
    pub content_type: Mime,
    pub size_bytes: u64,
}

impl MediaFile {
    /// Stat a local file and work out its declared media type
    ///
    /// An explicit `content_type` wins; otherwise the type is guessed from the
    /// file extension, falling back to `application/octet-stream`.
    pub async fn open(path: impl AsRef<Path>, content_type: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CliError::FileNotFound(path.display().to_string()),
            _ => CliError::Io(e),
        })?;
        if !metadata.is_file() {
            return Err(CliError::FileNotFound(path.display().to_string()));
        }

        let content_type = match content_type {
            Some(raw) => raw
                .parse::<Mime>()
                .map_err(|_| CliError::InvalidArgument(format!("'{}' is not a media type", raw)))?,
            None => mime_guess::from_path(path).first_or_octet_stream(),
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            content_type,
            size_bytes: metadata.len(),
        })
    }

    pub fn is_video(&self) -> bool {
        self.content_type.type_() == mime::VIDEO
    }
}

/// Reject files the pipeline must never start on
pub fn validate_media_file(file: &MediaFile, max_bytes: u64) -> std::result::Result<(), StageFailure> {
    if !file.is_video() {
        return Err(StageFailure::validation(format!(
            "'{}' is {}, not a video",
            file.file_name, file.content_type
        )));
    }
    if file.size_bytes == 0 {
        return Err(StageFailure::validation(format!("'{}' is empty", file.file_name)));
    }
    if file.size_bytes > max_bytes {
        return Err(StageFailure::validation(format!(
            "'{}' is {} bytes, larger than the {} byte limit",
            file.file_name, file.size_bytes, max_bytes
        )));
    }
    Ok(())
}

/// Intrinsic properties read from the file itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaMetadata {
    /// Floor of the decoded duration
    pub duration_seconds: u32,
}

/// Decodes a media container's duration
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Duration in (fractional) seconds
    async fn probe_duration(&self, path: &Path) -> std::result::Result<f64, FailureCause>;
}

/// [`MediaProbe`] backed by the `ffprobe` binary
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: PathBuf,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Whether the binary can be executed at all
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .output()
            .await
            .map(|out| out.status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe_duration(&self, path: &Path) -> std::result::Result<f64, FailureCause> {
        // `output()` waits for the child, so the probe process is reaped here
        let output = Command::new(&self.binary)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                FailureCause::Probe(format!("failed to run {}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FailureCause::Probe(format!(
                "ffprobe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse ffprobe's bare `format=duration` output
fn parse_probe_duration(stdout: &str) -> std::result::Result<f64, FailureCause> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    line.parse::<f64>()
        .map_err(|_| FailureCause::Probe(format!("no duration in probe output '{}'", line)))
}

/// Turns a decoded duration into whole seconds
fn whole_seconds(duration: f64) -> std::result::Result<u32, FailureCause> {
    if !duration.is_finite() || duration < 0.0 {
        return Err(FailureCause::Probe(format!("invalid duration {}", duration)));
    }
    let floored = duration.floor();
    if floored > f64::from(u32::MAX) {
        return Err(FailureCause::Probe(format!("duration {} out of range", duration)));
    }
    Ok(floored as u32)
}

/// Derives [`MediaMetadata`] for a validated file
#[derive(Clone)]
pub struct MetadataExtractor {
    probe: Arc<dyn MediaProbe>,
}

impl MetadataExtractor {
    pub fn new(probe: Arc<dyn MediaProbe>) -> Self {
        Self { probe }
    }

    #[instrument(skip(self, file), fields(file = %file.file_name))]
    pub async fn extract(&self, file: &MediaFile) -> std::result::Result<MediaMetadata, StageFailure> {
        let raw = self
            .probe
            .probe_duration(&file.path)
            .await
            .map_err(|cause| StageFailure::new(FailureStage::Validation, cause))?;
        let duration_seconds =
            whole_seconds(raw).map_err(|cause| StageFailure::new(FailureStage::Validation, cause))?;

        debug!(raw_duration = raw, duration_seconds, "Decoded media duration");
        Ok(MediaMetadata { duration_seconds })
    }
}
