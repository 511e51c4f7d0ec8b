//! Progress display for CLI operations
//!
//! The upload view is a pure projection of [`SessionSnapshot`]s: it never
//! looks at the session itself.

use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ingest::{Phase, SessionSnapshot, StatusTone};

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Create a percentage bar for an upload session
pub fn create_upload_progress() -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Status line colored by its tone
pub fn styled_status(snapshot: &SessionSnapshot) -> ColoredString {
    let text = snapshot.status_text();
    match snapshot.status_tone() {
        StatusTone::Neutral => text.bright_black(),
        StatusTone::Active => text.yellow(),
        StatusTone::Success => text.green(),
        StatusTone::Error => text.red(),
    }
}

/// Draws session snapshots until the session settles or [`finish`] is called
///
/// [`finish`]: SessionRenderer::finish
pub struct SessionRenderer {
    handle: JoinHandle<()>,
    stop: CancellationToken,
}

impl SessionRenderer {
    pub fn spawn(mut snapshots: watch::Receiver<SessionSnapshot>, pb: ProgressBar) -> Self {
        let stop = CancellationToken::new();
        let stopped = stop.clone();

        let handle = tokio::spawn(async move {
            loop {
                let snapshot = snapshots.borrow_and_update().clone();
                draw(&pb, &snapshot);
                if snapshot.is_settled() {
                    pb.finish_with_message(styled_status(&snapshot).to_string());
                    return;
                }
                tokio::select! {
                    _ = stopped.cancelled() => break,
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            let last = snapshots.borrow().clone();
            draw(&pb, &last);
            pb.finish_with_message(styled_status(&last).to_string());
        });

        Self { handle, stop }
    }

    /// Draw the latest state and stop
    pub async fn finish(self) {
        self.stop.cancel();
        let _ = self.handle.await;
    }
}

fn draw(pb: &ProgressBar, snapshot: &SessionSnapshot) {
    let position = match snapshot.phase {
        Phase::Completed => 100,
        _ => u64::from(snapshot.progress_percent),
    };
    pb.set_position(position);
    pb.set_message(styled_status(snapshot).to_string());
}

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format a whole-second duration as `h:mm:ss` or `m:ss`
pub fn format_duration(seconds: u32) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{FailureStage, IngestionSession, StageFailure};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(524_288_000), "500.00 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(125), "2:05");
        assert_eq!(format_duration(3725), "1:02:05");
    }

    #[test]
    fn test_create_upload_progress() {
        let pb = create_upload_progress();
        assert_eq!(pb.length(), Some(100));
    }

    #[test]
    fn test_styled_status_keeps_text() {
        colored::control::set_override(false);
        let snapshot = SessionSnapshot {
            phase: Phase::Failed(FailureStage::Transport),
            progress_percent: 40,
            last_error: Some(StageFailure::cancelled(FailureStage::Transport)),
        };
        assert_eq!(styled_status(&snapshot).to_string(), "Upload cancelled.");
    }

    #[tokio::test]
    async fn test_renderer_stops_on_finish() {
        let session = IngestionSession::new();
        let pb = ProgressBar::hidden();
        let renderer = SessionRenderer::spawn(session.subscribe(), pb.clone());
        renderer.finish().await;
        assert!(pb.is_finished());
    }
}
