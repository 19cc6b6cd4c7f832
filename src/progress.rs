//! # Progress Tracking and Statistics Module
//!
//! Visual feedback while the walker runs and the counters behind the final
//! report.
//!
//! ## Components:
//! - `ProgressManager`: spinner naming the file being processed. The tree is
//!   walked lazily, so there is no total to draw a bar against.
//! - `RunStats`: cumulative counters for one run
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] 148 entries | 🎬 2023/summer/clip.mov
//! ```
//!
//! The spinner draws to stderr and hides itself when stderr is not a terminal.

use crate::file_manager::{FileManager, MediaKind};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for a mirroring run
#[derive(Debug, Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a spinner for indeterminate progress
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} entries | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A progress manager that never draws, for tests and library callers
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Show the entry that is about to be processed
    pub fn start(&self, kind: MediaKind, name: &str) {
        let icon = match kind {
            MediaKind::Image => "🖼️",
            MediaKind::Video => "🎬",
            MediaKind::Other => "📄",
        };
        self.bar.set_message(format!("{} {}", icon, name));
    }

    /// Count one finished entry
    pub fn advance(&self) {
        self.bar.inc(1);
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Run `f` with the spinner cleared, so log lines are not torn
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Process exit code of a run where some entries failed; clap already uses 2
/// for usage errors.
pub const PARTIAL_FAILURE_EXIT: u8 = 3;

/// Statistics for one mirroring run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    pub directories: usize,
    pub images: usize,
    pub videos: usize,
    /// Files copied verbatim (non-media and empty media files)
    pub copied: usize,
    /// Media whose transcoded output was not worth keeping
    pub kept_original: usize,
    pub failed: usize,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_directory(&mut self) {
        self.directories += 1;
    }

    pub fn add_transcoded(&mut self, kind: MediaKind, original_size: u64, new_size: u64) {
        match kind {
            MediaKind::Image => self.images += 1,
            MediaKind::Video => self.videos += 1,
            MediaKind::Other => self.copied += 1,
        }
        self.bytes_in += original_size;
        self.bytes_out += new_size;
    }

    pub fn add_copied(&mut self, size: u64) {
        self.copied += 1;
        self.bytes_in += size;
        self.bytes_out += size;
    }

    pub fn add_kept_original(&mut self, size: u64) {
        self.kept_original += 1;
        self.bytes_in += size;
        self.bytes_out += size;
    }

    pub fn add_failure(&mut self) {
        self.failed += 1;
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Exit code for a completed walk: 0, or `PARTIAL_FAILURE_EXIT`.
    pub fn exit_code(&self) -> u8 {
        if self.has_failures() {
            PARTIAL_FAILURE_EXIT
        } else {
            0
        }
    }

    pub fn files_written(&self) -> usize {
        self.images + self.videos + self.copied + self.kept_original
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Files: {} | Images: {} | Videos: {} | Copied: {} | Kept original: {} | Failed: {} | {} -> {} ({:.2}% saved)",
            self.files_written(),
            self.images,
            self.videos,
            self.copied,
            self.kept_original,
            self.failed,
            FileManager::format_size(self.bytes_in),
            FileManager::format_size(self.bytes_out),
            FileManager::calculate_reduction(self.bytes_in, self.bytes_out)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate() {
        let mut stats = RunStats::new();
        stats.add_directory();
        stats.add_transcoded(MediaKind::Image, 4_000, 1_000);
        stats.add_transcoded(MediaKind::Video, 6_000, 1_000);
        stats.add_copied(10_000);
        stats.add_kept_original(500);

        assert_eq!(stats.files_written(), 4);
        assert_eq!(stats.bytes_in, 20_500);
        assert_eq!(stats.bytes_out, 12_500);
        assert!(!stats.has_failures());
        assert_eq!(stats.exit_code(), 0);

        stats.add_failure();
        assert!(stats.has_failures());
        assert_eq!(stats.exit_code(), 3);

        let summary = stats.format_summary();
        assert!(summary.contains("Images: 1"));
        assert!(summary.contains("Failed: 1"));
    }

    #[test]
    fn test_hidden_progress_is_silent() {
        let progress = ProgressManager::hidden();
        progress.start(MediaKind::Video, "clip.mov");
        progress.advance();
        progress.finish("done");
        assert_eq!(progress.suspend(|| 7), 7);
    }
}
