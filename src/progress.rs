//! # Progress Tracking and Statistics Module
//!
//! ## Components:
//! - `ProgressManager`: `indicatif` bar ticking once per settled asset. The
//!   walk is lazy, so the bar's length grows as assets are dispatched.
//! - `RunSummary`: counters aggregated by the driver, printed as one log line
//!   or as JSON.
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] [========================>---------------] 12/20 (60%) legs/squat_1.mp4
//! ```

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;

/// Manages progress reporting for a run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a progress bar; a disabled one draws nothing
    pub fn new(enabled: bool) -> Self {
        let bar = ProgressBar::new(0);
        if !enabled {
            bar.set_draw_target(ProgressDrawTarget::hidden());
            return Self { bar };
        }

        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        ) {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Account for one more asset to wait for
    pub fn add_asset(&self) {
        self.bar.inc_length(1);
    }

    /// Record a settled asset
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

/// Totals for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub assets_discovered: usize,
    pub assets_succeeded: usize,
    pub assets_failed: usize,
    /// Assets in a skipped category
    pub assets_skipped: usize,
    pub jobs_succeeded: usize,
    pub jobs_failed: usize,
    /// Jobs never submitted because a prerequisite failed
    pub jobs_skipped: usize,
    /// Entries below the root that could not be listed or stat'd
    pub traversal_errors: usize,
    pub duration_seconds: f64,
}

impl RunSummary {
    /// Anything that should make the process exit non-zero
    pub fn has_failures(&self) -> bool {
        self.assets_failed > 0 || self.jobs_failed > 0 || self.traversal_errors > 0
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Assets: {} found | {} succeeded | {} failed | {} skipped ; \
             Jobs: {} succeeded | {} failed | {} skipped ; \
             Traversal errors: {} ; {:.1}s",
            self.assets_discovered,
            self.assets_succeeded,
            self.assets_failed,
            self.assets_skipped,
            self.jobs_succeeded,
            self.jobs_failed,
            self.jobs_skipped,
            self.traversal_errors,
            self.duration_seconds
        )
    }
}
