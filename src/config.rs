//! # Configuration Management Module
//!
//! Holds every option of a transcoding run.
//!
//! ## Responsibilities:
//! - Defines the `Config` struct with sensible defaults
//! - Validates parameters before a run starts
//! - Loads/saves configuration as JSON (missing fields fall back to defaults)
//!
//! ## Parameters:
//! - `input_root`: tree of source videos (default: `originals`)
//! - `output_root`: destination of `videos/` and `images/` (default: `output`)
//! - `concurrency`: engine invocations allowed in flight (default: 2)
//! - `watermark_image_path`: image composited onto every artifact (default: none)
//! - `skip_categories`: categories passed through untouched (default: `originals`)
//! - `thumbnail_source`: grab stills from the resized video or the original (default: resized)
//! - `job_timeout_secs`: deadline per engine job, 0 disables it (default: 600)
//! - `video_extensions`: accepted input extensions, empty accepts all
//! - `crop_aspect`: optional centre crop (`W:H`) applied before resizing
//! - `ffmpeg_path` / `ffprobe_path`: explicit engine executables
//! - `show_progress` / `json_output`: reporting options

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::TranscodeError;
use crate::filters::AspectRatio;
use crate::planner::ThumbnailSource;

/// Category whose files are treated as already-final originals
pub const ORIGINALS_CATEGORY: &str = "originals";

/// Configuration for a transcoding run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory tree containing the source videos
    pub input_root: PathBuf,
    /// Directory receiving `videos/<tier>/<category>` and `images/<tier>/<category>`
    pub output_root: PathBuf,
    /// Maximum number of engine jobs running at the same time
    pub concurrency: usize,
    /// Watermark composited onto every video and thumbnail
    pub watermark_image_path: Option<PathBuf>,
    /// Categories whose files are not transcoded
    pub skip_categories: BTreeSet<String>,
    /// Input used for thumbnail extraction
    pub thumbnail_source: ThumbnailSource,
    /// Per-job deadline in seconds (0 = no deadline)
    pub job_timeout_secs: u64,
    /// Accepted input extensions (empty = every regular file)
    pub video_extensions: Vec<String>,
    /// Centre crop applied before resizing
    pub crop_aspect: Option<AspectRatio>,
    /// Explicit ffmpeg executable
    pub ffmpeg_path: Option<PathBuf>,
    /// Explicit ffprobe executable
    pub ffprobe_path: Option<PathBuf>,
    /// Draw a progress bar while assets settle
    pub show_progress: bool,
    /// Print the run summary as JSON
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("originals"),
            output_root: PathBuf::from("output"),
            concurrency: 2,
            watermark_image_path: None,
            skip_categories: BTreeSet::from([ORIGINALS_CATEGORY.to_string()]),
            thumbnail_source: ThumbnailSource::default(),
            job_timeout_secs: 600,
            video_extensions: ["mp4", "mov", "m4v", "webm", "ogg", "mkv", "avi"]
                .into_iter()
                .map(String::from)
                .collect(),
            crop_aspect: None,
            ffmpeg_path: None,
            ffprobe_path: None,
            show_progress: true,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> std::result::Result<(), TranscodeError> {
        if self.concurrency == 0 {
            return Err(TranscodeError::Validation(
                "concurrency must be greater than 0".to_string(),
            ));
        }

        if self.input_root == self.output_root {
            return Err(TranscodeError::Validation(format!(
                "output root must differ from input root: {}",
                self.output_root.display()
            )));
        }

        if let Some(ref watermark) = self.watermark_image_path {
            if !watermark.is_file() {
                return Err(TranscodeError::Validation(format!(
                    "watermark image does not exist: {}",
                    watermark.display()
                )));
            }
        }

        Ok(())
    }

    /// Deadline applied to each engine job
    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }

    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tier-transcode").join("config.json"))
    }

    /// Load configuration from file, falling back to defaults when it does not exist
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
