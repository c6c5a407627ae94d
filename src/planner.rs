//! # Artifact Job Planner
//!
//! Expands one [`MediaAsset`] into the ordered list of derived-artifact jobs:
//! for every size tier a `resize-video` job and an `extract-thumbnail` job.
//!
//! ## Output layout:
//! ```text
//! <output_root>/videos/<tier>/<category>/<base_name>.mp4
//! <output_root>/images/<tier>/<category>/<base_name>.jpg
//! ```
//!
//! When thumbnails come from the resized video, each thumbnail job records the
//! index of its resize job in `depends_on`; the runner never starts it unless
//! that resize succeeded. Assets whose category is in `skip_categories` get no
//! jobs at all.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Result, TranscodeError};
use crate::file_manager::ensure_dir;
use crate::filters::AspectRatio;
use crate::walker::MediaAsset;

const VIDEOS_DIR: &str = "videos";
const IMAGES_DIR: &str = "images";
const VIDEO_EXTENSION: &str = "mp4";
const IMAGE_EXTENSION: &str = "jpg";

/// Fixed output resolutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeTier {
    Large,
    Medium,
    Small,
}

impl SizeTier {
    pub const ALL: [SizeTier; 3] = [SizeTier::Large, SizeTier::Medium, SizeTier::Small];

    /// Target box as (width, height)
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            SizeTier::Large => (960, 540),
            SizeTier::Medium => (392, 220),
            SizeTier::Small => (178, 100),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SizeTier::Large => "large",
            SizeTier::Medium => "medium",
            SizeTier::Small => "small",
        }
    }
}

impl fmt::Display for SizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    ResizeVideo,
    ExtractThumbnail,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobKind::ResizeVideo => "resize-video",
            JobKind::ExtractThumbnail => "extract-thumbnail",
        })
    }
}

/// Which video thumbnails are grabbed from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailSource {
    /// The tier's resized output (thumbnail waits for the resize)
    #[default]
    Resized,
    /// The source file (thumbnail is independent of the resize)
    Original,
}

impl FromStr for ThumbnailSource {
    type Err = TranscodeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "resized" => Ok(ThumbnailSource::Resized),
            "original" => Ok(ThumbnailSource::Original),
            other => Err(TranscodeError::Validation(format!(
                "unknown thumbnail source '{other}', expected 'resized' or 'original'"
            ))),
        }
    }
}

impl fmt::Display for ThumbnailSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThumbnailSource::Resized => "resized",
            ThumbnailSource::Original => "original",
        })
    }
}

/// One unit of transcoding work
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedArtifactJob {
    pub kind: JobKind,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub tier: SizeTier,
    /// Image composited over the artifact, if any
    pub watermark: Option<PathBuf>,
    /// Centre crop applied before resizing or frame fitting
    pub crop: Option<AspectRatio>,
    /// Index (in the same plan) of the job whose output this one reads
    pub depends_on: Option<usize>,
}

impl fmt::Display for DerivedArtifactJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.kind, self.tier, self.destination.display())
    }
}

/// Turns assets into job lists, parameterised by configuration
#[derive(Debug, Clone)]
pub struct ArtifactPlanner {
    output_root: PathBuf,
    watermark: Option<PathBuf>,
    skip_categories: BTreeSet<String>,
    thumbnail_source: ThumbnailSource,
    crop: Option<AspectRatio>,
}

impl ArtifactPlanner {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_root: config.output_root.clone(),
            watermark: config.watermark_image_path.clone(),
            skip_categories: config.skip_categories.clone(),
            thumbnail_source: config.thumbnail_source,
            crop: config.crop_aspect,
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn should_skip(&self, asset: &MediaAsset) -> bool {
        self.skip_categories.contains(&asset.category)
    }

    pub fn video_path(&self, tier: SizeTier, asset: &MediaAsset) -> PathBuf {
        self.tier_dir(VIDEOS_DIR, tier, asset)
            .join(format!("{}.{}", asset.base_name, VIDEO_EXTENSION))
    }

    pub fn image_path(&self, tier: SizeTier, asset: &MediaAsset) -> PathBuf {
        self.tier_dir(IMAGES_DIR, tier, asset)
            .join(format!("{}.{}", asset.base_name, IMAGE_EXTENSION))
    }

    fn tier_dir(&self, kind: &str, tier: SizeTier, asset: &MediaAsset) -> PathBuf {
        self.output_root
            .join(kind)
            .join(tier.name())
            .join(&asset.category)
    }

    /// Every directory the asset's jobs write into
    pub fn output_dirs(&self, asset: &MediaAsset) -> Vec<PathBuf> {
        SizeTier::ALL
            .into_iter()
            .flat_map(|tier| {
                [
                    self.tier_dir(VIDEOS_DIR, tier, asset),
                    self.tier_dir(IMAGES_DIR, tier, asset),
                ]
            })
            .collect()
    }

    /// Create the asset's output directories; safe to race with other assets
    pub async fn prepare_dirs(&self, asset: &MediaAsset) -> Result<()> {
        for dir in self.output_dirs(asset) {
            ensure_dir(&dir).await?;
        }
        Ok(())
    }

    /// Ordered jobs for `asset`: per tier, the resize then its thumbnail
    pub fn plan(&self, asset: &MediaAsset) -> Vec<DerivedArtifactJob> {
        if self.should_skip(asset) {
            return Vec::new();
        }

        let mut jobs = Vec::with_capacity(SizeTier::ALL.len() * 2);
        for tier in SizeTier::ALL {
            let resize_index = jobs.len();
            let video = self.video_path(tier, asset);

            jobs.push(DerivedArtifactJob {
                kind: JobKind::ResizeVideo,
                source: asset.path.clone(),
                destination: video.clone(),
                tier,
                watermark: self.watermark.clone(),
                crop: self.crop,
                depends_on: None,
            });

            // frames from the resized video are already cropped
            let (source, crop, depends_on) = match self.thumbnail_source {
                ThumbnailSource::Resized => (video, None, Some(resize_index)),
                ThumbnailSource::Original => (asset.path.clone(), self.crop, None),
            };
            jobs.push(DerivedArtifactJob {
                kind: JobKind::ExtractThumbnail,
                source,
                destination: self.image_path(tier, asset),
                tier,
                watermark: self.watermark.clone(),
                crop,
                depends_on,
            });
        }
        jobs
    }
}
