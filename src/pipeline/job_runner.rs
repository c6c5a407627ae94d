//! # Job Runner
//!
//! Executes a single [`DerivedArtifactJob`] against a [`MediaEngine`].
//!
//! Every artifact is produced through a [`StagedOutput`]: the engine writes a
//! temporary file next to the destination, which is renamed into place only
//! once the job has fully succeeded. A watermarked thumbnail goes through two
//! stages (raw frame, then composited frame) and the raw frame is removed.
//!
//! A job that exceeds its deadline is dropped, which kills the engine process
//! and removes its staged files, and reports `Timeout`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::engine::{FilterJob, FrameRequest, MediaEngine};
use crate::error::{Result, TranscodeError};
use crate::file_manager::{file_size, format_size, StagedOutput};
use crate::filters::FilterGraph;
use crate::planner::{DerivedArtifactJob, JobKind};

/// Thumbnail timestamp: half the duration, or 0 when it is unknown or zero
pub fn midpoint(duration: Option<f64>) -> f64 {
    match duration {
        Some(seconds) if seconds.is_finite() && seconds > 0.0 => seconds / 2.0,
        _ => 0.0,
    }
}

/// Run `job`, abandoning it once `timeout` elapses
pub async fn run_job_with_timeout<E>(
    engine: &E,
    job: &DerivedArtifactJob,
    timeout: Option<Duration>,
) -> Result<PathBuf>
where
    E: MediaEngine + ?Sized,
{
    match timeout {
        Some(after) => tokio::time::timeout(after, run_job(engine, job))
            .await
            .map_err(|_| TranscodeError::Timeout {
                target: job.destination.clone(),
                after,
            })?,
        None => run_job(engine, job).await,
    }
}

/// Run `job` to completion, returning the written destination
pub async fn run_job<E>(engine: &E, job: &DerivedArtifactJob) -> Result<PathBuf>
where
    E: MediaEngine + ?Sized,
{
    debug!("Starting {}", job);

    let written = match job.kind {
        JobKind::ResizeVideo => resize_video(engine, job).await?,
        JobKind::ExtractThumbnail => extract_thumbnail(engine, job).await?,
    };

    let size = file_size(&written).await.unwrap_or(0);
    info!("Created {} ({})", written.display(), format_size(size));
    Ok(written)
}

async fn resize_video<E>(engine: &E, job: &DerivedArtifactJob) -> Result<PathBuf>
where
    E: MediaEngine + ?Sized,
{
    let (width, height) = job.tier.dimensions();
    let staged = StagedOutput::new(&job.destination)?;

    let (inputs, filter) = match &job.watermark {
        Some(watermark) => (
            vec![job.source.clone(), watermark.clone()],
            FilterGraph::FitWithWatermark {
                width,
                height,
                crop: job.crop,
            },
        ),
        None => (
            vec![job.source.clone()],
            FilterGraph::Fit {
                width,
                height,
                crop: job.crop,
            },
        ),
    };

    engine
        .apply_filter(&FilterJob {
            inputs,
            filter,
            output: staged.path().to_path_buf(),
        })
        .await?;

    staged.commit()
}

async fn extract_thumbnail<E>(engine: &E, job: &DerivedArtifactJob) -> Result<PathBuf>
where
    E: MediaEngine + ?Sized,
{
    let duration = engine.probe_duration(&job.source).await?;
    let timestamp = midpoint(duration);
    let (width, height) = job.tier.dimensions();
    debug!(
        "Grabbing frame at {:.3}s of {} (duration {:?})",
        timestamp,
        job.source.display(),
        duration
    );

    let frame = StagedOutput::new(&job.destination)?;
    let request = FrameRequest {
        input: job.source.clone(),
        timestamps: vec![timestamp],
        width,
        height,
        crop: job.crop,
        folder: frame.path().parent().unwrap_or(Path::new(".")).to_path_buf(),
        filename: frame
            .path()
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned(),
    };
    engine.extract_frames(&request).await?;

    let Some(watermark) = &job.watermark else {
        return frame.commit();
    };

    let composited = StagedOutput::new(&job.destination)?;
    engine
        .apply_filter(&FilterJob {
            inputs: vec![frame.path().to_path_buf(), watermark.clone()],
            filter: FilterGraph::Overlay { width, height },
            output: composited.path().to_path_buf(),
        })
        .await?;

    // Raw frame is removed here, before the composited one lands
    drop(frame);
    composited.commit()
}
