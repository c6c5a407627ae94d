//! # Asset Task
//!
//! Runs one asset's planned jobs through the shared [`TaskQueue`].
//!
//! Jobs are submitted in plan order and each one is awaited before the next
//! is submitted, so one asset holds at most one queue slot; concurrency comes
//! from running many assets at once. A job whose `depends_on` prerequisite did
//! not succeed is skipped instead of submitted. A failure never leaves the
//! asset: it is recorded in the [`AssetOutcome`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::engine::MediaEngine;
use crate::error::{Result, TranscodeError};
use crate::planner::{ArtifactPlanner, DerivedArtifactJob};
use crate::queue::TaskQueue;
use crate::walker::MediaAsset;

use super::job_runner::run_job_with_timeout;

/// Terminal state of one job
#[derive(Debug)]
pub enum JobStatus {
    Succeeded(PathBuf),
    Failed(TranscodeError),
    /// Not submitted because a prerequisite did not succeed
    Skipped,
}

#[derive(Debug)]
pub struct JobReport {
    pub job: DerivedArtifactJob,
    pub status: JobStatus,
}

/// Everything that happened to one asset
#[derive(Debug)]
pub struct AssetOutcome {
    pub asset: MediaAsset,
    pub reports: Vec<JobReport>,
    /// Set when the output directories could not be prepared
    pub setup_error: Option<TranscodeError>,
}

impl AssetOutcome {
    pub fn succeeded(&self) -> usize {
        self.count(|status| matches!(status, JobStatus::Succeeded(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, JobStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|status| matches!(status, JobStatus::Skipped))
    }

    pub fn is_success(&self) -> bool {
        self.setup_error.is_none() && self.reports.len() == self.succeeded()
    }

    fn count(&self, predicate: impl Fn(&JobStatus) -> bool) -> usize {
        self.reports
            .iter()
            .filter(|report| predicate(&report.status))
            .count()
    }
}

impl fmt::Display for AssetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}: {} succeeded, {} failed, {} skipped",
            self.asset.category,
            self.asset.file_name(),
            self.succeeded(),
            self.failed(),
            self.skipped()
        )
    }
}

/// Shared handles every asset task needs
pub struct AssetContext<E: ?Sized> {
    pub engine: Arc<E>,
    pub queue: TaskQueue,
    pub planner: Arc<ArtifactPlanner>,
    pub timeout: Option<Duration>,
}

impl<E: ?Sized> Clone for AssetContext<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            queue: self.queue.clone(),
            planner: Arc::clone(&self.planner),
            timeout: self.timeout,
        }
    }
}

impl<E> AssetContext<E>
where
    E: MediaEngine + ?Sized + 'static,
{
    /// Plan and run every job of `asset`, one at a time in plan order
    pub async fn run_asset(self, asset: MediaAsset) -> AssetOutcome {
        let jobs = self.planner.plan(&asset);

        if let Err(e) = self.planner.prepare_dirs(&asset).await {
            error!(
                "Cannot prepare output directories for {}: {}",
                asset.path.display(),
                e
            );
            return AssetOutcome {
                asset,
                reports: jobs
                    .into_iter()
                    .map(|job| JobReport {
                        job,
                        status: JobStatus::Skipped,
                    })
                    .collect(),
                setup_error: Some(e),
            };
        }

        let mut reports: Vec<JobReport> = Vec::with_capacity(jobs.len());
        for job in jobs {
            let status = if prerequisite_met(&job, &reports) {
                match self.submit(job.clone()).await {
                    Ok(path) => JobStatus::Succeeded(path),
                    Err(e) => {
                        error!("{} failed: {}", job, e);
                        JobStatus::Failed(e)
                    }
                }
            } else {
                warn!("Skipping {}: prerequisite job did not succeed", job);
                JobStatus::Skipped
            };
            reports.push(JobReport { job, status });
        }

        AssetOutcome {
            asset,
            reports,
            setup_error: None,
        }
    }

    async fn submit(&self, job: DerivedArtifactJob) -> Result<PathBuf> {
        let engine = Arc::clone(&self.engine);
        let timeout = self.timeout;

        self.queue
            .enqueue(move || async move {
                run_job_with_timeout(engine.as_ref(), &job, timeout).await
            })
            .await?
    }
}

/// Ready unless its `depends_on` prerequisite did not succeed
fn prerequisite_met(job: &DerivedArtifactJob, settled: &[JobReport]) -> bool {
    match job.depends_on {
        None => true,
        Some(index) => matches!(
            settled.get(index).map(|report| &report.status),
            Some(JobStatus::Succeeded(_))
        ),
    }
}
