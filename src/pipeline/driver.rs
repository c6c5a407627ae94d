//! # Pipeline Driver
//!
//! Walker → planner → queue → engine, for a whole input tree.
//!
//! ## Flow:
//! 1. validate the configuration and resolve the input root (an unreadable
//!    root is fatal)
//! 2. check the engine is usable (fatal otherwise)
//! 3. walk the tree; every asset outside the skipped categories is spawned as
//!    its own task, so assets run concurrently and only the queue bounds how
//!    many engine jobs are in flight
//! 4. wait for every asset to settle and aggregate a [`RunSummary`]
//!
//! Traversal errors below the root, failed jobs and failed assets are counted
//! and logged; they never stop the run.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engine::MediaEngine;
use crate::error::{Result, TranscodeError};
use crate::planner::ArtifactPlanner;
use crate::progress::{ProgressManager, RunSummary};
use crate::queue::TaskQueue;
use crate::walker::DirectoryWalker;

use super::asset_task::{AssetContext, AssetOutcome};

/// Runs the transcoding pipeline over one input tree
pub struct Pipeline<E: ?Sized> {
    config: Config,
    context: AssetContext<E>,
}

impl<E> Pipeline<E>
where
    E: MediaEngine + 'static,
{
    pub fn new(config: Config, engine: E) -> Self {
        Self::with_engine(config, Arc::new(engine))
    }
}

impl<E> Pipeline<E>
where
    E: MediaEngine + ?Sized + 'static,
{
    /// Build a pipeline around an engine the caller keeps a handle to
    pub fn with_engine(config: Config, engine: Arc<E>) -> Self {
        let context = AssetContext {
            engine,
            queue: TaskQueue::new(config.concurrency),
            planner: Arc::new(ArtifactPlanner::from_config(&config)),
            timeout: config.job_timeout(),
        };
        Self { config, context }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.context.queue
    }

    /// Process every asset under the input root
    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        self.config.validate()?;

        let root = tokio::fs::canonicalize(&self.config.input_root)
            .await
            .map_err(|e| TranscodeError::Traversal {
                path: self.config.input_root.clone(),
                message: e.to_string(),
            })?;
        let walker = DirectoryWalker::new(root, &self.config.video_extensions);
        walker.check_root()?;

        self.context.engine.check().await?;

        info!("Starting transcoding of {}", walker.root().display());
        info!("Output directory: {}", self.config.output_root.display());
        info!(
            "Concurrency: {} | Thumbnails from: {} | Watermark: {}",
            self.config.concurrency,
            self.config.thumbnail_source,
            self.config
                .watermark_image_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        let progress = ProgressManager::new(self.config.show_progress);
        let mut summary = RunSummary::default();
        let mut tasks = JoinSet::new();

        for discovered in walker.walk() {
            let asset = match discovered {
                Ok(asset) => asset,
                Err(e) => {
                    warn!("{}", e);
                    summary.traversal_errors += 1;
                    continue;
                }
            };
            summary.assets_discovered += 1;

            if self.context.planner.should_skip(&asset) {
                debug!(
                    "Skipping {} (category '{}')",
                    asset.path.display(),
                    asset.category
                );
                summary.assets_skipped += 1;
                continue;
            }

            info!("Processing {}/{}", asset.category, asset.file_name());
            progress.add_asset();
            tasks.spawn(self.context.clone().run_asset(asset));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    progress.update(&format!(
                        "{}/{}",
                        outcome.asset.category,
                        outcome.asset.file_name()
                    ));
                    record(&mut summary, &outcome);
                }
                Err(e) => {
                    error!("Asset task aborted: {}", e);
                    progress.update("aborted");
                    summary.assets_failed += 1;
                }
            }
        }

        summary.duration_seconds = started.elapsed().as_secs_f64();
        progress.finish(&summary.format_summary());
        info!("{}", summary.format_summary());

        Ok(summary)
    }
}

fn record(summary: &mut RunSummary, outcome: &AssetOutcome) {
    summary.jobs_succeeded += outcome.succeeded();
    summary.jobs_failed += outcome.failed();
    summary.jobs_skipped += outcome.skipped();

    if outcome.is_success() {
        summary.assets_succeeded += 1;
        info!("Finished {}", outcome);
    } else {
        summary.assets_failed += 1;
        match &outcome.setup_error {
            Some(e) => error!(
                "Failed {}/{}: {}",
                outcome.asset.category,
                outcome.asset.file_name(),
                e
            ),
            None => error!("Failed {}", outcome),
        }
    }
}
