//! # Pipeline Module
//!
//! Turns discovered assets into engine invocations.
//!
//! ## Architecture:
//! - `job_runner`: one job against the engine, staged and with a deadline
//! - `asset_task`: one asset's jobs through the queue, honouring dependencies
//! - `driver`: the whole tree, concurrently per asset, aggregated into a summary

pub mod asset_task;
pub mod driver;
pub mod job_runner;

#[cfg(test)]
pub(crate) mod fake_engine;

pub use asset_task::{AssetContext, AssetOutcome, JobReport, JobStatus};
pub use driver::Pipeline;
pub use job_runner::{midpoint, run_job, run_job_with_timeout};
