//! # Tier Transcode Library
//!
//! Batch transcoder: walks a tree of source videos and, for each one, writes
//! resized videos and thumbnails in three size tiers into a mirrored output
//! tree, with a global cap on concurrent engine invocations.
//!
//! ## Module architecture:
//! - `queue`: bounded FIFO task queue (generic concurrency limiter)
//! - `walker`: input tree enumeration and asset classification
//! - `planner`: size tiers and the per-asset job plan
//! - `filters`: filter-graph expressions (scale, pad, crop, overlay)
//! - `engine`: media engine contract and the ffmpeg implementation
//! - `tools`: locating the engine executables
//! - `file_manager`: directory creation and staged outputs
//! - `pipeline`: job runner, per-asset task, driver
//! - `progress`: progress bar and run summary
//! - `config` / `error` / `utils`
//!
//! ## Usage:
//! ```text
//! let config = Config { input_root: "originals".into(), ..Default::default() };
//! let engine = FfmpegEngine::from_config(&config)?;
//! let summary = Pipeline::new(config, engine).run().await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod file_manager;
pub mod filters;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod queue;
pub mod tools;
pub mod utils;
pub mod walker;

pub use config::Config;
pub use engine::{FfmpegEngine, MediaEngine};
pub use error::TranscodeError;
pub use pipeline::Pipeline;
pub use planner::{ArtifactPlanner, DerivedArtifactJob, SizeTier, ThumbnailSource};
pub use progress::RunSummary;
pub use queue::TaskQueue;
pub use walker::{DirectoryWalker, MediaAsset};
