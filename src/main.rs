//! # Tier Transcode - Main Entry Point
//!
//! ## Responsibilities:
//! - Parse the command line with `clap`
//! - Initialise `tracing` (INFO, or DEBUG with `--verbose`; `RUST_LOG` wins)
//! - Load the configuration file and let CLI flags override it
//! - Run the pipeline and report the summary
//!
//! Exits non-zero when any asset or job failed, or a subtree was unreadable.
//!
//! ## Example:
//! ```bash
//! tier-transcode --input originals --output output --concurrency 4 --watermark logo.png
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tier_transcode::filters::AspectRatio;
use tier_transcode::{Config, FfmpegEngine, Pipeline, ThumbnailSource};

#[derive(Parser, Debug)]
#[command(name = "tier-transcode")]
#[command(about = "Transcode a tree of videos into tiered resizes and thumbnails")]
struct Args {
    /// Directory tree containing the source videos
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output root for videos/ and images/
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum number of concurrent engine jobs
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Watermark image composited onto every artifact
    #[arg(short, long)]
    watermark: Option<PathBuf>,

    /// Category to pass through untouched (repeatable, replaces the default set)
    #[arg(long = "skip-category")]
    skip_categories: Vec<String>,

    /// Grab thumbnails from the resized video or the original
    #[arg(long)]
    thumbnail_source: Option<ThumbnailSource>,

    /// Per-job timeout in seconds (0 disables it)
    #[arg(long)]
    timeout: Option<u64>,

    /// Accepted input extensions, comma separated
    #[arg(long, value_delimiter = ',')]
    extensions: Option<Vec<String>>,

    /// Centre crop before resizing, as W:H
    #[arg(long)]
    crop: Option<AspectRatio>,

    /// Path to the ffmpeg executable
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe executable
    #[arg(long)]
    ffprobe: Option<PathBuf>,

    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Don't draw the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Overlay the flags that were given onto `config`
    fn apply(self, config: &mut Config) {
        if let Some(input) = self.input {
            config.input_root = input;
        }
        if let Some(output) = self.output {
            config.output_root = output;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if self.watermark.is_some() {
            config.watermark_image_path = self.watermark;
        }
        if !self.skip_categories.is_empty() {
            config.skip_categories = self.skip_categories.into_iter().collect();
        }
        if let Some(source) = self.thumbnail_source {
            config.thumbnail_source = source;
        }
        if let Some(timeout) = self.timeout {
            config.job_timeout_secs = timeout;
        }
        if let Some(extensions) = self.extensions {
            config.video_extensions = extensions;
        }
        if self.crop.is_some() {
            config.crop_aspect = self.crop;
        }
        if self.ffmpeg.is_some() {
            config.ffmpeg_path = self.ffmpeg;
        }
        if self.ffprobe.is_some() {
            config.ffprobe_path = self.ffprobe;
        }
        if self.no_progress {
            config.show_progress = false;
        }
        if self.json {
            config.json_output = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))?;

    let config_path = args.config.clone().or_else(Config::default_path);
    let mut config = match &config_path {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let json_output = config.json_output;
    let engine = FfmpegEngine::from_config(&config)?;
    let summary = Pipeline::new(config, engine)
        .run()
        .await
        .context("Transcoding run aborted")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if summary.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "tier-transcode",
            "--input",
            "raw",
            "-j",
            "4",
            "--skip-category",
            "drafts",
            "--skip-category",
            "archive",
            "--thumbnail-source",
            "original",
            "--extensions",
            "mp4,mov",
            "--crop",
            "9:16",
            "--no-progress",
        ]);

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.input_root, PathBuf::from("raw"));
        assert_eq!(config.output_root, PathBuf::from("output"));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.skip_categories.len(), 2);
        assert!(!config.skip_categories.contains("originals"));
        assert_eq!(config.thumbnail_source, ThumbnailSource::Original);
        assert_eq!(config.video_extensions, vec!["mp4", "mov"]);
        assert_eq!(config.crop_aspect.map(|c| c.to_string()), Some("9:16".to_string()));
        assert!(!config.show_progress);
    }

    #[test]
    fn test_absent_flags_keep_file_values() {
        let args = Args::parse_from(["tier-transcode"]);
        let mut config = Config {
            concurrency: 3,
            job_timeout_secs: 30,
            ..Default::default()
        };
        args.apply(&mut config);

        assert_eq!(config.concurrency, 3);
        assert_eq!(config.job_timeout_secs, 30);
        assert!(config.skip_categories.contains("originals"));
    }
}
