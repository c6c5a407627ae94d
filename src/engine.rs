//! # Media Engine
//!
//! The external media engine is a black box with three operations: probe a
//! file's duration, run a filter graph from one or two inputs into one output,
//! and extract still frames at given timestamps. [`MediaEngine`] is that
//! contract; [`FfmpegEngine`] fulfils it by spawning `ffmpeg` / `ffprobe`.
//!
//! ## Process handling:
//! - every invocation is an async `tokio::process::Command`
//! - children are killed when their future is dropped, so a job that hits its
//!   deadline does not leave an orphaned encoder behind
//! - a non-zero exit becomes `EngineInvocation` carrying the tail of stderr
//!
//! Engine errors are opaque to the pipeline and never retried.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::args;
use crate::config::Config;
use crate::error::{Result, TranscodeError};
use crate::filters::{AspectRatio, FilterGraph};
use crate::tools::ToolPaths;

/// Lines of stderr kept in error messages
const STDERR_TAIL_LINES: usize = 8;

/// Run a filter graph over `inputs` and write `output`
#[derive(Debug, Clone, PartialEq)]
pub struct FilterJob {
    pub inputs: Vec<PathBuf>,
    pub filter: FilterGraph,
    pub output: PathBuf,
}

/// Grab still frames from `input` at each timestamp, fitted into `width`x`height`
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRequest {
    pub input: PathBuf,
    pub timestamps: Vec<f64>,
    pub width: u32,
    pub height: u32,
    /// Centre crop applied before fitting
    pub crop: Option<AspectRatio>,
    pub folder: PathBuf,
    pub filename: String,
}

impl FrameRequest {
    /// One output per timestamp: the first uses `filename`, later ones get `_<n>`
    pub fn output_paths(&self) -> Vec<PathBuf> {
        let name = Path::new(&self.filename);
        let stem = name.file_stem().unwrap_or_default().to_string_lossy();
        let extension = name
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        (0..self.timestamps.len())
            .map(|index| match index {
                0 => self.folder.join(&self.filename),
                n => self.folder.join(format!("{}_{}{}", stem, n + 1, extension)),
            })
            .collect()
    }
}

/// Contract of the external media engine
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Verify the engine is usable before any job is dispatched
    async fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Duration of `input` in seconds, `None` when the container doesn't report one
    async fn probe_duration(&self, input: &Path) -> Result<Option<f64>>;

    /// Apply a filter graph
    async fn apply_filter(&self, job: &FilterJob) -> Result<()>;

    /// Extract frames, returning the written paths
    async fn extract_frames(&self, request: &FrameRequest) -> Result<Vec<PathBuf>>;
}

/// Engine backed by the `ffmpeg` and `ffprobe` executables
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    tools: ToolPaths,
}

impl FfmpegEngine {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(ToolPaths::resolve(config)?))
    }

    async fn run(&self, tool: &Path, args: Vec<OsString>) -> Result<Vec<u8>> {
        let tool_name = tool
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        debug!("Spawned command: {} {:?}", tool.display(), args);

        let output = Command::new(tool)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                TranscodeError::engine(&tool_name, format!("failed to execute: {e}"))
            })?;

        if !output.status.success() {
            return Err(TranscodeError::engine(
                &tool_name,
                format!(
                    "{}: {}",
                    output.status,
                    stderr_tail(&output.stderr, STDERR_TAIL_LINES)
                ),
            ));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn check(&self) -> Result<()> {
        for tool in [&self.tools.ffmpeg, &self.tools.ffprobe] {
            self.run(tool, args!["-version"]).await.map_err(|e| {
                TranscodeError::MissingDependency(format!("{} is not usable: {e}", tool.display()))
            })?;
        }
        Ok(())
    }

    async fn probe_duration(&self, input: &Path) -> Result<Option<f64>> {
        let stdout = self
            .run(
                &self.tools.ffprobe,
                args!["-v", "error", "-print_format", "json", "-show_format", input],
            )
            .await
            .map_err(|e| TranscodeError::probe(input, e.to_string()))?;

        parse_probe_duration(&stdout).map_err(|message| TranscodeError::probe(input, message))
    }

    async fn apply_filter(&self, job: &FilterJob) -> Result<()> {
        if job.inputs.len() != job.filter.input_count() {
            return Err(TranscodeError::engine(
                "ffmpeg",
                format!(
                    "filter graph expects {} inputs, got {}",
                    job.filter.input_count(),
                    job.inputs.len()
                ),
            ));
        }

        self.run(&self.tools.ffmpeg, filter_args(job, engine_log_level()))
            .await?;
        Ok(())
    }

    async fn extract_frames(&self, request: &FrameRequest) -> Result<Vec<PathBuf>> {
        let outputs = request.output_paths();
        for (timestamp, output) in request.timestamps.iter().zip(&outputs) {
            self.run(
                &self.tools.ffmpeg,
                frame_args(request, *timestamp, output, engine_log_level()),
            )
            .await?;
        }
        Ok(outputs)
    }
}

fn engine_log_level() -> &'static str {
    // Let ffmpeg chatter only when we are debugging ourselves
    if tracing::enabled!(tracing::Level::DEBUG) {
        "info"
    } else {
        "error"
    }
}

fn filter_args(job: &FilterJob, log_level: &str) -> Vec<OsString> {
    let mut args = args!["-hide_banner", "-nostdin", "-loglevel", log_level, "-y"];
    for input in &job.inputs {
        args.extend(args!["-i", input]);
    }

    let flag = if job.filter.is_complex() {
        "-filter_complex"
    } else {
        "-vf"
    };
    args.extend(args![flag, job.filter.expression()]);

    if is_still_image(&job.output) {
        args.extend(args!["-frames:v", 1u32, "-q:v", 2u32]);
    }
    args.push(job.output.as_os_str().to_os_string());
    args
}

fn frame_args(
    request: &FrameRequest,
    timestamp: f64,
    output: &Path,
    log_level: &str,
) -> Vec<OsString> {
    let fit = FilterGraph::Fit {
        width: request.width,
        height: request.height,
        crop: request.crop,
    };
    args![
        "-hide_banner",
        "-nostdin",
        "-loglevel",
        log_level,
        "-y",
        "-ss",
        timestamp,
        "-i",
        &request.input,
        "-frames:v",
        1u32,
        "-vf",
        fit.expression(),
        "-q:v",
        2u32,
        output,
    ]
}

fn is_still_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "webp"))
        .unwrap_or(false)
}

/// Read `format.duration` from ffprobe's JSON output
pub fn parse_probe_duration(stdout: &[u8]) -> std::result::Result<Option<f64>, String> {
    let info: serde_json::Value =
        serde_json::from_slice(stdout).map_err(|e| format!("unreadable probe output: {e}"))?;

    let duration = &info["format"]["duration"];
    let seconds = duration
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| duration.as_f64())
        .filter(|d| d.is_finite() && *d >= 0.0);
    Ok(seconds)
}

fn stderr_tail(stderr: &[u8], lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let collected: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = collected.len().saturating_sub(lines);
    let tail = collected[start..].join(" | ");
    if tail.is_empty() {
        "no diagnostic output".to_string()
    } else {
        tail
    }
}
