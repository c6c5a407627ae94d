//! # Engine Tool Resolution
//!
//! Finds the `ffmpeg` and `ffprobe` executables. Lookup order for each tool:
//! 1. explicit path from the configuration
//! 2. `FFMPEG_PATH` / `FFPROBE_PATH` environment variables
//! 3. the system `PATH`

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::error::{Result, TranscodeError};

/// Resolved locations of the engine executables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl ToolPaths {
    pub fn resolve(config: &Config) -> Result<Self> {
        Ok(Self {
            ffmpeg: resolve_tool("ffmpeg", config.ffmpeg_path.as_deref(), "FFMPEG_PATH")?,
            ffprobe: resolve_tool("ffprobe", config.ffprobe_path.as_deref(), "FFPROBE_PATH")?,
        })
    }
}

fn resolve_tool(name: &str, explicit: Option<&Path>, env_var: &str) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            debug!("Using configured {}: {}", name, path.display());
            return Ok(path.to_path_buf());
        }
        return Err(TranscodeError::MissingDependency(format!(
            "configured {} not found at {}",
            name,
            path.display()
        )));
    }

    if let Some(path) = env::var_os(env_var).map(PathBuf::from) {
        if path.is_file() {
            debug!("Using {} from {}: {}", name, env_var, path.display());
            return Ok(path);
        }
        debug!("{} points to a missing file: {}", env_var, path.display());
    }

    find_in_path(name, env::var_os("PATH").as_deref()).ok_or_else(|| {
        TranscodeError::MissingDependency(format!(
            "{} is required (install it with your package manager, \
             e.g. `sudo apt-get install ffmpeg`)",
            name
        ))
    })
}

/// Find a tool in a `PATH`-style list of directories
fn find_in_path(name: &str, path_var: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    let executable = if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    };

    env::split_paths(path_var?)
        .map(|dir| dir.join(&executable))
        .find(|candidate| candidate.is_file())
}
