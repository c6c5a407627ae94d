//! # Error Types Module
//!
//! Defines the error taxonomy used by the transcoding pipeline.
//!
//! ## Categories:
//! - `Traversal`: a directory or file under the input root could not be listed or stat'd
//! - `Probe`: the metadata probe failed (duration unavailable because the probe itself errored)
//! - `EngineInvocation`: the external media engine failed to start or exited non-zero
//! - `TempFile`: renaming/removing a staged output failed
//! - `Timeout`: a job exceeded its deadline and was abandoned
//! - `QueueAbandoned`: a queued unit went away without producing a result
//! - `MissingDependency`: an engine executable could not be located
//! - `Validation`: invalid configuration
//!
//! Every failure is scoped to a single job; the driver decides how far it spreads.

use std::path::PathBuf;
use std::time::Duration;

use crate::queue::QueueError;

/// Errors raised while discovering, planning or executing artifact jobs
#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot traverse {}: {message}", path.display())]
    Traversal { path: PathBuf, message: String },

    #[error("Probe failed for {}: {message}", path.display())]
    Probe { path: PathBuf, message: String },

    #[error("{tool} failed: {message}")]
    EngineInvocation { tool: String, message: String },

    #[error("Temporary file error on {}: {source}", path.display())]
    TempFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Job for {} timed out after {:?}", target.display(), after)]
    Timeout { target: PathBuf, after: Duration },

    #[error("Queued job was abandoned: {0}")]
    QueueAbandoned(#[from] QueueError),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

impl TranscodeError {
    pub fn engine(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EngineInvocation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Failures that abort the whole run rather than a single asset
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingDependency(_) | Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, TranscodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_path() {
        let err = TranscodeError::probe("/in/squat.mp4", "no format section");
        assert_eq!(
            err.to_string(),
            "Probe failed for /in/squat.mp4: no format section"
        );

        let err = TranscodeError::engine("ffmpeg", "exit status 1");
        assert_eq!(err.to_string(), "ffmpeg failed: exit status 1");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(TranscodeError::MissingDependency("ffmpeg".into()).is_fatal());
        assert!(TranscodeError::Validation("concurrency".into()).is_fatal());
        assert!(!TranscodeError::engine("ffmpeg", "boom").is_fatal());
        assert!(!TranscodeError::Timeout {
            target: PathBuf::from("x.mp4"),
            after: Duration::from_secs(1),
        }
        .is_fatal());
    }
}
