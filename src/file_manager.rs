//! # File Management Module
//!
//! Filesystem operations shared by every job.
//!
//! ## Responsibilities:
//! - Idempotent directory creation (racing jobs may create the same directory)
//! - Staged outputs: the engine writes into a uniquely named temporary file in
//!   the destination directory, which is renamed into place only on success, so
//!   a destination path never holds a partially written artifact
//! - Human-readable sizes for log lines
//!
//! Temporary names look like `temp_<millis>_<random>_<basename>`, keeping the
//! destination extension so the engine still infers the output format.

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::TempPath;
use tokio::fs;
use tracing::debug;

use crate::error::{Result, TranscodeError};

/// Mode requested for staged artifacts
#[cfg(unix)]
const ARTIFACT_MODE: u32 = 0o644;

/// Create `dir` and its parents; an existing directory is not an error
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    match fs::create_dir_all(dir).await {
        Ok(()) => Ok(()),
        // create_dir_all already tolerates races, this covers filesystems that don't report it
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Size of a file in bytes
pub async fn file_size(path: &Path) -> Result<u64> {
    Ok(fs::metadata(path).await?.len())
}

/// A temporary file that becomes `destination` on [`StagedOutput::commit`].
///
/// Dropping it without committing removes the temporary file.
#[derive(Debug)]
pub struct StagedOutput {
    temp: TempPath,
    destination: PathBuf,
}

impl StagedOutput {
    /// Reserve a temporary path next to `destination`
    pub fn new(destination: &Path) -> Result<Self> {
        let dir = destination.parent().unwrap_or(Path::new("."));
        let basename = destination
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();

        let prefix = format!("temp_{millis}_");
        let suffix = format!("_{basename}");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(&suffix).rand_bytes(6);
        // tempfile defaults to 0600; artifacts get the usual mode, minus umask
        #[cfg(unix)]
        builder.permissions(std::fs::Permissions::from_mode(ARTIFACT_MODE));

        let temp = builder
            .tempfile_in(dir)
            .map_err(|source| TranscodeError::TempFile {
                path: dir.to_path_buf(),
                source,
            })?
            .into_temp_path();

        debug!(
            "Staging {} via {}",
            destination.display(),
            temp.display()
        );

        Ok(Self {
            temp,
            destination: destination.to_path_buf(),
        })
    }

    /// Path the engine should write to
    pub fn path(&self) -> &Path {
        &self.temp
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Atomically move the staged file onto its destination
    pub fn commit(self) -> Result<PathBuf> {
        let destination = self.destination;
        self.temp
            .persist(&destination)
            .map_err(|e| TranscodeError::TempFile {
                path: destination.clone(),
                source: e.error,
            })?;
        Ok(destination)
    }
}

/// Get human-readable file size
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_dir_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("videos").join("large").join("legs");

        ensure_dir(&dir).await.unwrap();
        ensure_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_ensure_dir_tolerates_concurrent_creation() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("images").join("small").join("arms");

        let (a, b) = tokio::join!(ensure_dir(&dir), ensure_dir(&dir));
        assert!(a.is_ok() && b.is_ok());
    }

    #[test]
    fn test_staged_output_commits_into_place() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("squat.mp4");

        let staged = StagedOutput::new(&destination).unwrap();
        let name = staged.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("temp_"));
        assert!(name.ends_with("_squat.mp4"));
        assert!(!destination.exists());

        std::fs::write(staged.path(), b"frames").unwrap();
        let staged_path = staged.path().to_path_buf();
        let committed = staged.commit().unwrap();

        assert_eq!(committed, destination);
        assert_eq!(std::fs::read(&destination).unwrap(), b"frames");
        assert!(!staged_path.exists());
    }

    #[test]
    fn test_dropped_stage_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("squat.jpg");

        let staged = StagedOutput::new(&destination).unwrap();
        let staged_path = staged.path().to_path_buf();
        std::fs::write(&staged_path, b"half a frame").unwrap();
        drop(staged);

        assert!(!staged_path.exists());
        assert!(!destination.exists());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_concurrent_stages_get_distinct_names() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("squat.mp4");

        let first = StagedOutput::new(&destination).unwrap();
        let second = StagedOutput::new(&destination).unwrap();
        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn test_whitespace_in_names_is_sanitised() {
        let temp = TempDir::new().unwrap();
        let staged = StagedOutput::new(&temp.path().join("goblet squat.mp4")).unwrap();
        let name = staged.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("_goblet_squat.mp4"));
    }

    #[cfg(unix)]
    #[test]
    fn test_committed_artifact_is_readable_by_others() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("squat.jpg");

        let staged = StagedOutput::new(&destination).unwrap();
        std::fs::write(staged.path(), b"frame").unwrap();
        staged.commit().unwrap();

        let mode = std::fs::metadata(&destination).unwrap().permissions().mode() & 0o777;
        // exact bits depend on the umask; owner-only would be 0600
        assert_eq!(mode & 0o600, 0o600);
        assert_eq!(mode & 0o044, 0o044, "mode was {mode:o}");
        assert_eq!(mode & 0o111, 0);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
