//! # Directory Walker
//!
//! Enumerates the input tree and turns every accepted regular file into a
//! [`MediaAsset`]. Enumeration is pure: [`DirectoryWalker::walk`] returns a lazy
//! iterator with no side effects beyond filesystem reads, and calling it again
//! restarts the traversal. Dispatching assets is the driver's business.
//!
//! ## Rules:
//! - depth-first, entries sorted by file name
//! - the category of a file is the name of its immediate parent directory
//! - hidden entries (leading `.`) below the root are skipped
//! - only files whose extension is listed are emitted (an empty list accepts all)
//! - an unreadable entry yields an `Err` for that subtree; later siblings still follow

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::{Result, TranscodeError};

/// Suffix marking a primary take, stripped from base names
const PRIMARY_TAKE_SUFFIX: &str = "_1";

/// One discovered input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    /// Path of the source file
    pub path: PathBuf,
    /// File name without extension, with one trailing `_1` removed
    pub base_name: String,
    /// Name of the directory directly containing the file
    pub category: String,
}

impl MediaAsset {
    pub fn from_path(path: &Path) -> Result<Self> {
        let base_name = base_name(path).ok_or_else(|| TranscodeError::Traversal {
            path: path.to_path_buf(),
            message: "file has no usable name".to_string(),
        })?;

        let category = path
            .parent()
            .and_then(|parent| parent.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| TranscodeError::Traversal {
                path: path.to_path_buf(),
                message: "cannot determine parent directory name".to_string(),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            base_name,
            category,
        })
    }

    /// File name of the source, for log lines
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned()
    }
}

/// Derive the base name used for every artifact of `path`.
///
/// `squat_1.mp4` → `squat`, `lunge.mov` → `lunge`. Only one `_1` is removed, and
/// a stem consisting solely of `_1` is kept as is.
pub fn base_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let base = match stem.strip_suffix(PRIMARY_TAKE_SUFFIX) {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => stem.as_ref(),
    };
    Some(base.to_string())
}

/// Recursive enumerator of media assets under one root
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectoryWalker {
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        let extensions = extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        Self {
            root: root.into(),
            extensions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fail unless the root itself can be listed
    pub fn check_root(&self) -> Result<()> {
        let traversal = |message: String| TranscodeError::Traversal {
            path: self.root.clone(),
            message,
        };

        let metadata = std::fs::metadata(&self.root).map_err(|e| traversal(e.to_string()))?;
        if !metadata.is_dir() {
            return Err(traversal("not a directory".to_string()));
        }
        std::fs::read_dir(&self.root).map_err(|e| traversal(e.to_string()))?;
        Ok(())
    }

    /// Check whether a file's extension is accepted
    pub fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map(|ext| self.extensions.iter().any(|allowed| *allowed == ext))
            .unwrap_or(false)
    }

    /// Lazily enumerate every accepted file under the root
    pub fn walk(&self) -> impl Iterator<Item = Result<MediaAsset>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
            .filter_map(move |entry| match entry {
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    Some(Err(TranscodeError::Traversal {
                        path,
                        message: e.to_string(),
                    }))
                }
                Ok(entry) if entry.file_type().is_dir() => None,
                Ok(entry) => {
                    if !self.accepts(entry.path()) {
                        debug!("Ignoring non-media file: {}", entry.path().display());
                        return None;
                    }
                    Some(MediaAsset::from_path(entry.path()))
                }
            })
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
