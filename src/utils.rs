//! # Utility Functions Module
//!
//! Helpers for building engine command lines without repetitive conversions.
//! Paths are carried as `OsString` so non-UTF-8 file names survive intact.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Anything that can be passed as a single command-line argument
pub trait CommandArg {
    fn into_arg(self) -> OsString;
}

impl CommandArg for &str {
    fn into_arg(self) -> OsString {
        OsString::from(self)
    }
}

impl CommandArg for String {
    fn into_arg(self) -> OsString {
        OsString::from(self)
    }
}

impl CommandArg for &String {
    fn into_arg(self) -> OsString {
        OsString::from(self.as_str())
    }
}

impl CommandArg for &OsStr {
    fn into_arg(self) -> OsString {
        self.to_os_string()
    }
}

impl CommandArg for &Path {
    fn into_arg(self) -> OsString {
        self.as_os_str().to_os_string()
    }
}

impl CommandArg for &PathBuf {
    fn into_arg(self) -> OsString {
        self.as_os_str().to_os_string()
    }
}

impl CommandArg for u32 {
    fn into_arg(self) -> OsString {
        OsString::from(self.to_string())
    }
}

impl CommandArg for f64 {
    fn into_arg(self) -> OsString {
        OsString::from(format_seconds(self))
    }
}

/// Collects heterogeneous arguments into a `Vec<OsString>`.
///
/// ```text
/// let args = args!["-i", input_path, "-vf", filter, "-frames:v", 1u32];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        vec![$($crate::utils::CommandArg::into_arg($item)),*]
    };
}

/// Seconds rendered the way ffmpeg accepts them for `-ss`: fixed millisecond precision
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds.max(0.0))
}
