//! Files selected for backup consideration.

use std::path::{Path, PathBuf};

/// A regular file that passed the scan policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute path on the source filesystem.
    pub path: PathBuf,
    /// Path relative to the scan root.
    pub relative: PathBuf,
    /// Lowercased extension without the leading dot (empty if none).
    pub extension: String,
}

impl Candidate {
    /// Create a candidate, deriving the extension from the relative path.
    pub fn new(path: impl Into<PathBuf>, relative: impl Into<PathBuf>) -> Self {
        let relative = relative.into();
        let extension = relative
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Self {
            path: path.into(),
            relative,
            extension,
        }
    }

    /// Relative path as recorded in the manifest and in archives.
    pub fn manifest_path(&self) -> String {
        relative_key(&self.relative)
    }
}

/// Render a relative path with `/` separators on every platform.
///
/// Non-UTF-8 name bytes are replaced with U+FFFD, so two distinct
/// non-UTF-8 names that differ only in those bytes render to the same key.
/// Such files share one manifest path and collide as archive entries.
pub fn relative_key(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
