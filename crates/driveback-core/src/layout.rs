//! Layout of a backup root on the destination drive.

use std::path::{Path, PathBuf};

/// Scratch directory holding this run's new copies.
pub const STAGING_DIR: &str = "staging";

/// Directory holding one zip archive per run.
pub const ARCHIVE_DIR: &str = "backups";

/// Digest → relative path record of everything backed up so far.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Paths under a backup root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupLayout {
    root: PathBuf,
}

impl BackupLayout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout for a removable drive mounted at `<media_root>/<user>/<label>`.
    pub fn for_drive(media_root: &Path, user: &str, label: &str) -> Self {
        Self::new(media_root.join(user).join(label))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.join(ARCHIVE_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Whether the backup root is present as a directory.
    pub fn root_exists(&self) -> bool {
        self.root.is_dir()
    }
}
