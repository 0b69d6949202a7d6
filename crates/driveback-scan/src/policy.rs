//! Pure per-entry walk decisions.
//!
//! Kept free of I/O so the inclusion/exclusion rules can be tested on
//! synthetic entries.

use std::fs::FileType;
use std::path::Path;

use driveback_core::{relative_key, ScanPolicy};

/// What the walker saw at a path, without following links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// Sockets, devices, FIFOs.
    Other,
}

impl EntryKind {
    /// Classify a `FileType` obtained without following symlinks.
    pub fn from_file_type(file_type: &FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }
}

/// Outcome of applying the policy to one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Drop the entry; for a directory, nothing beneath it is visited.
    Skip,
    /// Recurse into the directory.
    Descend,
    /// Yield the file as a candidate.
    Yield,
}

/// Apply `policy` to an entry at `relative` (relative to the scan root).
///
/// Symlinks are checked first, so a link to an allowed file or to a
/// directory is always skipped.
pub fn classify(kind: EntryKind, relative: &Path, policy: &ScanPolicy) -> Decision {
    match kind {
        EntryKind::Symlink | EntryKind::Other => Decision::Skip,
        EntryKind::Directory => {
            if policy.excludes_dir(&relative_key(relative)) {
                Decision::Skip
            } else {
                Decision::Descend
            }
        }
        EntryKind::File => {
            let allowed = relative
                .extension()
                .is_some_and(|ext| policy.allows_extension(&ext.to_string_lossy()));
            if allowed {
                Decision::Yield
            } else {
                Decision::Skip
            }
        }
    }
}

/// Decision when no policy applies: every regular file, no links.
pub fn classify_unfiltered(kind: EntryKind) -> Decision {
    match kind {
        EntryKind::Symlink | EntryKind::Other => Decision::Skip,
        EntryKind::Directory => Decision::Descend,
        EntryKind::File => Decision::Yield,
    }
}
