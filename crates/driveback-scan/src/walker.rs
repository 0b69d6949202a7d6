//! JWalk-based candidate walker.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jwalk::{DirEntry, Parallelism, WalkDir};
use tracing::debug;

use driveback_core::{BackupError, Candidate, ScanPolicy};

use crate::policy::{classify, classify_unfiltered, Decision, EntryKind};

type RawEntries = Box<dyn Iterator<Item = jwalk::Result<DirEntry<((), ())>>>>;

/// Depth-first walker yielding backup candidates under a root.
///
/// Symlinks are never followed. Excluded directories are pruned before
/// they are read, so nothing beneath them is visited.
pub struct TreeWalker {
    root: PathBuf,
    policy: Option<Arc<ScanPolicy>>,
}

impl TreeWalker {
    /// Create a walker applying `policy` under `root`.
    pub fn new(root: impl Into<PathBuf>, policy: ScanPolicy) -> Self {
        Self {
            root: root.into(),
            policy: Some(Arc::new(policy)),
        }
    }

    /// Create a walker yielding every regular file under `root`.
    pub fn unfiltered(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            policy: None,
        }
    }

    /// Start a single-pass walk.
    ///
    /// The root itself is resolved through any symlinks; only links found
    /// beneath it are skipped. A missing root is an error.
    pub fn candidates(&self) -> Result<Candidates, BackupError> {
        let root = fs::canonicalize(&self.root).map_err(|e| BackupError::io(&self.root, e))?;
        let walk_root = root.clone();
        let policy = self.policy.clone();

        // Serial parallelism keeps the walk depth-first on this thread;
        // siblings are sorted by name so repeated runs see the same order.
        let walker = WalkDir::new(&root)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(false)
            .follow_links(false)
            .process_read_dir(move |_depth, _dir, _state, children| {
                children.retain(|child| match child {
                    Ok(entry) => {
                        let kind = EntryKind::from_file_type(&entry.file_type);
                        let path = entry.path();
                        let relative = path.strip_prefix(&walk_root).unwrap_or(&path);
                        let decision = match &policy {
                            Some(policy) => classify(kind, relative, policy),
                            None => classify_unfiltered(kind),
                        };
                        if decision == Decision::Skip {
                            debug!(path = %path.display(), ?kind, "skipping entry");
                        }
                        decision != Decision::Skip
                    }
                    Err(_) => true,
                });
            });

        Ok(Candidates {
            root,
            entries: Box::new(walker.into_iter()),
            yielded: 0,
        })
    }
}

/// Lazy, single-pass sequence of candidates.
///
/// An unreadable directory ends the sequence's usefulness: the error is
/// yielded and callers are expected to abort.
pub struct Candidates {
    root: PathBuf,
    entries: RawEntries,
    yielded: u64,
}

impl Candidates {
    /// Number of candidates yielded so far.
    pub fn yielded(&self) -> u64 {
        self.yielded
    }
}

impl Iterator for Candidates {
    type Item = Result<Candidate, BackupError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(walk_error(err, &self.root))),
            };

            if let Some(err) = entry.read_children_error.take() {
                return Some(Err(walk_error(err, &entry.path())));
            }

            // Directories were kept only to be descended; links and other
            // kinds never survive `process_read_dir`.
            if !entry.file_type.is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(&path).to_path_buf();
            self.yielded += 1;
            return Some(Ok(Candidate::new(path, relative)));
        }
    }
}

fn walk_error(err: jwalk::Error, fallback: &Path) -> BackupError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| fallback.to_path_buf());
    let message = err.to_string();
    match err.into_io_error() {
        Some(source) => BackupError::io(path, source),
        None => BackupError::io(path, io::Error::other(message)),
    }
}
