//! Progress reporting for backup runs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::archive::ArchiveInfo;

/// Stage of a backup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Idle,
    ValidatingRoot,
    Scanning,
    Copying,
    Archiving,
    PersistingManifest,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::ValidatingRoot => write!(f, "Checking backup drive"),
            Self::Scanning => write!(f, "Scanning for files"),
            Self::Copying => write!(f, "Copying new files"),
            Self::Archiving => write!(f, "Creating archive"),
            Self::PersistingManifest => write!(f, "Saving manifest"),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// Something observable happened during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupEvent {
    /// The run entered a new phase.
    PhaseChanged(RunPhase),
    /// A file with new content was staged.
    FileCopied { relative: String, bytes: u64 },
    /// A file was skipped because its content is already backed up.
    DuplicateSkipped { relative: String, existing: String },
    /// The run's archive is on disk.
    ArchiveWritten(ArchiveInfo),
}

/// Receives events as a run progresses.
pub trait ProgressSink {
    fn on_event(&mut self, event: &BackupEvent);
}

/// Discards every event.
impl ProgressSink for () {
    fn on_event(&mut self, _event: &BackupEvent) {}
}

/// Collects events, mostly useful in tests.
impl ProgressSink for Vec<BackupEvent> {
    fn on_event(&mut self, event: &BackupEvent) {
        self.push(event.clone());
    }
}
