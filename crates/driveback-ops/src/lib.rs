//! Staging, archiving and run orchestration for driveback.
//!
//! [`BackupEngine`] ties the pipeline together: it walks the source tree,
//! hashes candidates in batches, stages content the manifest has not
//! seen, bundles the staging area into a dated zip with [`Archiver`] and
//! finally saves the manifest. Callers observe a run through a
//! [`ProgressSink`].

mod archive;
mod engine;
mod progress;
mod staging;

pub use archive::{archive_name, ArchiveInfo, Archiver};
pub use engine::{BackupEngine, BackupReport, RunOutcome};
pub use progress::{BackupEvent, ProgressSink, RunPhase};
pub use staging::{StageOutcome, Stager, StagingArea};

// Re-export core types for convenience
pub use driveback_core::{BackupConfig, BackupError, BackupLayout, DEFAULT_COMPRESSION_LEVEL};
