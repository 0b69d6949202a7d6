//! End-to-end backup runs.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use driveback_core::{BackupConfig, BackupError, Candidate, Result};
use driveback_dedup::{hash_all, hash_pool, Manifest};
use driveback_scan::TreeWalker;

use crate::archive::{ArchiveInfo, Archiver};
use crate::progress::{BackupEvent, ProgressSink, RunPhase};
use crate::staging::{StageOutcome, Stager, StagingArea};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every candidate was already backed up. Nothing was written.
    NothingNew,
    /// New files were archived and the staging area removed.
    Archived(ArchiveInfo),
    /// New files were left in the staging directory.
    Staged { dir: PathBuf },
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupReport {
    pub started_at: DateTime<Utc>,
    /// Candidates the walker yielded.
    pub scanned: u64,
    /// Candidates whose content was already backed up.
    pub duplicates: u64,
    /// Files copied into staging.
    pub copied: u64,
    pub bytes_copied: u64,
    pub outcome: RunOutcome,
}

/// Runs one incremental backup from a source tree to a backup root.
///
/// The run is a fixed sequence: check the backup root, walk and hash the
/// source in batches, stage content not yet in the manifest, then archive
/// (when enabled) and save the manifest. Any error ends the run where it
/// stands; staged copies are left in place and the manifest is not saved.
#[derive(Debug, Clone)]
pub struct BackupEngine {
    config: BackupConfig,
}

impl BackupEngine {
    pub fn new(config: BackupConfig) -> Self {
        Self { config }
    }

    /// Run a backup, timestamped now.
    pub fn run(&self, sink: &mut dyn ProgressSink) -> Result<BackupReport> {
        self.run_at(Utc::now(), sink)
    }

    /// Run a backup with an explicit start time (used for the archive name).
    pub fn run_at(
        &self,
        started_at: DateTime<Utc>,
        sink: &mut dyn ProgressSink,
    ) -> Result<BackupReport> {
        let layout = self.config.layout();

        enter(sink, RunPhase::ValidatingRoot);
        if !layout.root_exists() {
            return Err(BackupError::BackupRootMissing {
                path: layout.root().to_path_buf(),
            });
        }

        let manifest_path = layout.manifest_path();
        let mut manifest = Manifest::load(&manifest_path)?;
        let known_before = manifest.len();

        let staging = StagingArea::new(layout.staging_dir());
        if staging.has_contents()? {
            warn!(
                dir = %staging.dir().display(),
                "staging area holds files from an earlier run"
            );
        }

        let pool = hash_pool(self.config.hash_threads)?;
        let mut stager = Stager::new(&staging);
        let mut duplicates = 0u64;

        enter(sink, RunPhase::Scanning);
        let walker = TreeWalker::new(&self.config.source_root, self.config.policy.clone());
        let mut candidates = walker.candidates()?;
        let mut copying = false;

        loop {
            let batch = candidates
                .by_ref()
                .take(self.config.batch_size)
                .collect::<Result<Vec<Candidate>>>()?;
            if batch.is_empty() {
                break;
            }
            if !copying {
                enter(sink, RunPhase::Copying);
                copying = true;
            }

            for hashed in hash_all(&pool, batch)? {
                match stager.offer(hashed, &mut manifest)? {
                    StageOutcome::Copied { relative, bytes } => {
                        sink.on_event(&BackupEvent::FileCopied { relative, bytes });
                    }
                    StageOutcome::Duplicate { relative, existing } => {
                        duplicates += 1;
                        sink.on_event(&BackupEvent::DuplicateSkipped { relative, existing });
                    }
                }
            }
        }

        let scanned = candidates.yielded();
        let copied = stager.copied();
        let bytes_copied = stager.bytes();
        info!(scanned, duplicates, copied, bytes_copied, "scan complete");

        let outcome = if copied == 0 {
            RunOutcome::NothingNew
        } else if self.config.zip {
            enter(sink, RunPhase::Archiving);
            let archiver = Archiver::new(layout.archive_dir(), self.config.compression_level);
            let info = archiver.write(staging.dir(), started_at)?;
            sink.on_event(&BackupEvent::ArchiveWritten(info.clone()));
            staging.remove()?;
            RunOutcome::Archived(info)
        } else {
            RunOutcome::Staged {
                dir: staging.dir().to_path_buf(),
            }
        };

        if copied > 0 {
            enter(sink, RunPhase::PersistingManifest);
            manifest.save(&manifest_path)?;
            info!(
                added = manifest.len() - known_before,
                total = manifest.len(),
                "manifest updated"
            );
        }

        enter(sink, RunPhase::Done);
        Ok(BackupReport {
            started_at,
            scanned,
            duplicates,
            copied,
            bytes_copied,
            outcome,
        })
    }
}

fn enter(sink: &mut dyn ProgressSink, phase: RunPhase) {
    info!(%phase, "phase");
    sink.on_event(&BackupEvent::PhaseChanged(phase));
}
