//! Bundling the staging area into a dated zip archive.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use driveback_core::{BackupError, Result};
use driveback_scan::TreeWalker;

/// Entries at or above this size need zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// File name of the archive for a run started at `started_at`.
///
/// RFC 3339 UTC with milliseconds, `:` and `.` replaced by `-`, e.g.
/// `backup-2024-05-01T12-34-56-789Z.zip`.
pub fn archive_name(started_at: DateTime<Utc>) -> String {
    let stamp = started_at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("backup-{stamp}.zip")
}

/// A written, synced archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveInfo {
    /// File name within the archive directory.
    pub name: String,
    /// Full path of the archive.
    pub path: PathBuf,
    /// Size of the archive on disk.
    pub size_bytes: u64,
    /// Number of file entries.
    pub entries: u64,
}

/// Writes staging contents into `<archive_dir>/backup-<timestamp>.zip`.
#[derive(Debug, Clone)]
pub struct Archiver {
    archive_dir: PathBuf,
    compression_level: u32,
}

impl Archiver {
    pub fn new(archive_dir: impl Into<PathBuf>, compression_level: u32) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            compression_level,
        }
    }

    /// Archive every regular file under `staging`, keyed by its path
    /// relative to `staging`.
    ///
    /// The archive is created fresh; an existing file with the same name is
    /// an error. On return the archive bytes have been synced to disk.
    pub fn write(&self, staging: &Path, started_at: DateTime<Utc>) -> Result<ArchiveInfo> {
        fs::create_dir_all(&self.archive_dir).map_err(|e| BackupError::io(&self.archive_dir, e))?;

        let name = archive_name(started_at);
        let path = self.archive_dir.join(&name);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| BackupError::io(&path, e))?;

        let mut zip = ZipWriter::new(BufWriter::new(file));
        let mut entries = 0u64;

        for candidate in TreeWalker::unfiltered(staging).candidates()? {
            let candidate = candidate?;
            let entry_name = candidate.manifest_path();
            let size = fs::metadata(&candidate.path)
                .map_err(|e| BackupError::io(&candidate.path, e))?
                .len();

            zip.start_file(entry_name.as_str(), self.entry_options(size))
                .map_err(|e| BackupError::archive(&path, e))?;
            let mut source =
                File::open(&candidate.path).map_err(|e| BackupError::io(&candidate.path, e))?;
            io::copy(&mut source, &mut zip).map_err(|e| BackupError::archive(&path, e))?;

            debug!(entry = %entry_name, size, "archived");
            entries += 1;
        }

        let writer = zip.finish().map_err(|e| BackupError::archive(&path, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| BackupError::archive(&path, e.into_error()))?;
        file.sync_all().map_err(|e| BackupError::io(&path, e))?;

        let size_bytes = file
            .metadata()
            .map_err(|e| BackupError::io(&path, e))?
            .len();
        info!(archive = %path.display(), entries, size_bytes, "archive written");

        Ok(ArchiveInfo {
            name,
            path,
            size_bytes,
            entries,
        })
    }

    fn entry_options(&self, size: u64) -> SimpleFileOptions {
        let options = if self.compression_level == 0 {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(self.compression_level)))
        };
        options.large_file(size >= ZIP64_THRESHOLD)
    }
}
