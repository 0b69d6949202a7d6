//! The persisted digest → path record.
//!
//! `manifest.json` is a single JSON object. Each property name is a content
//! digest, each value the relative path recorded when that content was
//! first copied. Entries are only ever added.

use std::collections::btree_map::{self, BTreeMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use driveback_core::{BackupError, ContentDigest, Result};

/// In-memory manifest.
///
/// Assumes a single writer; concurrent runs against one backup root are
/// not guarded against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<ContentDigest, String>,
}

impl Manifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the manifest at `path`, or an empty one if no file exists.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no manifest yet");
                return Ok(Self::new());
            }
            Err(err) => return Err(BackupError::io(path, err)),
        };

        let manifest: Self =
            serde_json::from_slice(&bytes).map_err(|source| BackupError::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), entries = manifest.len(), "loaded manifest");
        Ok(manifest)
    }

    /// Write the manifest to `path` as indented JSON, replacing any
    /// previous contents.
    ///
    /// The document is written to a sibling temporary file and renamed into
    /// place, so a crash mid-write leaves the previous manifest intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let temp_path = path.with_extension("json.tmp");

        let file = File::create(&temp_path).map_err(|e| BackupError::io(&temp_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|source| {
            BackupError::io(&temp_path, std::io::Error::other(source))
        })?;
        writer
            .write_all(b"\n")
            .map_err(|e| BackupError::io(&temp_path, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| BackupError::io(&temp_path, e.into_error()))?;
        file.sync_all().map_err(|e| BackupError::io(&temp_path, e))?;

        fs::rename(&temp_path, path).map_err(|e| BackupError::io(path, e))?;
        info!(path = %path.display(), entries = self.len(), "saved manifest");
        Ok(())
    }

    /// Check if content with this digest was already backed up.
    pub fn contains(&self, digest: &ContentDigest) -> bool {
        self.entries.contains_key(digest)
    }

    /// Relative path recorded for a digest.
    pub fn get(&self, digest: &ContentDigest) -> Option<&str> {
        self.entries.get(digest).map(String::as_str)
    }

    /// Record a newly copied file. Returns `false` (and keeps the existing
    /// path) if the digest is already present.
    pub fn record(&mut self, digest: ContentDigest, relative: impl Into<String>) -> bool {
        match self.entries.entry(digest) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(relative.into());
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Add every entry of `other` not already present. Returns how many
    /// were added.
    pub fn merge(&mut self, other: Manifest) -> usize {
        other
            .entries
            .into_iter()
            .filter(|(digest, relative)| self.record(*digest, relative.clone()))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in digest order.
    pub fn iter(&self) -> impl Iterator<Item = (&ContentDigest, &str)> {
        self.entries.iter().map(|(digest, path)| (digest, path.as_str()))
    }
}
