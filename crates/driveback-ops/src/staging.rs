//! Copying new content into the staging area.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use driveback_core::{BackupError, Candidate, Result};
use driveback_dedup::{Hashed, Manifest};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// The `staging/` directory under a backup root.
///
/// Holds this run's new copies at their source-relative paths until they
/// are archived. The directory is created on the first copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// Whether the directory exists and holds at least one entry.
    pub fn has_contents(&self) -> Result<bool> {
        match fs::read_dir(&self.dir) {
            Ok(mut entries) => Ok(entries.next().is_some()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(BackupError::io(&self.dir, err)),
        }
    }

    /// Copy `candidate` to its relative path under the staging directory,
    /// creating parent directories. Returns the number of bytes copied.
    ///
    /// Anything already at the destination (a leftover from an earlier,
    /// failed run) is removed first, even if it is read-only. Read failures
    /// are reported against the source, write failures against the staged
    /// path.
    pub fn stage(&self, candidate: &Candidate) -> Result<u64> {
        let dest = self.dir.join(&candidate.relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| BackupError::io(parent, e))?;
        }
        clear_destination(&dest)?;

        let mut source = File::open(&candidate.path).map_err(|e| BackupError::io(&candidate.path, e))?;
        let mut target = File::create(&dest).map_err(|e| BackupError::io(&dest, e))?;
        let bytes = copy_contents(&mut source, &mut target, &candidate.path, &dest)?;

        debug!(from = %candidate.path.display(), to = %dest.display(), bytes, "staged");
        Ok(bytes)
    }

    /// Delete the staging directory and everything in it.
    ///
    /// Only call once the staged files are safely archived.
    pub fn remove(self) -> Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(BackupError::io(&self.dir, err)),
        }
    }
}

/// Remove whatever occupies `dest`, if anything.
fn clear_destination(dest: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(dest) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(BackupError::io(dest, err)),
    };

    debug!(path = %dest.display(), "replacing leftover staged entry");
    let removed = if metadata.is_dir() {
        fs::remove_dir_all(dest)
    } else {
        fs::remove_file(dest)
    };
    match removed {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(BackupError::io(dest, err)),
    }
}

fn copy_contents(
    source: &mut impl Read,
    target: &mut impl Write,
    from: &Path,
    to: &Path,
) -> Result<u64> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let bytes_read = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(BackupError::io(from, err)),
        };
        target
            .write_all(&buffer[..bytes_read])
            .map_err(|e| BackupError::io(to, e))?;
        total += bytes_read as u64;
    }

    target.flush().map_err(|e| BackupError::io(to, e))?;
    Ok(total)
}

/// What happened to one hashed candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// New content, now staged and recorded.
    Copied { relative: String, bytes: u64 },
    /// Content already in the manifest; nothing was read or written.
    Duplicate { relative: String, existing: String },
}

/// Dedups hashed candidates against a manifest and stages the new ones.
#[derive(Debug)]
pub struct Stager<'a> {
    area: &'a StagingArea,
    copied: u64,
    bytes: u64,
}

impl<'a> Stager<'a> {
    pub fn new(area: &'a StagingArea) -> Self {
        Self {
            area,
            copied: 0,
            bytes: 0,
        }
    }

    /// Stage `hashed` unless its digest is already known.
    ///
    /// The manifest is updated only after the copy succeeds.
    pub fn offer(&mut self, hashed: Hashed, manifest: &mut Manifest) -> Result<StageOutcome> {
        let relative = hashed.candidate.manifest_path();

        if let Some(existing) = manifest.get(&hashed.digest) {
            debug!(%relative, %existing, "duplicate content");
            return Ok(StageOutcome::Duplicate {
                relative,
                existing: existing.to_string(),
            });
        }

        let bytes = self.area.stage(&hashed.candidate)?;
        manifest.record(hashed.digest, relative.clone());
        self.copied += 1;
        self.bytes += bytes;
        Ok(StageOutcome::Copied { relative, bytes })
    }

    /// Files copied so far.
    pub fn copied(&self) -> u64 {
        self.copied
    }

    /// Bytes copied so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driveback_dedup::hash_file;
    use tempfile::TempDir;

    fn hashed(root: &Path, relative: &str) -> Hashed {
        let candidate = Candidate::new(root.join(relative), relative);
        let digest = hash_file(&candidate.path).unwrap();
        Hashed { candidate, digest }
    }

    #[test]
    fn test_stage_mirrors_relative_path() {
        let source = TempDir::new().unwrap();
        let drive = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join("b/nested")).unwrap();
        fs::write(source.path().join("b/nested/copy.jpg"), "abc").unwrap();

        let area = StagingArea::new(drive.path().join("staging"));
        assert!(!area.exists());

        let candidate = Candidate::new(source.path().join("b/nested/copy.jpg"), "b/nested/copy.jpg");
        assert_eq!(area.stage(&candidate).unwrap(), 3);
        assert_eq!(
            fs::read_to_string(drive.path().join("staging/b/nested/copy.jpg")).unwrap(),
            "abc"
        );
    }

    #[test]
    fn test_offer_skips_known_digest() {
        let source = TempDir::new().unwrap();
        let drive = TempDir::new().unwrap();
        fs::create_dir(source.path().join("b")).unwrap();
        fs::write(source.path().join("a.jpg"), "X").unwrap();
        fs::write(source.path().join("b/copy.jpg"), "X").unwrap();

        let area = StagingArea::new(drive.path().join("staging"));
        let mut stager = Stager::new(&area);
        let mut manifest = Manifest::new();

        let first = stager.offer(hashed(source.path(), "a.jpg"), &mut manifest).unwrap();
        let second = stager.offer(hashed(source.path(), "b/copy.jpg"), &mut manifest).unwrap();

        assert_eq!(
            first,
            StageOutcome::Copied {
                relative: "a.jpg".to_string(),
                bytes: 1
            }
        );
        assert_eq!(
            second,
            StageOutcome::Duplicate {
                relative: "b/copy.jpg".to_string(),
                existing: "a.jpg".to_string()
            }
        );
        assert_eq!(stager.copied(), 1);
        assert_eq!(stager.bytes(), 1);
        assert_eq!(manifest.len(), 1);
        assert!(!drive.path().join("staging/b").exists());
    }

    #[test]
    fn test_failed_copy_leaves_manifest_untouched() {
        let source = TempDir::new().unwrap();
        let drive = TempDir::new().unwrap();
        let path = source.path().join("a.jpg");
        fs::write(&path, "X").unwrap();
        let item = hashed(source.path(), "a.jpg");
        fs::remove_file(&path).unwrap();

        let area = StagingArea::new(drive.path().join("staging"));
        let mut stager = Stager::new(&area);
        let mut manifest = Manifest::new();

        assert!(stager.offer(item, &mut manifest).is_err());
        assert!(manifest.is_empty());
        assert_eq!(stager.copied(), 0);
    }

    #[test]
    fn test_stage_missing_source_names_source() {
        let source = TempDir::new().unwrap();
        let drive = TempDir::new().unwrap();
        let area = StagingArea::new(drive.path().join("staging"));
        let missing = source.path().join("gone.jpg");

        let err = area.stage(&Candidate::new(&missing, "gone.jpg")).unwrap_err();
        assert!(matches!(err, BackupError::NotFound { ref path } if path == &missing));
    }

    #[test]
    fn test_stage_replaces_leftover_directory() {
        let source = TempDir::new().unwrap();
        let drive = TempDir::new().unwrap();
        fs::write(source.path().join("a.jpg"), "new").unwrap();

        let area = StagingArea::new(drive.path().join("staging"));
        fs::create_dir_all(area.dir().join("a.jpg/inner")).unwrap();

        area.stage(&Candidate::new(source.path().join("a.jpg"), "a.jpg"))
            .unwrap();
        assert_eq!(fs::read_to_string(area.dir().join("a.jpg")).unwrap(), "new");
    }

    #[cfg(unix)]
    #[test]
    fn test_stage_replaces_read_only_leftover() {
        use std::os::unix::fs::PermissionsExt;

        let source = TempDir::new().unwrap();
        let drive = TempDir::new().unwrap();
        fs::write(source.path().join("ro.jpg"), "fresh").unwrap();
        fs::set_permissions(source.path().join("ro.jpg"), fs::Permissions::from_mode(0o444))
            .unwrap();

        let area = StagingArea::new(drive.path().join("staging"));
        fs::create_dir_all(area.dir()).unwrap();
        let leftover = area.dir().join("ro.jpg");
        fs::write(&leftover, "stale").unwrap();
        fs::set_permissions(&leftover, fs::Permissions::from_mode(0o444)).unwrap();

        let bytes = area
            .stage(&Candidate::new(source.path().join("ro.jpg"), "ro.jpg"))
            .unwrap();
        assert_eq!(bytes, 5);
        assert_eq!(fs::read_to_string(&leftover).unwrap(), "fresh");

        // Staged copies stay writable so later runs can replace them.
        let mode = fs::metadata(&leftover).unwrap().permissions().mode();
        assert_ne!(mode & 0o200, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_stage_write_failure_names_destination() {
        use std::os::unix::fs::PermissionsExt;

        let source = TempDir::new().unwrap();
        let drive = TempDir::new().unwrap();
        fs::write(source.path().join("a.jpg"), "X").unwrap();

        let area = StagingArea::new(drive.path().join("staging"));
        fs::create_dir_all(area.dir()).unwrap();
        fs::set_permissions(area.dir(), fs::Permissions::from_mode(0o555)).unwrap();

        // Root ignores permission bits; nothing to assert in that case.
        let writable_anyway = fs::write(area.dir().join("check"), "").is_ok();
        let result = area.stage(&Candidate::new(source.path().join("a.jpg"), "a.jpg"));

        fs::set_permissions(area.dir(), fs::Permissions::from_mode(0o755)).unwrap();

        if !writable_anyway {
            let dest = area.dir().join("a.jpg");
            assert!(matches!(
                result,
                Err(BackupError::PermissionDenied { ref path }) if path == &dest
            ));
        }
    }

    #[test]
    fn test_remove_is_idempotent() {
        let drive = TempDir::new().unwrap();
        let area = StagingArea::new(drive.path().join("staging"));
        fs::create_dir_all(area.dir().join("x")).unwrap();
        assert!(area.has_contents().unwrap());

        area.clone().remove().unwrap();
        assert!(!area.exists());
        assert!(!area.has_contents().unwrap());
        area.remove().unwrap();
    }
}
