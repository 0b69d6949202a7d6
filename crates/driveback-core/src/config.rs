//! Backup run configuration.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::layout::BackupLayout;

/// Image, video and document formats backed up by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "mp4", "avi", "mkv", "mov", "txt", "pdf", "docx", "md",
];

/// Root-relative directory prefixes never descended by default.
pub const DEFAULT_EXCLUDE_PREFIXES: &[&str] = &[
    ".PlayOnLinux",
    ".wine",
    "node_modules",
    ".cache",
    ".local/share/Trash",
];

/// Deflate level for archive entries unless configured otherwise.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 9;

/// Inclusion and exclusion rules applied while walking the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPolicy {
    /// Allowed file extensions, lowercased, without the leading dot.
    pub include_extensions: Vec<String>,

    /// Directory prefixes, relative to the scan root with `/` separators.
    ///
    /// Matching is a plain string-prefix test, not a path-segment test:
    /// `.cache` also excludes `.cache-extra`, and `node_modules` only
    /// matches at the top of the scan root.
    pub exclude_prefixes: Vec<String>,
}

impl ScanPolicy {
    /// Create a policy, normalizing extensions and dropping empty entries.
    pub fn new<E, P>(extensions: E, exclude_prefixes: P) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            include_extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .filter(|ext| !ext.is_empty())
                .collect(),
            exclude_prefixes: exclude_prefixes
                .into_iter()
                .map(Into::into)
                .filter(|prefix: &String| !prefix.is_empty())
                .collect(),
        }
    }

    /// Check if a file extension (with or without the dot) is allowed.
    pub fn allows_extension(&self, extension: &str) -> bool {
        let extension = normalize_extension(extension);
        !extension.is_empty()
            && self
                .include_extensions
                .iter()
                .any(|allowed| normalize_extension(allowed) == extension)
    }

    /// Check if a directory, given relative to the scan root, is excluded.
    pub fn excludes_dir(&self, relative: &str) -> bool {
        self.exclude_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && relative.starts_with(prefix.as_str()))
    }
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS.iter(), DEFAULT_EXCLUDE_PREFIXES.iter().copied())
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}

/// Configuration for one backup run.
///
/// Every ambient location (home directory, drive mount point) is resolved
/// by the caller and passed in here.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct BackupConfig {
    /// Directory tree to back up.
    pub source_root: PathBuf,

    /// Destination drive mount point.
    pub backup_root: PathBuf,

    /// Inclusion/exclusion rules.
    #[builder(default)]
    #[serde(default)]
    pub policy: ScanPolicy,

    /// Bundle new files into a zip archive (otherwise leave them staged).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub zip: bool,

    /// Deflate level for archive entries (0-9).
    #[builder(default = "DEFAULT_COMPRESSION_LEVEL")]
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Number of hashing threads (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub hash_threads: usize,

    /// Candidates pulled from the walker per hashing batch.
    #[builder(default = "256")]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_batch_size() -> usize {
    256
}

impl BackupConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.source_root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Source root cannot be empty".to_string());
            }
            Some(_) => {}
            None => return Err("Source root is required".to_string()),
        }
        match self.backup_root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Backup root cannot be empty".to_string());
            }
            Some(_) => {}
            None => return Err("Backup root is required".to_string()),
        }
        if let Some(level) = self.compression_level {
            if level > 9 {
                return Err(format!("Compression level must be 0-9, got {level}"));
            }
        }
        if self.batch_size == Some(0) {
            return Err("Batch size must be at least 1".to_string());
        }
        Ok(())
    }
}

impl BackupConfig {
    /// Create a new config builder.
    pub fn builder() -> BackupConfigBuilder {
        BackupConfigBuilder::default()
    }

    /// Create a config with default policy and settings.
    pub fn new(source_root: impl Into<PathBuf>, backup_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            backup_root: backup_root.into(),
            policy: ScanPolicy::default(),
            zip: true,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            hash_threads: 0,
            batch_size: 256,
        }
    }

    /// On-drive layout for this run's backup root.
    pub fn layout(&self) -> BackupLayout {
        BackupLayout::new(&self.backup_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = BackupConfig::builder()
            .source_root("/home/ana")
            .backup_root("/media/ana/New Volume")
            .zip(false)
            .hash_threads(4usize)
            .build()
            .unwrap();

        assert_eq!(config.source_root, PathBuf::from("/home/ana"));
        assert!(!config.zip);
        assert_eq!(config.hash_threads, 4);
        assert_eq!(config.compression_level, 9);
        assert_eq!(config.policy, ScanPolicy::default());
    }

    #[test]
    fn test_config_builder_validation() {
        assert!(BackupConfig::builder().source_root("/home/ana").build().is_err());
        assert!(BackupConfig::builder()
            .source_root("/home/ana")
            .backup_root("/media/x")
            .compression_level(12u32)
            .build()
            .is_err());
        assert!(BackupConfig::builder()
            .source_root("")
            .backup_root("/media/x")
            .build()
            .is_err());
    }

    #[test]
    fn test_policy_extensions_case_insensitive() {
        let policy = ScanPolicy::default();
        assert!(policy.allows_extension("JPG"));
        assert!(policy.allows_extension(".md"));
        assert!(!policy.allows_extension("exe"));
        assert!(!policy.allows_extension(""));
    }

    #[test]
    fn test_policy_prefix_is_not_segment_aware() {
        let policy = ScanPolicy::default();
        assert!(policy.excludes_dir(".cache"));
        assert!(policy.excludes_dir(".cache-extra"));
        assert!(policy.excludes_dir(".local/share/Trash/files"));
        assert!(!policy.excludes_dir("projects/node_modules"));
        assert!(!policy.excludes_dir(""));
    }

    #[test]
    fn test_policy_drops_empty_entries() {
        let policy = ScanPolicy::new([".PNG", ""], ["", "tmp"]);
        assert_eq!(policy.include_extensions, vec!["png".to_string()]);
        assert_eq!(policy.exclude_prefixes, vec!["tmp".to_string()]);
    }
}
