//! Core types for driveback.
//!
//! This crate provides the data model shared by the backup pipeline:
//! scan candidates, content digests, run configuration, the on-drive
//! layout of a backup root, and the error type every stage reports.

mod candidate;
mod config;
mod digest;
mod error;
mod layout;

pub use candidate::{relative_key, Candidate};
pub use config::{
    BackupConfig, BackupConfigBuilder, BackupConfigBuilderError, ScanPolicy,
    DEFAULT_COMPRESSION_LEVEL, DEFAULT_EXCLUDE_PREFIXES, DEFAULT_EXTENSIONS,
};
pub use digest::{ContentDigest, ParseDigestError};
pub use error::{BackupError, Result};
pub use layout::{BackupLayout, ARCHIVE_DIR, MANIFEST_FILE, STAGING_DIR};
