//! Error types for backup runs.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a backup run.
///
/// Policy outcomes (a disallowed extension, an excluded directory) are not
/// errors and never appear here.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The destination drive is not mounted where expected.
    #[error("Backup drive not found at {path}")]
    BackupRootMissing { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted manifest exists but is not a valid digest map.
    #[error("Corrupt manifest at {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The archive writer failed.
    #[error("Failed to write archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl BackupError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an archive error for the archive at `path`.
    pub fn archive(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Archive {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Whether the run failed before touching anything.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::BackupRootMissing { .. })
    }
}

/// Result alias used across the driveback crates.
pub type Result<T> = std::result::Result<T, BackupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_error_io() {
        let err = BackupError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, BackupError::PermissionDenied { .. }));

        let err = BackupError::io("/test/path", std::io::Error::other("disk full"));
        assert!(matches!(err, BackupError::Io { .. }));
    }

    #[test]
    fn test_root_missing_message() {
        let err = BackupError::BackupRootMissing {
            path: PathBuf::from("/media/ana/New Volume"),
        };
        assert!(err.is_precondition());
        assert_eq!(err.to_string(), "Backup drive not found at /media/ana/New Volume");
    }
}
