//! Optional TOML settings file for the CLI.
//!
//! Every key is optional; command-line flags override whatever is set here.
//!
//! ```toml
//! drive = "Backup Disk"
//! media_root = "/run/media"
//! zip = true
//! compression_level = 9
//! hash_threads = 4
//! extensions = ["jpg", "png", "pdf"]
//! exclude = [".cache", "Downloads"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result};
use serde::Deserialize;

use driveback_core::{ScanPolicy, DEFAULT_EXCLUDE_PREFIXES, DEFAULT_EXTENSIONS};

/// Drive label used when neither the CLI nor the settings name one.
pub const DEFAULT_DRIVE: &str = "New Volume";

/// Parent of per-user removable media mount points.
pub const DEFAULT_MEDIA_ROOT: &str = "/media";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub drive: Option<String>,
    pub media_root: Option<PathBuf>,
    pub zip: Option<bool>,
    pub compression_level: Option<u32>,
    pub hash_threads: Option<usize>,
    pub extensions: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

impl Settings {
    /// Load settings from `explicit`, or from the default location.
    ///
    /// A missing default file yields empty settings; a missing explicit
    /// file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn drive(&self) -> &str {
        self.drive.as_deref().unwrap_or(DEFAULT_DRIVE)
    }

    pub fn media_root(&self) -> PathBuf {
        self.media_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_ROOT))
    }

    /// Scan policy with any configured list replacing its default.
    pub fn policy(&self) -> ScanPolicy {
        let extensions: Vec<String> = match &self.extensions {
            Some(list) => list.clone(),
            None => DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        };
        let exclude: Vec<String> = match &self.exclude {
            Some(list) => list.clone(),
            None => DEFAULT_EXCLUDE_PREFIXES.iter().map(|s| s.to_string()).collect(),
        };
        ScanPolicy::new(extensions, exclude)
    }
}

/// `<config_dir>/driveback/config.toml`, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("driveback").join("config.toml"))
}
