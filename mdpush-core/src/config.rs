//! Configuration management for mdpush

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::edit::MissingImagePolicy;
use crate::import::ImportOptions;
use crate::publish::{DEFAULT_CLEANUP_TIMEOUT, DEFAULT_MAX_IMAGE_BYTES};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub import: ImportConfig,
    pub google: GoogleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub missing_images: MissingImagePolicy,
    pub keep_uploads: bool,
    pub cleanup_timeout_secs: u64,
    pub max_image_bytes: u64,
    pub trace_edits: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub docs_endpoint: String,
    pub drive_endpoint: String,
    pub upload_endpoint: String,
    /// Environment variable holding the OAuth access token
    pub token_env: String,
    pub request_timeout_secs: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            missing_images: MissingImagePolicy::Skip,
            keep_uploads: false,
            cleanup_timeout_secs: DEFAULT_CLEANUP_TIMEOUT.as_secs(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            trace_edits: false,
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            docs_endpoint: "https://docs.googleapis.com/v1".to_string(),
            drive_endpoint: "https://www.googleapis.com/drive/v3".to_string(),
            upload_endpoint: "https://www.googleapis.com/upload/drive/v3".to_string(),
            token_env: "MDPUSH_ACCESS_TOKEN".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ImportConfig {
    /// Engine options for this section
    pub fn options(&self) -> ImportOptions {
        ImportOptions {
            missing_images: self.missing_images,
            keep_uploads: self.keep_uploads,
            cleanup_timeout: Duration::from_secs(self.cleanup_timeout_secs),
            max_image_bytes: self.max_image_bytes,
            trace_edits: self.trace_edits,
        }
    }
}

impl Config {
    /// Get the platform-specific config file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "mdpush")
            .map(|proj_dirs| proj_dirs.config_dir().join("mdpush.toml"))
    }

    /// Load configuration from the platform path, falling back to defaults if missing
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        // Check config file permissions (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat config file: {}", path.display()))?;
            let perms = metadata.permissions();
            if perms.mode() & 0o002 != 0 {
                anyhow::bail!(
                    "Config file {} is world-writable (insecure permissions)",
                    path.display()
                );
            }
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Engine options from the `[import]` section
    pub fn import_options(&self) -> ImportOptions {
        self.import.options()
    }
}
