use crate::types::StoragePath;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// User-facing configuration, persisted as config.toml.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl AppConfig {
    /// Returns the config file path within the given data directory.
    pub fn path(data_dir: &Path) -> std::path::PathBuf {
        data_dir.join("config.toml")
    }

    /// Loads config from a TOML file. Returns default config if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, AppConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), AppConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates config values and returns list of validation errors.
    /// Returns empty vec if config is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.storage.is_valid_directory() {
            errors.push(format!(
                "storage.directory {:?} must be a relative path without '.' or '..' segments",
                self.storage.directory
            ));
        }

        if self.optimizer.max_dimension == 0 {
            errors.push("optimizer.max_dimension must be at least 1".to_string());
        }

        if !(1..=100).contains(&self.optimizer.quality) {
            errors.push("optimizer.quality must be between 1 and 100".to_string());
        }

        if self.uploads.max_photos == 0 {
            errors.push("uploads.max_photos must be at least 1".to_string());
        }

        if self.uploads.max_upload_bytes == 0 {
            errors.push("uploads.max_upload_bytes must be at least 1".to_string());
        }

        errors
    }

    /// Returns a validated config, replacing invalid values with defaults.
    pub fn with_defaults_for_invalid(&self) -> Self {
        let defaults = Self::default();
        Self {
            storage: if self.storage.is_valid_directory() {
                self.storage.clone()
            } else {
                defaults.storage
            },
            optimizer: OptimizerConfig {
                max_dimension: if self.optimizer.max_dimension == 0 {
                    defaults.optimizer.max_dimension
                } else {
                    self.optimizer.max_dimension
                },
                quality: if (1..=100).contains(&self.optimizer.quality) {
                    self.optimizer.quality
                } else {
                    defaults.optimizer.quality
                },
                format: self.optimizer.format,
            },
            uploads: UploadsConfig {
                max_photos: if self.uploads.max_photos == 0 {
                    defaults.uploads.max_photos
                } else {
                    self.uploads.max_photos
                },
                max_upload_bytes: if self.uploads.max_upload_bytes == 0 {
                    defaults.uploads.max_upload_bytes
                } else {
                    self.uploads.max_upload_bytes
                },
            },
            sync: self.sync.clone(),
        }
    }
}

/// Where optimized photos are written inside the binary store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_directory")]
    pub directory: String,
}

impl StorageConfig {
    fn is_valid_directory(&self) -> bool {
        let directory = self.directory.trim_matches('/');
        directory.is_empty() || StoragePath::try_from(directory).is_ok()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
        }
    }
}

fn default_directory() -> String {
    "posts".to_string()
}

/// Downsampling and re-encoding policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Longest side, in pixels, of a stored photo.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    /// Encoder quality, honoured by lossy formats only.
    #[serde(default = "default_quality")]
    pub quality: u8,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            quality: default_quality(),
            format: OutputFormat::default(),
        }
    }
}

fn default_max_dimension() -> u32 {
    1920
}

fn default_quality() -> u8 {
    85
}

/// Encoding of stored photos.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Webp,
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Webp => write!(f, "webp"),
            OutputFormat::Jpeg => write!(f, "jpeg"),
            OutputFormat::Png => write!(f, "png"),
        }
    }
}

/// Per-request upload limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadsConfig {
    #[serde(default = "default_max_photos")]
    pub max_photos: usize,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_photos: default_max_photos(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_max_photos() -> usize {
    10
}

fn default_max_upload_bytes() -> u64 {
    5 * 1024 * 1024
}

/// Engine behaviour toggles.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Optimize and store the uploads of one call on separate threads.
    #[serde(default)]
    pub parallel_uploads: bool,
    /// Re-read and check the parent's photos after every successful call.
    #[serde(default = "default_true")]
    pub check_invariants: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            parallel_uploads: false,
            check_invariants: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Errors that can occur when loading or saving config.
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
