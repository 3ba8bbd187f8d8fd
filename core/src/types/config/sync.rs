use super::{AppConfig, UploadsConfig};

/// Upload limits enforced on every incoming request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_photos: usize,
    pub max_upload_bytes: u64,
}

impl From<&UploadsConfig> for UploadLimits {
    fn from(config: &UploadsConfig) -> Self {
        Self {
            max_photos: config.max_photos,
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Engine settings resolved from the user-facing config.
#[derive(Clone, Debug)]
pub struct SyncSettings {
    /// Directory (inside the binary store) new photos are written under.
    pub directory: String,
    pub limits: UploadLimits,
    pub parallel_uploads: bool,
    pub check_invariants: bool,
}

impl From<&AppConfig> for SyncSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            directory: config.storage.directory.clone(),
            limits: UploadLimits::from(&config.uploads),
            parallel_uploads: config.sync.parallel_uploads,
            check_invariants: config.sync.check_invariants,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}
