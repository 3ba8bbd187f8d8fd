pub(crate) mod config;
pub use config::{
    AppConfig, AppConfigError, Config, OptimizerConfig, OutputFormat, StorageConfig, SyncConfig,
    SyncSettings, UploadLimits, UploadsConfig,
};

pub(crate) mod ids;
pub use ids::{ParentId, PhotoId};

pub(crate) mod storage_path;
pub use storage_path::{MAX_STORAGE_PATH_LENGTH, StoragePath, StoragePathError};

pub(crate) mod photo;
pub use photo::{NewPhoto, Photo};

pub(crate) mod desired_state;
pub use desired_state::error::ValidationError;
pub use desired_state::{DesiredState, Upload, validate_uploads};

pub(crate) mod metadata;
