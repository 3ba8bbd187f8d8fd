mod app;
mod core;
mod sync;

pub use app::{
    AppConfig, AppConfigError, OptimizerConfig, OutputFormat, StorageConfig, SyncConfig,
    UploadsConfig,
};
pub use self::core::Config;
pub use self::sync::{SyncSettings, UploadLimits};
