use std::path::PathBuf;

/// Core configuration for GalleryCore initialization.
#[derive(Clone)]
pub struct Config {
    pub base_path: PathBuf,
}

impl Config {
    pub fn db_path(&self) -> PathBuf {
        self.base_path.join("gallery.redb")
    }

    pub fn blobs_path(&self) -> PathBuf {
        self.base_path.join("blobs")
    }
}
