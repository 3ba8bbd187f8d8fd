use crate::types::StoragePath;
use std::io::Write;
use std::path::{Path, PathBuf};

pub mod error {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum BinaryStoreError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("File name is not valid UTF-8")]
        NonUtf8FileName,

        #[error("Invalid storage path: {0}")]
        InvalidPath(#[from] crate::types::StoragePathError),

        #[error("Binary store unavailable: {0}")]
        Unavailable(String),
    }
}

use error::BinaryStoreError;

/// Write/delete access to image bytes under logical paths.
pub trait BinaryStore: Send + Sync {
    /// Stores `bytes` at `path`, replacing anything already there, and
    /// returns the path the bytes can be found under.
    fn put(&self, bytes: &[u8], path: &StoragePath) -> Result<StoragePath, BinaryStoreError>;

    /// Deletes the blob at `path`. A missing blob is not an error.
    /// Directories are left in place.
    fn delete(&self, path: &StoragePath) -> Result<(), BinaryStoreError>;

    /// Lists the blobs stored directly under `directory`.
    fn list(&self, directory: &str) -> Result<Vec<StoragePath>, BinaryStoreError>;
}

/// Binary store rooted at a local directory.
pub struct FsBinaryStore {
    pub root: PathBuf,
}

/// In-flight writes are staged under a dot-prefixed name next to the target.
fn staging_path(dest: &Path) -> PathBuf {
    let file_name = dest
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{file_name}.tmp"))
}

impl FsBinaryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn file_path(&self, path: &StoragePath) -> PathBuf {
        path.as_str()
            .split('/')
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    fn directory_path(&self, directory: &str) -> PathBuf {
        directory
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }
}

impl BinaryStore for FsBinaryStore {
    fn put(&self, bytes: &[u8], path: &StoragePath) -> Result<StoragePath, BinaryStoreError> {
        let dest_path = self.file_path(path);
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write to a staging file and rename, so readers never see a partial image
        let staging = staging_path(&dest_path);
        {
            let mut file = std::fs::File::create(&staging)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        if let Err(err) = std::fs::rename(&staging, &dest_path) {
            let _ = std::fs::remove_file(&staging);
            return Err(err.into());
        }

        Ok(path.clone())
    }

    fn delete(&self, path: &StoragePath) -> Result<(), BinaryStoreError> {
        // Directories are shared by every parent's blobs and are never pruned
        match std::fs::remove_file(self.file_path(path)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn list(&self, directory: &str) -> Result<Vec<StoragePath>, BinaryStoreError> {
        let dir_path = self.directory_path(directory);
        if !dir_path.exists() {
            return Ok(Vec::new());
        }

        let directory = directory.trim_matches('/');
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&dir_path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let name = entry
                .file_name()
                .into_string()
                .map_err(|_| BinaryStoreError::NonUtf8FileName)?;
            if name.starts_with('.') {
                continue;
            }

            let logical = if directory.is_empty() {
                name
            } else {
                format!("{directory}/{name}")
            };
            paths.push(StoragePath::try_new(logical)?);
        }

        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests;
