//! Caller-submitted input for attach and sync calls.

use crate::types::{PhotoId, UploadLimits};
use std::collections::BTreeSet;

pub mod error {
    use crate::types::PhotoId;
    use thiserror::Error;

    #[derive(Debug, Error, PartialEq, Eq)]
    pub enum ValidationError {
        #[error("too many uploads: {count} exceeds {max}")]
        TooManyUploads { count: usize, max: usize },

        #[error("upload {index} is empty")]
        EmptyUpload { index: usize },

        #[error("upload {index} too large: {size} bytes exceeds {max} bytes")]
        UploadTooLarge { index: usize, size: u64, max: u64 },

        #[error("cover index {index} out of range for {count} uploads")]
        CoverIndexOutOfRange { index: usize, count: usize },

        #[error("cover photo {0} is not among the kept photos")]
        CoverNotKept(PhotoId),

        #[error("uploads {first} and {second} are both marked as cover")]
        MultipleCoverUploads { first: usize, second: usize },
    }
}

use error::ValidationError;

/// One raw image submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub is_cover: bool,
}

impl Upload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            is_cover: false,
        }
    }

    /// An upload that should become the parent's cover photo.
    pub fn cover(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            is_cover: true,
        }
    }
}

/// The desired photo set of a parent after an update.
///
/// Every existing photo not listed in `keep_ids` is removed; `incoming` is
/// appended after the kept photos in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    pub keep_ids: BTreeSet<PhotoId>,
    pub new_cover_id: Option<PhotoId>,
    pub incoming: Vec<Upload>,
}

impl DesiredState {
    pub fn keep(ids: impl IntoIterator<Item = PhotoId>) -> Self {
        Self {
            keep_ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_cover(mut self, id: PhotoId) -> Self {
        self.new_cover_id = Some(id);
        self
    }

    pub fn with_upload(mut self, upload: Upload) -> Self {
        self.incoming.push(upload);
        self
    }

    /// Checks the shape of the request against `limits`. Does not look at
    /// stored state.
    pub fn validate(&self, limits: &UploadLimits) -> Result<(), ValidationError> {
        check_sizes(self.incoming.iter().map(|u| u.bytes.as_slice()), limits)?;

        if let Some(cover_id) = self.new_cover_id
            && !self.keep_ids.contains(&cover_id)
        {
            return Err(ValidationError::CoverNotKept(cover_id));
        }

        let mut marked = self
            .incoming
            .iter()
            .enumerate()
            .filter(|(_, upload)| upload.is_cover)
            .map(|(index, _)| index);
        if let (Some(first), Some(second)) = (marked.next(), marked.next()) {
            return Err(ValidationError::MultipleCoverUploads { first, second });
        }

        Ok(())
    }
}

/// Validates a create-time upload list and its designated cover index.
///
/// An empty list is valid regardless of `cover_index`.
pub fn validate_uploads<B: AsRef<[u8]>>(
    uploads: &[B],
    cover_index: usize,
    limits: &UploadLimits,
) -> Result<(), ValidationError> {
    check_sizes(uploads.iter().map(|upload| upload.as_ref()), limits)?;

    if !uploads.is_empty() && cover_index >= uploads.len() {
        return Err(ValidationError::CoverIndexOutOfRange {
            index: cover_index,
            count: uploads.len(),
        });
    }
    Ok(())
}

fn check_sizes<'a>(
    uploads: impl ExactSizeIterator<Item = &'a [u8]>,
    limits: &UploadLimits,
) -> Result<(), ValidationError> {
    if uploads.len() > limits.max_photos {
        return Err(ValidationError::TooManyUploads {
            count: uploads.len(),
            max: limits.max_photos,
        });
    }

    for (index, bytes) in uploads.enumerate() {
        let size = bytes.len() as u64;
        if size == 0 {
            return Err(ValidationError::EmptyUpload { index });
        }
        if size > limits.max_upload_bytes {
            return Err(ValidationError::UploadTooLarge {
                index,
                size,
                max: limits.max_upload_bytes,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
