//! Public photo types for consumers.
//!
//! The persisted form lives in `versioned_photo`; `Photo` adds the row id.

use crate::types::{ParentId, PhotoId, StoragePath};

pub(crate) mod versioned_photo;

use versioned_photo::latest_photo;

/// One stored image attached to a parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub id: PhotoId,
    pub parent_id: ParentId,
    pub storage_path: StoragePath,
    pub is_cover: bool,
    pub order: u32,
}

impl Photo {
    pub(crate) fn from_record(id: PhotoId, record: latest_photo::PhotoRecord) -> Self {
        Self {
            id,
            parent_id: record.parent_id,
            storage_path: record.storage_path,
            is_cover: record.is_cover,
            order: record.order,
        }
    }

    pub(crate) fn to_record(&self) -> latest_photo::PhotoRecord {
        latest_photo::PhotoRecord {
            parent_id: self.parent_id,
            storage_path: self.storage_path.clone(),
            is_cover: self.is_cover,
            order: self.order,
        }
    }
}

/// Attributes of a photo about to be inserted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub storage_path: StoragePath,
    pub is_cover: bool,
    pub order: u32,
}
