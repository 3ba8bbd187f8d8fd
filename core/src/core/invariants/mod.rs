//! Post-condition checks over one parent's photo set.
//!
//! Pure functions: they report violations and never repair them. The only
//! repair the engine performs is the cover fallback at the end of a sync.

use crate::types::{ParentId, Photo, PhotoId};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("photo {photo} belongs to parent {found}, expected {expected}")]
    ForeignPhoto {
        photo: PhotoId,
        expected: ParentId,
        found: ParentId,
    },

    #[error("parent {parent} has {count} cover photos")]
    MultipleCovers { parent: ParentId, count: usize },

    #[error("parent {parent} has photos but no cover")]
    MissingCover { parent: ParentId },

    #[error("photo {photo} of parent {parent} is out of (order, id) sequence")]
    OutOfOrder { parent: ParentId, photo: PhotoId },

    #[error("photo {photo} of parent {parent} is listed twice")]
    DuplicatePhoto { parent: ParentId, photo: PhotoId },

    #[error("photos of parent {parent} share storage path {path}")]
    SharedStoragePath { parent: ParentId, path: String },
}

/// Checks a parent's photo set, given in display order.
///
/// - every photo belongs to `parent`
/// - at most one photo is cover, and exactly one when the set is non-empty
/// - photos are sorted by `order`, equal orders by id (insertion order)
/// - ids and storage paths are unique
pub fn check(parent: ParentId, photos: &[Photo]) -> Result<(), InvariantViolation> {
    let mut ids = HashSet::new();
    let mut paths = HashSet::new();

    for photo in photos {
        if photo.parent_id != parent {
            return Err(InvariantViolation::ForeignPhoto {
                photo: photo.id,
                expected: parent,
                found: photo.parent_id,
            });
        }
        if !ids.insert(photo.id) {
            return Err(InvariantViolation::DuplicatePhoto {
                parent,
                photo: photo.id,
            });
        }
        if !paths.insert(photo.storage_path.as_str()) {
            return Err(InvariantViolation::SharedStoragePath {
                parent,
                path: photo.storage_path.to_string(),
            });
        }
    }

    if let Some(pair) = photos
        .windows(2)
        .find(|pair| (pair[0].order, pair[0].id) > (pair[1].order, pair[1].id))
    {
        return Err(InvariantViolation::OutOfOrder {
            parent,
            photo: pair[1].id,
        });
    }

    match photos.iter().filter(|photo| photo.is_cover).count() {
        0 if !photos.is_empty() => Err(InvariantViolation::MissingCover { parent }),
        0 | 1 => Ok(()),
        count => Err(InvariantViolation::MultipleCovers { parent, count }),
    }
}

pub fn holds(parent: ParentId, photos: &[Photo]) -> bool {
    check(parent, photos).is_ok()
}

#[cfg(test)]
mod tests;
