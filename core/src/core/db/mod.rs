//! Photo record store on redb.
//!
//! This module handles all redb operations including:
//! - Photo rows (PhotoId → VersionedPhoto)
//! - The `(parent, order, id)` index used for ordered retrieval
//! - The `parent → cover` index that makes "at most one cover" structural
//! - Metadata storage (JSON strings)

use crate::core::db::error::DatabaseError;
use crate::types::metadata::SequenceMetadata;
use crate::types::photo::versioned_photo::VersionedPhoto;
use crate::types::photo::versioned_photo::latest_photo::PhotoRecord;
use crate::types::{Config, NewPhoto, ParentId, Photo, PhotoId, StoragePath};
use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use std::collections::HashSet;

pub mod error {
    use crate::types::{ParentId, PhotoId};
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum DatabaseError {
        #[error("Database error: {0}")]
        Redb(#[from] redb::DatabaseError),

        #[error("Table error: {0}")]
        TableError(#[from] redb::TableError),

        #[error("Storage error: {0}")]
        StorageError(#[from] redb::StorageError),

        #[error("Transaction error: {0}")]
        TransactionError(#[from] redb::TransactionError),

        #[error("Commit error: {0}")]
        CommitError(#[from] redb::CommitError),

        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Metadata error: {0}")]
        Metadata(#[from] serde_json::Error),

        #[error("Photo not found: {0}")]
        NotFound(PhotoId),

        #[error("Parent {parent} already has cover photo {cover}")]
        CoverAlreadySet { parent: ParentId, cover: PhotoId },

        #[error("Index entry for photo {0} has no row")]
        DanglingIndexEntry(PhotoId),
    }
}

/// `(parent, order, photo)`; iteration yields a parent's photos by order,
/// ties resolved by id, i.e. by insertion.
type OrderKey = (u64, u32, u64);

/// Main table: PhotoId → VersionedPhoto
const PHOTOS_TABLE: TableDefinition<PhotoId, VersionedPhoto> = TableDefinition::new("photos");

/// Ordering index: (parent, order, photo) → ()
const ORDER_INDEX: TableDefinition<OrderKey, ()> = TableDefinition::new("photos_by_parent");

/// Cover index: parent → cover photo
const COVER_INDEX: TableDefinition<ParentId, PhotoId> = TableDefinition::new("covers");

/// Metadata table: &str → JSON string
const METADATA_TABLE: TableDefinition<&str, &str> = TableDefinition::new("metadata");

/// Metadata key for photo id allocation.
const METADATA_KEY_SEQUENCE: &str = "sequence";

fn order_key(parent: ParentId, order: u32, id: PhotoId) -> OrderKey {
    (parent.into_inner(), order, id.into_inner())
}

fn parent_range(parent: ParentId) -> std::ops::RangeInclusive<OrderKey> {
    let parent = parent.into_inner();
    (parent, 0, 0)..=(parent, u32::MAX, u64::MAX)
}

fn load_parent<I, P>(index: &I, photos: &P, parent: ParentId) -> Result<Vec<Photo>, DatabaseError>
where
    I: ReadableTable<OrderKey, ()>,
    P: ReadableTable<PhotoId, VersionedPhoto>,
{
    let mut result = Vec::new();
    for entry in index.range(parent_range(parent))? {
        let (key, _) = entry?;
        let (_, _, raw_id) = key.value();
        let id = PhotoId::new(raw_id);
        let record = photos
            .get(id)?
            .map(|guard| guard.value().into_latest())
            .ok_or(DatabaseError::DanglingIndexEntry(id))?;
        result.push(Photo::from_record(id, record));
    }
    Ok(result)
}

fn load_photo<P>(photos: &P, id: PhotoId) -> Result<Option<Photo>, DatabaseError>
where
    P: ReadableTable<PhotoId, VersionedPhoto>,
{
    Ok(photos
        .get(id)?
        .map(|guard| Photo::from_record(id, guard.value().into_latest())))
}

/// Read side of the record store. Each call runs in its own read transaction.
pub struct PhotoStore {
    db: redb::Database,
}

impl PhotoStore {
    /// Creates or opens a database using paths from the config.
    pub fn open(config: &Config) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(&config.base_path)?;

        let db = redb::Database::create(config.db_path())?;

        // Initialize tables
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PHOTOS_TABLE)?;
            let _ = write_txn.open_table(ORDER_INDEX)?;
            let _ = write_txn.open_table(COVER_INDEX)?;
            let _ = write_txn.open_table(METADATA_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Starts a write transaction. redb admits one writer at a time; the
    /// writer's changes become visible together on [`PhotoWriter::commit`].
    pub fn begin_write(&self) -> Result<PhotoWriter, DatabaseError> {
        Ok(PhotoWriter {
            txn: self.db.begin_write()?,
        })
    }
}

/// Read operations.
impl PhotoStore {
    pub fn get(&self, id: PhotoId) -> Result<Option<Photo>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let photos = read_txn.open_table(PHOTOS_TABLE)?;
        load_photo(&photos, id)
    }

    /// Returns a parent's photos in display order.
    pub fn photos(&self, parent: ParentId) -> Result<Vec<Photo>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ORDER_INDEX)?;
        let photos = read_txn.open_table(PHOTOS_TABLE)?;
        load_parent(&index, &photos, parent)
    }

    pub fn cover(&self, parent: ParentId) -> Result<Option<Photo>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let covers = read_txn.open_table(COVER_INDEX)?;
        let Some(id) = covers.get(parent)?.map(|guard| guard.value()) else {
            return Ok(None);
        };
        let photos = read_txn.open_table(PHOTOS_TABLE)?;
        load_photo(&photos, id)
    }

    /// Every storage path referenced by any photo row.
    pub fn all_storage_paths(&self) -> Result<HashSet<StoragePath>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let photos = read_txn.open_table(PHOTOS_TABLE)?;

        let mut paths = HashSet::new();
        for entry in photos.iter()? {
            let (_, record) = entry?;
            paths.insert(record.value().into_latest().storage_path);
        }
        Ok(paths)
    }
}

/// Write side of the record store: one redb write transaction.
///
/// Dropping a writer without committing discards every change made through it.
pub struct PhotoWriter {
    txn: redb::WriteTransaction,
}

/// Read operations inside the transaction.
impl PhotoWriter {
    pub fn get(&self, id: PhotoId) -> Result<Option<Photo>, DatabaseError> {
        let photos = self.txn.open_table(PHOTOS_TABLE)?;
        load_photo(&photos, id)
    }

    /// Returns a parent's photos in display order, including uncommitted changes.
    pub fn photos(&self, parent: ParentId) -> Result<Vec<Photo>, DatabaseError> {
        let index = self.txn.open_table(ORDER_INDEX)?;
        let photos = self.txn.open_table(PHOTOS_TABLE)?;
        load_parent(&index, &photos, parent)
    }

    pub fn cover_id(&self, parent: ParentId) -> Result<Option<PhotoId>, DatabaseError> {
        let covers = self.txn.open_table(COVER_INDEX)?;
        Ok(covers.get(parent)?.map(|guard| guard.value()))
    }
}

/// Mutations.
impl PhotoWriter {
    /// Inserts a photo under `parent` with a freshly allocated id.
    ///
    /// Returns `Err(CoverAlreadySet)` if `new.is_cover` and the parent already has a cover.
    pub fn insert(&mut self, parent: ParentId, new: NewPhoto) -> Result<Photo, DatabaseError> {
        if new.is_cover {
            self.ensure_no_other_cover(parent, None)?;
        }

        let id = self.allocate_id()?;
        let photo = Photo {
            id,
            parent_id: parent,
            storage_path: new.storage_path,
            is_cover: new.is_cover,
            order: new.order,
        };

        self.write_row(&photo)?;
        {
            let mut index = self.txn.open_table(ORDER_INDEX)?;
            index.insert(order_key(parent, photo.order, id), ())?;
        }
        if photo.is_cover {
            let mut covers = self.txn.open_table(COVER_INDEX)?;
            covers.insert(parent, id)?;
        }

        Ok(photo)
    }

    /// Removes a photo row and its index entries.
    ///
    /// Returns `Err(NotFound)` if the photo doesn't exist.
    pub fn remove(&mut self, id: PhotoId) -> Result<Photo, DatabaseError> {
        let photo = {
            let mut photos = self.txn.open_table(PHOTOS_TABLE)?;
            photos
                .remove(id)?
                .map(|guard| Photo::from_record(id, guard.value().into_latest()))
                .ok_or(DatabaseError::NotFound(id))?
        };

        {
            let mut index = self.txn.open_table(ORDER_INDEX)?;
            index.remove(order_key(photo.parent_id, photo.order, id))?;
        }
        if photo.is_cover {
            let mut covers = self.txn.open_table(COVER_INDEX)?;
            covers.remove(photo.parent_id)?;
        }

        Ok(photo)
    }

    /// Removes every photo of `parent`, returning the removed rows in display order.
    pub fn remove_all(&mut self, parent: ParentId) -> Result<Vec<Photo>, DatabaseError> {
        let photos = self.photos(parent)?;
        for photo in &photos {
            self.remove(photo.id)?;
        }
        Ok(photos)
    }

    /// Clears `is_cover` on every photo of `parent`.
    pub fn clear_covers(&mut self, parent: ParentId) -> Result<(), DatabaseError> {
        for mut photo in self.photos(parent)? {
            if photo.is_cover {
                photo.is_cover = false;
                self.write_row(&photo)?;
            }
        }

        let mut covers = self.txn.open_table(COVER_INDEX)?;
        covers.remove(parent)?;
        Ok(())
    }

    /// Marks a photo as its parent's cover.
    ///
    /// Returns `Err(NotFound)` if the photo doesn't exist.
    /// Returns `Err(CoverAlreadySet)` if a different photo of the parent is the cover.
    pub fn set_cover(&mut self, id: PhotoId) -> Result<Photo, DatabaseError> {
        let mut photo = self.get(id)?.ok_or(DatabaseError::NotFound(id))?;
        if photo.is_cover {
            return Ok(photo);
        }

        self.ensure_no_other_cover(photo.parent_id, Some(id))?;

        photo.is_cover = true;
        self.write_row(&photo)?;

        let mut covers = self.txn.open_table(COVER_INDEX)?;
        covers.insert(photo.parent_id, id)?;
        Ok(photo)
    }

    /// Moves a photo to a new display position.
    ///
    /// Returns `Err(NotFound)` if the photo doesn't exist.
    pub fn set_order(&mut self, id: PhotoId, order: u32) -> Result<Photo, DatabaseError> {
        let mut photo = self.get(id)?.ok_or(DatabaseError::NotFound(id))?;
        if photo.order == order {
            return Ok(photo);
        }

        {
            let mut index = self.txn.open_table(ORDER_INDEX)?;
            index.remove(order_key(photo.parent_id, photo.order, id))?;
            index.insert(order_key(photo.parent_id, order, id), ())?;
        }

        photo.order = order;
        self.write_row(&photo)?;
        Ok(photo)
    }

    pub fn commit(self) -> Result<(), DatabaseError> {
        self.txn.commit()?;
        Ok(())
    }
}

/// Internal helpers.
impl PhotoWriter {
    fn write_row(&mut self, photo: &Photo) -> Result<(), DatabaseError> {
        let record: PhotoRecord = photo.to_record();
        let mut photos = self.txn.open_table(PHOTOS_TABLE)?;
        photos.insert(photo.id, &VersionedPhoto::V1(record))?;
        Ok(())
    }

    fn ensure_no_other_cover(
        &self,
        parent: ParentId,
        candidate: Option<PhotoId>,
    ) -> Result<(), DatabaseError> {
        match self.cover_id(parent)? {
            Some(cover) if Some(cover) != candidate => {
                Err(DatabaseError::CoverAlreadySet { parent, cover })
            }
            _ => Ok(()),
        }
    }

    /// Writes a cover index entry without touching any photo row.
    #[cfg(test)]
    pub(crate) fn write_cover_entry(
        &mut self,
        parent: ParentId,
        cover: PhotoId,
    ) -> Result<(), DatabaseError> {
        let mut covers = self.txn.open_table(COVER_INDEX)?;
        covers.insert(parent, cover)?;
        Ok(())
    }

    /// Writes an ordering index entry without a matching photo row.
    #[cfg(test)]
    pub(crate) fn write_order_entry(
        &mut self,
        parent: ParentId,
        order: u32,
        id: PhotoId,
    ) -> Result<(), DatabaseError> {
        let mut index = self.txn.open_table(ORDER_INDEX)?;
        index.insert(order_key(parent, order, id), ())?;
        Ok(())
    }

    fn allocate_id(&mut self) -> Result<PhotoId, DatabaseError> {
        let mut table = self.txn.open_table(METADATA_TABLE)?;

        let mut sequence = match table.get(METADATA_KEY_SEQUENCE)? {
            Some(guard) => serde_json::from_str::<SequenceMetadata>(guard.value())?,
            None => SequenceMetadata::default(),
        };

        let id = PhotoId::new(sequence.next_photo_id);
        sequence.next_photo_id += 1;

        let json = serde_json::to_string(&sequence)?;
        table.insert(METADATA_KEY_SEQUENCE, json.as_str())?;
        Ok(id)
    }
}
