//! Photo sync engine combining the record store, binary store and optimizer.

use crate::core::db::error::DatabaseError;
use crate::core::db::{PhotoStore, PhotoWriter};
use crate::core::locks::ParentLocks;
use crate::types::{
    AppConfig, Config, DesiredState, NewPhoto, ParentId, Photo, PhotoId, StoragePath,
    SyncSettings, validate_uploads,
};
use error::{GalleryError, SyncStep};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

pub mod db;
pub mod file_storage;
pub mod invariants;
mod locks;
pub mod optimizer;

pub use file_storage::{BinaryStore, FsBinaryStore};
pub use invariants::InvariantViolation;
pub use optimizer::{ImageOptimizer, OptimizedImage, ResizingOptimizer};

pub mod error {
    use super::*;
    use crate::core::file_storage::error::BinaryStoreError;
    use crate::core::optimizer::error::OptimizeError;
    use crate::types::{StoragePathError, ValidationError};
    use std::fmt;
    use thiserror::Error;

    /// The point of a call at which the record store failed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SyncStep {
        Read,
        Removal,
        CoverReset,
        CoverAssignment,
        Renumber,
        Addition,
        Repair,
        Commit,
    }

    impl fmt::Display for SyncStep {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                SyncStep::Read => write!(f, "read"),
                SyncStep::Removal => write!(f, "removal"),
                SyncStep::CoverReset => write!(f, "cover reset"),
                SyncStep::CoverAssignment => write!(f, "cover assignment"),
                SyncStep::Renumber => write!(f, "renumbering"),
                SyncStep::Addition => write!(f, "addition"),
                SyncStep::Repair => write!(f, "cover repair"),
                SyncStep::Commit => write!(f, "commit"),
            }
        }
    }

    #[derive(Debug, Error)]
    pub enum GalleryError {
        #[error("Database error: {0}")]
        Database(#[from] DatabaseError),

        #[error("Record store failed during {step}: {source}")]
        RecordStore {
            step: SyncStep,
            source: DatabaseError,
        },

        #[error("Optimizing upload {index} failed: {source}")]
        Optimize { index: usize, source: OptimizeError },

        #[error("Storing upload {index} failed: {source}")]
        StoreWrite {
            index: usize,
            source: BinaryStoreError,
        },

        #[error("Binary store error: {0}")]
        BinaryStore(#[from] BinaryStoreError),

        #[error("Invalid request: {0}")]
        Validation(#[from] ValidationError),

        #[error("Invalid storage path: {0}")]
        InvalidStoragePath(#[from] StoragePathError),

        #[error("Parent {0} already has photos")]
        ParentNotEmpty(ParentId),

        #[error("Parent {0} is busy with another call")]
        ParentBusy(ParentId),

        #[error("Invariant violated: {0}")]
        InvariantViolation(#[from] InvariantViolation),
    }

    impl GalleryError {
        /// The step that failed, for failures raised inside an attach or sync.
        pub fn step(&self) -> Option<SyncStep> {
            match self {
                GalleryError::RecordStore { step, .. } => Some(*step),
                GalleryError::Optimize { .. } | GalleryError::StoreWrite { .. } => {
                    Some(SyncStep::Addition)
                }
                _ => None,
            }
        }

        /// Index of the first upload that was not added. Uploads before it
        /// were committed; it and every later upload were not.
        pub fn upload_index(&self) -> Option<usize> {
            match self {
                GalleryError::Optimize { index, .. } | GalleryError::StoreWrite { index, .. } => {
                    Some(*index)
                }
                _ => None,
            }
        }
    }
}

/// A record store failure tagged with the step it happened in.
struct StepFailure {
    step: SyncStep,
    source: DatabaseError,
}

impl From<StepFailure> for GalleryError {
    fn from(failure: StepFailure) -> Self {
        GalleryError::RecordStore {
            step: failure.step,
            source: failure.source,
        }
    }
}

trait AtStep<T> {
    fn at(self, step: SyncStep) -> Result<T, StepFailure>;
}

impl<T> AtStep<T> for Result<T, DatabaseError> {
    fn at(self, step: SyncStep) -> Result<T, StepFailure> {
        self.map_err(|source| StepFailure { step, source })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AttachOutcome {
    pub added: Vec<PhotoId>,
    pub cover: Option<PhotoId>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub removed: Vec<PhotoId>,
    pub added: Vec<PhotoId>,
    pub cover: Option<PhotoId>,
    /// Blobs of removed photos whose deletion failed.
    pub orphaned: Vec<StoragePath>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub removed: Vec<PhotoId>,
    pub orphaned: Vec<StoragePath>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    pub orphaned_files_removed: usize,
    pub failed: Vec<StoragePath>,
}

pub struct GalleryCore<B = FsBinaryStore, O = ResizingOptimizer> {
    base_path: PathBuf,
    db: PhotoStore,
    blobs: B,
    optimizer: O,
    settings: SyncSettings,
    locks: ParentLocks,
    /// Shared by attach/sync/delete calls, taken exclusively by orphan sweeps.
    maintenance: RwLock<()>,
}

impl GalleryCore {
    /// Opens a gallery with blobs on disk under `config.blobs_path()`.
    pub fn open(config: Config, app: &AppConfig) -> Result<Self, GalleryError> {
        let blobs = FsBinaryStore::new(config.blobs_path());
        let optimizer = ResizingOptimizer::new(&app.optimizer);
        Self::with_collaborators(config, SyncSettings::from(app), blobs, optimizer)
    }
}

impl<B: BinaryStore, O: ImageOptimizer> GalleryCore<B, O> {
    pub fn with_collaborators(
        config: Config,
        settings: SyncSettings,
        blobs: B,
        optimizer: O,
    ) -> Result<Self, GalleryError> {
        // Reject a storage directory that cannot produce valid paths up front
        StoragePath::generate(&settings.directory, "probe")?;

        let db = PhotoStore::open(&config)?;
        Ok(Self {
            base_path: config.base_path,
            db,
            blobs,
            optimizer,
            settings,
            locks: ParentLocks::default(),
            maintenance: RwLock::new(()),
        })
    }

    /// Returns the base data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.base_path
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }
}

/// Read operations.
impl<B: BinaryStore, O: ImageOptimizer> GalleryCore<B, O> {
    /// Returns a parent's photos in display order.
    pub fn photos(&self, parent: ParentId) -> Result<Vec<Photo>, GalleryError> {
        Ok(self.db.photos(parent)?)
    }

    pub fn photo(&self, id: PhotoId) -> Result<Option<Photo>, GalleryError> {
        Ok(self.db.get(id)?)
    }

    pub fn cover_photo(&self, parent: ParentId) -> Result<Option<Photo>, GalleryError> {
        Ok(self.db.cover(parent)?)
    }
}

/// Create path.
impl<B: BinaryStore, O: ImageOptimizer> GalleryCore<B, O> {
    /// Attaches `uploads` to a parent that has no photos yet.
    ///
    /// Photo `i` gets `order = i`; the photo at `cover_index` is the cover.
    /// If upload `k` fails, photos `0..k` stay attached and the error carries `k`.
    pub fn attach_all<U: AsRef<[u8]>>(
        &self,
        parent: ParentId,
        uploads: &[U],
        cover_index: usize,
    ) -> Result<AttachOutcome, GalleryError> {
        validate_uploads(uploads, cover_index, &self.settings.limits)?;

        let _gate = self
            .maintenance
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .locks
            .try_lock(parent)
            .ok_or(GalleryError::ParentBusy(parent))?;

        if !self.db.photos(parent).at(SyncStep::Read)?.is_empty() {
            return Err(GalleryError::ParentNotEmpty(parent));
        }
        if uploads.is_empty() {
            return Ok(AttachOutcome::default());
        }

        let raw: Vec<&[u8]> = uploads.iter().map(|upload| upload.as_ref()).collect();
        let (stored, failure) = self.store_uploads(&raw);

        let outcome = match self.record_attach(parent, &stored, cover_index, failure.is_some()) {
            Ok(outcome) => outcome,
            Err(step_failure) => {
                self.discard_all(&stored);
                return Err(step_failure.into());
            }
        };

        if let Some(err) = failure {
            warn!(
                parent = %parent,
                added = outcome.added.len(),
                error = %err,
                "attach stopped early",
            );
            return Err(err);
        }

        self.verify(parent)?;
        info!(
            parent = %parent,
            added = outcome.added.len(),
            cover = ?outcome.cover,
            "attached photos",
        );
        Ok(outcome)
    }

    fn record_attach(
        &self,
        parent: ParentId,
        stored: &[StoragePath],
        cover_index: usize,
        partial: bool,
    ) -> Result<AttachOutcome, StepFailure> {
        let mut writer = self.db.begin_write().at(SyncStep::Read)?;
        let mut outcome = AttachOutcome::default();

        for (index, path) in stored.iter().enumerate() {
            let photo = writer
                .insert(
                    parent,
                    NewPhoto {
                        storage_path: path.clone(),
                        is_cover: index == cover_index,
                        order: index as u32,
                    },
                )
                .at(SyncStep::Addition)?;
            outcome.added.push(photo.id);
        }

        // The designated cover may be among the uploads that never made it
        outcome.cover = if partial {
            repair_cover(&mut writer, parent).at(SyncStep::Repair)?
        } else {
            writer.cover_id(parent).at(SyncStep::Read)?
        };

        writer.commit().at(SyncStep::Commit)?;
        Ok(outcome)
    }
}

/// Update path.
impl<B: BinaryStore, O: ImageOptimizer> GalleryCore<B, O> {
    /// Reconciles a parent's photos with `state`.
    ///
    /// In order: removes photos not in `keep_ids`, clears every cover,
    /// assigns the requested (or retained previous) cover, renumbers kept
    /// photos to `0..kept`, appends the uploads after them, and finally makes
    /// the lowest-order photo the cover if none is set. All record changes
    /// commit together; blobs of removed photos are deleted after the commit.
    pub fn sync(&self, parent: ParentId, state: &DesiredState) -> Result<SyncOutcome, GalleryError> {
        state.validate(&self.settings.limits)?;

        let _gate = self
            .maintenance
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .locks
            .try_lock(parent)
            .ok_or(GalleryError::ParentBusy(parent))?;

        let raw: Vec<&[u8]> = state
            .incoming
            .iter()
            .map(|upload| upload.bytes.as_slice())
            .collect();
        let (stored, failure) = self.store_uploads(&raw);

        let (mut outcome, removed) = match self.record_sync(parent, state, &stored) {
            Ok(applied) => applied,
            Err(step_failure) => {
                self.discard_all(&stored);
                return Err(step_failure.into());
            }
        };

        outcome.orphaned = self.delete_blobs(&removed);

        if let Some(err) = failure {
            warn!(
                parent = %parent,
                removed = outcome.removed.len(),
                added = outcome.added.len(),
                error = %err,
                "sync stopped early",
            );
            return Err(err);
        }

        self.verify(parent)?;
        info!(
            parent = %parent,
            removed = outcome.removed.len(),
            added = outcome.added.len(),
            cover = ?outcome.cover,
            "synced photos",
        );
        Ok(outcome)
    }

    fn record_sync(
        &self,
        parent: ParentId,
        state: &DesiredState,
        stored: &[StoragePath],
    ) -> Result<(SyncOutcome, Vec<Photo>), StepFailure> {
        let mut writer = self.db.begin_write().at(SyncStep::Read)?;
        let existing = writer.photos(parent).at(SyncStep::Read)?;
        let previous_cover = existing.iter().find(|p| p.is_cover).map(|p| p.id);

        // 1. Removal
        let (kept, removed): (Vec<Photo>, Vec<Photo>) = existing
            .into_iter()
            .partition(|photo| state.keep_ids.contains(&photo.id));
        for photo in &removed {
            writer.remove(photo.id).at(SyncStep::Removal)?;
        }
        debug!(parent = %parent, kept = kept.len(), removed = removed.len(), "removed photos");

        // 2. Cover reset
        writer.clear_covers(parent).at(SyncStep::CoverReset)?;

        // 3. Cover assignment among kept photos
        let is_kept = |id: &PhotoId| kept.iter().any(|photo| photo.id == *id);
        let assigned = state
            .new_cover_id
            .filter(is_kept)
            .or(previous_cover.filter(is_kept));
        if let Some(id) = assigned {
            writer.set_cover(id).at(SyncStep::CoverAssignment)?;
        }

        // Dense positions for kept photos, so additions never share an order with them
        for (position, photo) in kept.iter().enumerate() {
            writer
                .set_order(photo.id, position as u32)
                .at(SyncStep::Renumber)?;
        }

        // 4. Addition
        let offset = kept.len() as u32;
        let mut added = Vec::with_capacity(stored.len());
        for (position, (path, upload)) in stored.iter().zip(&state.incoming).enumerate() {
            if upload.is_cover {
                writer.clear_covers(parent).at(SyncStep::Addition)?;
            }
            let photo = writer
                .insert(
                    parent,
                    NewPhoto {
                        storage_path: path.clone(),
                        is_cover: upload.is_cover,
                        order: offset + position as u32,
                    },
                )
                .at(SyncStep::Addition)?;
            added.push(photo.id);
        }

        // 5. Repair
        let cover = repair_cover(&mut writer, parent).at(SyncStep::Repair)?;

        writer.commit().at(SyncStep::Commit)?;

        let outcome = SyncOutcome {
            removed: removed.iter().map(|photo| photo.id).collect(),
            added,
            cover,
            orphaned: Vec::new(),
        };
        Ok((outcome, removed))
    }
}

/// Delete-parent path.
impl<B: BinaryStore, O: ImageOptimizer> GalleryCore<B, O> {
    /// Removes every photo of a parent that is itself being deleted.
    ///
    /// Every blob deletion is attempted; failures are logged and reported
    /// in `DeleteOutcome::orphaned`.
    pub fn delete_all(&self, parent: ParentId) -> Result<DeleteOutcome, GalleryError> {
        let _gate = self
            .maintenance
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .locks
            .try_lock(parent)
            .ok_or(GalleryError::ParentBusy(parent))?;

        let removed = {
            let mut writer = self.db.begin_write().at(SyncStep::Read)?;
            let removed = writer.remove_all(parent).at(SyncStep::Removal)?;
            writer.commit().at(SyncStep::Commit)?;
            removed
        };

        let orphaned = self.delete_blobs(&removed);
        info!(
            parent = %parent,
            removed = removed.len(),
            orphaned = orphaned.len(),
            "deleted photos",
        );

        Ok(DeleteOutcome {
            removed: removed.iter().map(|photo| photo.id).collect(),
            orphaned,
        })
    }
}

/// Maintenance operations.
impl<B: BinaryStore, O: ImageOptimizer> GalleryCore<B, O> {
    /// Deletes blobs under the storage directory that no photo references.
    pub fn sweep_orphans(&self) -> Result<SweepOutcome, GalleryError> {
        let _gate = self
            .maintenance
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let referenced = self.db.all_storage_paths()?;
        let mut outcome = SweepOutcome::default();

        for path in self.blobs.list(&self.settings.directory)? {
            if referenced.contains(&path) {
                continue;
            }
            match self.blobs.delete(&path) {
                Ok(()) => outcome.orphaned_files_removed += 1,
                Err(err) => {
                    warn!(path = %path, error = %err, "failed to remove orphaned blob");
                    outcome.failed.push(path);
                }
            }
        }

        info!(
            removed = outcome.orphaned_files_removed,
            failed = outcome.failed.len(),
            "swept orphaned blobs",
        );
        Ok(outcome)
    }
}

/// Upload and blob helpers.
impl<B: BinaryStore, O: ImageOptimizer> GalleryCore<B, O> {
    /// Optimizes and stores uploads, stopping at the first failure.
    ///
    /// Returns the paths of the uploads before the failure, in upload order.
    fn store_uploads(&self, uploads: &[&[u8]]) -> (Vec<StoragePath>, Option<GalleryError>) {
        if self.settings.parallel_uploads && uploads.len() > 1 {
            return self.store_uploads_parallel(uploads);
        }

        let mut stored = Vec::with_capacity(uploads.len());
        for (index, bytes) in uploads.iter().enumerate() {
            match self.store_upload(index, bytes) {
                Ok(path) => stored.push(path),
                Err(err) => return (stored, Some(err)),
            }
        }
        (stored, None)
    }

    /// Each upload runs on its own thread with its index fixed up front.
    /// Uploads that succeed after an earlier one failed are discarded.
    fn store_uploads_parallel(&self, uploads: &[&[u8]]) -> (Vec<StoragePath>, Option<GalleryError>) {
        let results: Vec<Result<StoragePath, GalleryError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = uploads
                .iter()
                .enumerate()
                .map(|(index, bytes)| scope.spawn(move || self.store_upload(index, bytes)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });

        let mut stored = Vec::with_capacity(results.len());
        let mut failure = None;
        for result in results {
            match (result, failure.is_some()) {
                (Ok(path), false) => stored.push(path),
                (Ok(path), true) => self.discard(&path),
                (Err(err), false) => failure = Some(err),
                (Err(_), true) => {}
            }
        }
        (stored, failure)
    }

    fn store_upload(&self, index: usize, bytes: &[u8]) -> Result<StoragePath, GalleryError> {
        let optimized = self
            .optimizer
            .optimize(bytes)
            .map_err(|source| GalleryError::Optimize { index, source })?;

        let path = StoragePath::generate(&self.settings.directory, optimized.extension)?;
        let stored = self
            .blobs
            .put(&optimized.bytes, &path)
            .map_err(|source| GalleryError::StoreWrite { index, source })?;

        debug!(index, path = %stored, size = optimized.bytes.len(), "stored upload");
        Ok(stored)
    }

    /// Best-effort removal of a blob that never got a photo row.
    fn discard(&self, path: &StoragePath) {
        if let Err(err) = self.blobs.delete(path) {
            warn!(path = %path, error = %err, "failed to discard unreferenced blob");
        }
    }

    fn discard_all(&self, paths: &[StoragePath]) {
        for path in paths {
            self.discard(path);
        }
    }

    /// Attempts every deletion; returns the paths left behind.
    fn delete_blobs(&self, removed: &[Photo]) -> Vec<StoragePath> {
        let mut orphaned = Vec::new();
        for photo in removed {
            if let Err(err) = self.blobs.delete(&photo.storage_path) {
                warn!(
                    photo = %photo.id,
                    path = %photo.storage_path,
                    error = %err,
                    "failed to delete blob of removed photo",
                );
                orphaned.push(photo.storage_path.clone());
            }
        }
        orphaned
    }

    fn verify(&self, parent: ParentId) -> Result<(), GalleryError> {
        if !self.settings.check_invariants {
            return Ok(());
        }
        let photos = self.db.photos(parent).at(SyncStep::Read)?;
        invariants::check(parent, &photos)?;
        Ok(())
    }
}

/// Makes the lowest-order photo the cover when a non-empty parent has none.
fn repair_cover(writer: &mut PhotoWriter, parent: ParentId) -> Result<Option<PhotoId>, DatabaseError> {
    if let Some(cover) = writer.cover_id(parent)? {
        return Ok(Some(cover));
    }

    let Some(first) = writer.photos(parent)?.into_iter().next() else {
        return Ok(None);
    };
    writer.set_cover(first.id)?;
    debug!(parent = %parent, photo = %first.id, "assigned fallback cover");
    Ok(Some(first.id))
}
