pub mod core;
pub mod types;

pub use crate::core::error::{GalleryError, SyncStep};
pub use crate::core::{
    AttachOutcome, BinaryStore, DeleteOutcome, FsBinaryStore, GalleryCore, ImageOptimizer,
    InvariantViolation, OptimizedImage, ResizingOptimizer, SweepOutcome, SyncOutcome,
};
