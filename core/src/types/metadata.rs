//! Metadata types for persistent store state.

use serde::{Deserialize, Serialize};

/// Photo id allocation state. Missing fields default to the first id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceMetadata {
    #[serde(default = "first_photo_id")]
    pub next_photo_id: u64,
}

impl Default for SequenceMetadata {
    fn default() -> Self {
        Self {
            next_photo_id: first_photo_id(),
        }
    }
}

fn first_photo_id() -> u64 {
    1
}
