use serde::{Deserialize, Serialize};

use super::RecordVariant;
use crate::types::{ParentId, StoragePath};

/// Persisted photo row. The id is the table key and is not repeated here.
#[cfg_attr(test, derive(Eq, PartialEq))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub parent_id: ParentId,
    pub storage_path: StoragePath,
    pub is_cover: bool,
    pub order: u32,
}

impl RecordVariant for PhotoRecord {
    const VERSION: u8 = 1;
}
