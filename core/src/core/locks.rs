use crate::types::ParentId;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Tracks which parents have a call in flight.
#[derive(Default)]
pub(crate) struct ParentLocks {
    active: Mutex<HashSet<ParentId>>,
}

/// Releases the parent when dropped.
pub(crate) struct ParentGuard<'a> {
    locks: &'a ParentLocks,
    parent: ParentId,
}

impl ParentLocks {
    /// Returns `None` if another call already holds `parent`.
    pub(crate) fn try_lock(&self, parent: ParentId) -> Option<ParentGuard<'_>> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.insert(parent).then_some(ParentGuard {
            locks: self,
            parent,
        })
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self, parent: ParentId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&parent)
    }
}

impl Drop for ParentGuard<'_> {
    fn drop(&mut self) {
        self.locks
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.parent);
    }
}
