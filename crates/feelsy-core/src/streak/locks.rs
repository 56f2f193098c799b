//! Keyed lock table: one mutex per user id.
//!
//! Streak mutation for a user holds that user's lock. Different users never
//! share a lock, and idle entries are dropped once their last holder leaves.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

#[derive(Debug, Default)]
pub struct UserLocks {
    table: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `user_id`.
    pub fn with_user<R>(&self, user_id: Uuid, f: impl FnOnce() -> R) -> R {
        let slot = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(user_id).or_default())
        };

        let result = {
            // The guarded value is (), so a poisoned lock carries no broken state.
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        drop(slot);
        self.release(user_id);
        result
    }

    /// Number of users with a live lock entry.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, user_id: Uuid) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = table.get(&user_id) {
            // Only the table's own reference left: nobody holds or waits.
            if Arc::strong_count(slot) == 1 {
                table.remove(&user_id);
            }
        }
    }
}
