//! Per-resource lock table.
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::Mutex` for both the table and the per-resource locks:
//! 1. The table lock is held only to look up or insert an entry and is
//!    released before any resource lock is taken
//! 2. Resource locks are never held across `.await` points
//! 3. Timed acquisition (`try_lock_arc_for`) is what surfaces
//!    `AcquisitionFailure`
//!
//! Locks are created lazily and never removed. Resource names are expected to
//! come from a small bounded set; unbounded names would grow the table without
//! limit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

use crate::error::{LedgerError, LockScope, Result};

/// Owned guard over one resource lock.
pub(crate) type ResourceGuard = ArcMutexGuard<RawMutex, ()>;

#[derive(Debug, Default)]
pub(crate) struct LockTable {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, resource: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(resource) {
            return Arc::clone(lock);
        }
        let lock = Arc::new(Mutex::new(()));
        locks.insert(resource.to_string(), Arc::clone(&lock));
        lock
    }

    /// Acquire the lock for `resource`, creating it on first reference.
    pub(crate) fn acquire(&self, resource: &str, timeout: Option<Duration>) -> Result<ResourceGuard> {
        let lock = self.lock_for(resource);
        match timeout {
            None => Ok(lock.lock_arc()),
            Some(timeout) => lock
                .try_lock_arc_for(timeout)
                .ok_or_else(|| LedgerError::acquisition(resource, LockScope::Resource, timeout)),
        }
    }

    pub(crate) fn contains(&self, resource: &str) -> bool {
        self.locks.lock().contains_key(resource)
    }

    pub(crate) fn resources(&self) -> Vec<String> {
        let mut names: Vec<String> = self.locks.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn creates_locks_lazily() {
        let table = LockTable::new();
        assert!(!table.contains("ResourceA"));

        let guard = table.acquire("ResourceA", None).expect("acquire");
        assert!(table.contains("ResourceA"));
        drop(guard);

        assert_eq!(table.resources(), vec!["ResourceA".to_string()]);
    }

    #[test]
    fn same_resource_shares_one_lock() {
        let table = LockTable::new();
        let _held = table.acquire("ResourceA", None).expect("acquire");

        let result = table
            .acquire("ResourceA", Some(Duration::from_millis(10)))
            .map(|_guard| ());
        assert_matches!(
            result,
            Err(LedgerError::AcquisitionFailure { scope: LockScope::Resource, .. })
        );

        // A different resource is unaffected.
        assert!(table
            .acquire("ResourceB", Some(Duration::from_millis(10)))
            .is_ok());
    }

    #[test]
    fn released_lock_can_be_reacquired() {
        let table = LockTable::new();
        drop(table.acquire("ResourceA", None).expect("acquire"));
        assert!(table
            .acquire("ResourceA", Some(Duration::from_millis(10)))
            .is_ok());
    }
}
