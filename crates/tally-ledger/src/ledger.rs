//! The shared operation ledger.
//!
//! Lock order in `record` is always resource lock, then global lock. No
//! caller ever takes them in the reverse order, so concurrent `record` calls
//! cannot deadlock on each other.
//!
//! # Blocking Lock Usage
//!
//! The global lock is a `parking_lot::Mutex` over the history. It is held to
//! stamp and push one entry, or to clone the history for a snapshot, and is
//! never held across `.await` points. `record` is synchronous and may block;
//! async callers should run it on a blocking thread.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, info};

use crate::audit::{group_conflicts, ConflictAudit, ConflictReport, Resolution};
use crate::config::LedgerConfig;
use crate::entry::Entry;
use crate::error::{LedgerError, LockScope, Result};
use crate::lock_table::{LockTable, ResourceGuard};
use crate::recovery::{FixedDelayRecovery, RecoveryStrategy};

/// Append-only history of entries guarded by a two-level lock discipline.
pub struct Ledger {
    history: Mutex<Vec<Entry>>,
    resource_locks: LockTable,
    lock_timeout: Option<Duration>,
    recovery: Arc<dyn RecoveryStrategy>,
}

impl Ledger {
    /// Ledger with default configuration: untimed locks, one second recovery.
    pub fn new() -> Self {
        Self::with_config(&LedgerConfig::default())
    }

    /// Ledger from a validated configuration.
    ///
    /// Rejects settings that [`LedgerConfig::validate`] rejects, such as a
    /// zero lock timeout.
    pub fn try_with_config(config: &LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    /// Ledger from a configuration the caller has already validated.
    ///
    /// Use [`Ledger::try_with_config`] for untrusted input: a zero lock
    /// timeout here makes every contended `record` fail.
    pub fn with_config(config: &LedgerConfig) -> Self {
        Self {
            history: Mutex::new(Vec::new()),
            resource_locks: LockTable::new(),
            lock_timeout: config.lock_timeout(),
            recovery: Arc::new(FixedDelayRecovery::new(config.recovery_delay())),
        }
    }

    /// Replace the recovery strategy run by the audit.
    pub fn with_recovery(mut self, recovery: Arc<dyn RecoveryStrategy>) -> Self {
        self.recovery = recovery;
        self
    }

    /// Timeout applied to both locks in `record`
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout
    }

    /// Append one entry for `worker` acting on `resource`.
    ///
    /// Takes the resource lock, then the global lock, stamps and appends the
    /// entry, and releases both in reverse order. On `AcquisitionFailure` the
    /// history is left untouched.
    pub fn record(&self, worker: &str, resource: &str, action: &str) -> Result<Entry> {
        let resource_guard = self.resource_locks.acquire(resource, self.lock_timeout)?;
        debug!(worker, resource, "resource lock acquired");

        let entry = {
            let mut history = self.lock_history(resource)?;
            debug!(worker, resource, "global lock acquired");

            let now = Utc::now();
            let timestamp = match history.last() {
                Some(last) if last.timestamp() > now => last.timestamp(),
                _ => now,
            };
            let entry = Entry::new(
                history.len() as u64,
                worker.to_string(),
                timestamp,
                resource.to_string(),
                action.to_string(),
            );
            history.push(entry.clone());
            entry
        };
        debug!(worker, resource, "global lock released");

        info!(
            sequence = entry.sequence(),
            worker,
            resource,
            action,
            "entry appended"
        );

        drop(resource_guard);
        debug!(worker, resource, "resource lock released");

        Ok(entry)
    }

    fn lock_history(&self, resource: &str) -> Result<MutexGuard<'_, Vec<Entry>>> {
        match self.lock_timeout {
            None => Ok(self.history.lock()),
            Some(timeout) => self
                .history
                .try_lock_for(timeout)
                .ok_or_else(|| LedgerError::acquisition(resource, LockScope::Global, timeout)),
        }
    }

    /// Take the resource lock and keep it until the returned hold is dropped.
    ///
    /// While held, `record` calls on the same resource wait, or fail with
    /// `AcquisitionFailure` once the configured timeout elapses.
    pub fn hold_resource(&self, resource: &str) -> Result<ResourceHold> {
        let guard = self.resource_locks.acquire(resource, self.lock_timeout)?;
        debug!(resource, "resource lock held");
        Ok(ResourceHold {
            resource: resource.to_string(),
            _guard: guard,
        })
    }

    /// Independent copy of the full history in append order.
    pub fn snapshot(&self) -> Vec<Entry> {
        self.history.lock().clone()
    }

    /// Number of committed entries
    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    /// True before the first entry is committed
    pub fn is_empty(&self) -> bool {
        self.history.lock().is_empty()
    }

    /// Entries for one resource, in append order.
    pub fn entries_for(&self, resource: &str) -> Vec<Entry> {
        self.history
            .lock()
            .iter()
            .filter(|e| e.resource() == resource)
            .cloned()
            .collect()
    }

    /// Every resource name that has a lock, sorted.
    pub fn resources(&self) -> Vec<String> {
        self.resource_locks.resources()
    }

    /// Group one snapshot by resource and resolve every resource with two or
    /// more entries. Read-only: the history is never modified.
    pub async fn audit_conflicts(&self) -> ConflictAudit {
        let snapshot = self.snapshot();
        let mut audit = ConflictAudit::default();

        for (resource, entries) in group_conflicts(&snapshot) {
            info!(resource = %resource, count = entries.len(), "conflict detected");
            for entry in &entries {
                info!(
                    resource = %resource,
                    worker = entry.worker(),
                    timestamp = %entry.timestamp(),
                    action = entry.action(),
                    "conflicting entry"
                );
            }

            let resolution = match self.resolve(&resource).await {
                Ok(()) => Resolution::Recovered,
                Err(err) => Resolution::Failed(err.to_string()),
            };
            audit.push(ConflictReport {
                resource,
                entries,
                resolution,
            });
        }

        audit
    }

    /// Run the recovery strategy for `resource`, reporting start and end.
    pub async fn resolve(&self, resource: &str) -> Result<()> {
        info!(resource, "resolution started");
        match self.recovery.recover(resource).await {
            Ok(()) => {
                info!(resource, "resolution completed");
                Ok(())
            }
            Err(err) => {
                error!(resource, error = %err, "resolution failed");
                Err(err)
            }
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("entries", &self.len())
            .field("resources", &self.resources().len())
            .field("lock_timeout", &self.lock_timeout)
            .field("recovery", &"<Arc<dyn RecoveryStrategy>>")
            .finish()
    }
}

/// Exclusive hold on one resource lock; released on drop.
pub struct ResourceHold {
    resource: String,
    _guard: ResourceGuard,
}

impl ResourceHold {
    /// Resource being held
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl Drop for ResourceHold {
    fn drop(&mut self) {
        debug!(resource = %self.resource, "resource lock hold released");
    }
}

impl std::fmt::Debug for ResourceHold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHold")
            .field("resource", &self.resource)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::NoopRecovery;
    use assert_matches::assert_matches;

    fn quiet_ledger() -> Ledger {
        Ledger::new().with_recovery(Arc::new(NoopRecovery))
    }

    #[test]
    fn record_assigns_sequence_in_append_order() {
        let ledger = quiet_ledger();
        let first = ledger.record("Thread 1", "ResourceA", "Update").expect("record");
        let second = ledger.record("Thread 2", "ResourceB", "Create").expect("record");

        assert_eq!(first.sequence(), 0);
        assert_eq!(second.sequence(), 1);
        assert!(second.timestamp() >= first.timestamp());
        assert_eq!(ledger.snapshot(), vec![first, second]);
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let ledger = quiet_ledger();
        ledger.record("w1", "A", "x").expect("record");
        let before = ledger.snapshot();

        ledger.record("w2", "A", "y").expect("record");
        assert_eq!(before.len(), 1);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn repeated_snapshots_are_equal() {
        let ledger = quiet_ledger();
        ledger.record("w1", "A", "x").expect("record");
        ledger.record("w2", "B", "y").expect("record");
        assert_eq!(ledger.snapshot(), ledger.snapshot());
    }

    #[test]
    fn held_resource_times_out_without_side_effect() {
        let config = LedgerConfig {
            lock_timeout_ms: Some(10),
            recovery_delay_ms: 0,
        };
        let ledger = Ledger::with_config(&config);
        let hold = ledger.hold_resource("A").expect("hold");
        assert_eq!(hold.resource(), "A");

        let result = ledger.record("w1", "A", "x");
        assert_matches!(
            result,
            Err(LedgerError::AcquisitionFailure { scope: LockScope::Resource, ref resource, .. })
                if resource == "A"
        );
        assert!(ledger.is_empty());

        // Other resources are unaffected by the hold.
        ledger.record("w2", "B", "y").expect("record on B");

        drop(hold);
        ledger.record("w3", "A", "z").expect("record after release");
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn try_with_config_rejects_zero_timeout() {
        let config = LedgerConfig {
            lock_timeout_ms: Some(0),
            recovery_delay_ms: 0,
        };
        assert_matches!(Ledger::try_with_config(&config), Err(LedgerError::Config(_)));

        let config = LedgerConfig {
            lock_timeout_ms: Some(25),
            recovery_delay_ms: 0,
        };
        let ledger = Ledger::try_with_config(&config).expect("valid config");
        assert_eq!(ledger.lock_timeout(), Some(Duration::from_millis(25)));
    }

    #[test]
    fn entries_for_filters_by_resource() {
        let ledger = quiet_ledger();
        ledger.record("w1", "A", "x").expect("record");
        ledger.record("w2", "B", "y").expect("record");
        ledger.record("w3", "A", "z").expect("record");

        let actions: Vec<String> = ledger
            .entries_for("A")
            .iter()
            .map(|e| e.action().to_string())
            .collect();
        assert_eq!(actions, vec!["x", "z"]);
        assert_eq!(ledger.resources(), vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn audit_reports_only_repeated_resources() {
        let ledger = quiet_ledger();
        ledger.record("w1", "A", "x").expect("record");
        ledger.record("w2", "A", "y").expect("record");
        ledger.record("w3", "B", "z").expect("record");

        let audit = ledger.audit_conflicts().await;
        assert_eq!(audit.len(), 1);
        let report = audit.get("A").expect("conflict on A");
        assert_eq!(report.workers(), vec!["w1", "w2"]);
        assert_eq!(report.resolution, Resolution::Recovered);
        assert!(audit.get("B").is_none());

        // Auditing never changes the history.
        assert_eq!(ledger.len(), 3);
    }
}
