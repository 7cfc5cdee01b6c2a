//! Dispatcher: runs each work item as its own unit and records it.
//!
//! Units are spawned onto Tokio's blocking pool because `Ledger::record` may
//! block on the resource or global lock. Failures are caught per unit, logged,
//! and turned into an [`Outcome`]; a failing unit never cancels its siblings.

use std::sync::Arc;

use futures::future::join_all;
use tally_ledger::{ConflictAudit, Entry, Ledger, LedgerError, Result};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::work::{BatchReport, Outcome, WorkItem};

/// Forwards work to a shared ledger.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    ledger: Arc<Ledger>,
}

impl Dispatcher {
    /// Create a dispatcher over a shared ledger
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Get the ledger units are recorded into
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Spawn one unit recording `action` on `resource` for `worker`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(
        &self,
        worker: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> UnitHandle {
        self.submit_item(WorkItem::new(worker, resource, action))
    }

    /// Spawn one unit for an already built work item
    pub fn submit_item(&self, item: WorkItem) -> UnitHandle {
        self.submit_with(item, |ledger, item| {
            ledger.record(&item.worker, &item.resource, &item.action)
        })
    }

    /// Spawn one unit whose recording step is `op`.
    pub(crate) fn submit_with<F>(&self, item: WorkItem, op: F) -> UnitHandle
    where
        F: FnOnce(&Ledger, &WorkItem) -> Result<Entry> + Send + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        let unit_item = item.clone();
        debug!(work = %item, "unit submitted");

        let handle = tokio::task::spawn_blocking(move || {
            let result = op(&ledger, &unit_item);
            into_outcome(unit_item, result)
        });
        UnitHandle { item, handle }
    }

    /// Submit every item concurrently and wait for all of them.
    pub async fn submit_batch(&self, items: impl IntoIterator<Item = WorkItem>) -> BatchReport {
        let handles: Vec<UnitHandle> = items.into_iter().map(|item| self.submit_item(item)).collect();
        join_units(handles).await
    }

    /// Audit the ledger once all submitted units have finished.
    pub async fn run_conflict_audit(&self) -> ConflictAudit {
        self.ledger.audit_conflicts().await
    }
}

async fn join_units(handles: Vec<UnitHandle>) -> BatchReport {
    let outcomes = join_all(handles.into_iter().map(UnitHandle::join)).await;
    BatchReport { outcomes }
}

fn into_outcome(item: WorkItem, result: Result<Entry>) -> Outcome {
    match result {
        Ok(entry) => Outcome::Recorded(entry),
        Err(err @ LedgerError::Conflict { .. }) => {
            warn!(work = %item, error = %err, "conflict in operation");
            Outcome::Conflicted {
                item,
                reason: err.to_string(),
            }
        }
        Err(err) => {
            warn!(work = %item, error = %err, "operation failed");
            Outcome::Failed {
                item,
                reason: err.to_string(),
            }
        }
    }
}

/// Handle to one in-flight unit of work.
#[derive(Debug)]
pub struct UnitHandle {
    item: WorkItem,
    handle: JoinHandle<Outcome>,
}

impl UnitHandle {
    /// Work item this unit is running
    pub fn item(&self) -> &WorkItem {
        &self.item
    }

    /// Wait for the unit. A unit that panicked is reported as `Failed`.
    pub async fn join(self) -> Outcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(work = %self.item, error = %err, "unit did not complete");
                Outcome::Failed {
                    item: self.item,
                    reason: err.to_string(),
                }
            }
        }
    }
}
