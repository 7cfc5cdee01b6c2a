//! Ledger entries
//!
//! An [`Entry`] is the immutable record of one committed action. Entries are
//! only ever constructed by the ledger while it holds both locks, so the
//! sequence number and timestamp always reflect append order.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One committed action against one resource by one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    sequence: u64,
    worker: String,
    timestamp: DateTime<Utc>,
    resource: String,
    action: String,
}

impl Entry {
    pub(crate) fn new(
        sequence: u64,
        worker: String,
        timestamp: DateTime<Utc>,
        resource: String,
        action: String,
    ) -> Self {
        Self {
            sequence,
            worker,
            timestamp,
            resource,
            action,
        }
    }

    /// Zero-based position of this entry in the ledger history.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Identifier of the unit of work that submitted the action.
    pub fn worker(&self) -> &str {
        &self.worker
    }

    /// Wall-clock time at which the entry was appended.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Name of the resource acted upon.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Free-form description of the action.
    pub fn action(&self) -> &str {
        &self.action
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {} - {}",
            self.timestamp.to_rfc3339(),
            self.worker,
            self.resource,
            self.action
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entry {
        Entry::new(
            0,
            "Thread 1".to_string(),
            Utc::now(),
            "ResourceA".to_string(),
            "Update".to_string(),
        )
    }

    #[test]
    fn display_lists_worker_resource_action() {
        let entry = sample();
        let line = entry.to_string();
        assert!(line.ends_with(" - Thread 1 - ResourceA - Update"));
        assert!(line.starts_with(&entry.timestamp().to_rfc3339()));
    }

    #[test]
    fn serializes_all_fields() {
        let entry = sample();
        let value = serde_json::to_value(&entry).expect("serialize entry");
        assert_eq!(value["worker"], "Thread 1");
        assert_eq!(value["resource"], "ResourceA");
        assert_eq!(value["action"], "Update");
        assert_eq!(value["sequence"], 0);

        let back: Entry = serde_json::from_value(value).expect("deserialize entry");
        assert_eq!(back, entry);
    }
}
