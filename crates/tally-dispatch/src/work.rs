//! Work items and per-unit outcomes.

use std::fmt;
use std::str::FromStr;

use tally_ledger::Entry;
use thiserror::Error;

/// One request to record `action` on `resource` on behalf of `worker`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Identifier of the submitting unit of work
    pub worker: String,
    /// Resource acted upon
    pub resource: String,
    /// Free-form description of the action
    pub action: String,
}

impl WorkItem {
    /// Create a work item
    pub fn new(
        worker: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            worker: worker.into(),
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Parse `worker:resource:action`. The action may itself contain `:`.
    pub fn parse(input: &str) -> Result<Self, WorkItemParseError> {
        let mut parts = input.splitn(3, ':');
        let (Some(worker), Some(resource), Some(action)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(WorkItemParseError::Shape(input.to_string()));
        };

        for (field, value) in [("worker", worker), ("resource", resource), ("action", action)] {
            if value.trim().is_empty() {
                return Err(WorkItemParseError::EmptyField {
                    field,
                    input: input.to_string(),
                });
            }
        }

        Ok(Self::new(worker.trim(), resource.trim(), action.trim()))
    }
}

impl FromStr for WorkItem {
    type Err = WorkItemParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.worker, self.resource, self.action)
    }
}

/// Errors from parsing a [`WorkItem`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkItemParseError {
    /// Input did not have three `:`-separated fields
    #[error("Expected worker:resource:action, got {0:?}")]
    Shape(String),

    /// One of the fields was blank
    #[error("Empty {field} in {input:?}")]
    EmptyField {
        /// Name of the blank field
        field: &'static str,
        /// Full input that was parsed
        input: String,
    },
}

/// How one submitted unit of work ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The entry was appended to the ledger
    Recorded(Entry),
    /// The operation signalled a domain conflict
    Conflicted {
        /// Work item that conflicted
        item: WorkItem,
        /// Rendered conflict error
        reason: String,
    },
    /// The operation failed (lock acquisition, or the unit itself died)
    Failed {
        /// Work item that failed
        item: WorkItem,
        /// Rendered failure
        reason: String,
    },
}

impl Outcome {
    /// Whether the unit appended an entry
    pub fn is_recorded(&self) -> bool {
        matches!(self, Outcome::Recorded(_))
    }

    /// Appended entry, if the unit recorded one
    pub fn entry(&self) -> Option<&Entry> {
        match self {
            Outcome::Recorded(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Per-unit outcomes of one batch, in submission order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// One outcome per submitted item
    pub outcomes: Vec<Outcome>,
}

impl BatchReport {
    /// Number of units that recorded an entry
    pub fn recorded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_recorded()).count()
    }

    /// Number of units that conflicted or failed
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.recorded()
    }

    /// True when every unit recorded an entry
    pub fn all_recorded(&self) -> bool {
        self.failed() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_fields() {
        let item = WorkItem::parse("Thread 1:ResourceA:Update").expect("parse");
        assert_eq!(item, WorkItem::new("Thread 1", "ResourceA", "Update"));
        assert_eq!(item.to_string(), "Thread 1:ResourceA:Update");
    }

    #[test]
    fn action_keeps_extra_colons() {
        let item: WorkItem = "w:r:set key=a:b".parse().expect("parse");
        assert_eq!(item.action, "set key=a:b");
    }

    #[test]
    fn rejects_missing_and_empty_fields() {
        assert_eq!(
            WorkItem::parse("w:r"),
            Err(WorkItemParseError::Shape("w:r".to_string()))
        );
        assert!(matches!(
            WorkItem::parse("w: :x"),
            Err(WorkItemParseError::EmptyField { field: "resource", .. })
        ));
    }
}
