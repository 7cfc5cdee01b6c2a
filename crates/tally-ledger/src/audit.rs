//! Post-hoc conflict audit over a ledger snapshot.
//!
//! A conflict is any resource with two or more entries in the audited
//! history. Groups keep the order in which their resource first appears in
//! the history, and each group keeps its entries in append order.

use indexmap::IndexMap;

use crate::entry::Entry;

/// Outcome of the recovery run for one conflicting resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Recovery strategy completed
    Recovered,
    /// Recovery strategy returned an error
    Failed(String),
}

impl Resolution {
    /// Whether recovery completed
    pub fn is_recovered(&self) -> bool {
        matches!(self, Resolution::Recovered)
    }
}

/// A resource touched by more than one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictReport {
    /// Conflicting resource
    pub resource: String,
    /// Every entry for the resource, in append order
    pub entries: Vec<Entry>,
    /// Outcome of the recovery run
    pub resolution: Resolution,
}

impl ConflictReport {
    /// Workers involved, in append order (duplicates kept).
    pub fn workers(&self) -> Vec<&str> {
        self.entries.iter().map(Entry::worker).collect()
    }
}

/// Result of one audit pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictAudit {
    groups: IndexMap<String, ConflictReport>,
}

impl ConflictAudit {
    pub(crate) fn push(&mut self, report: ConflictReport) {
        self.groups.insert(report.resource.clone(), report);
    }

    /// True when no resource was touched more than once.
    pub fn is_clean(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of conflicting resources
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Same as [`ConflictAudit::is_clean`]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Report for one resource
    pub fn get(&self, resource: &str) -> Option<&ConflictReport> {
        self.groups.get(resource)
    }

    /// Conflicting resource names, in audit order
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Reports in audit order
    pub fn iter(&self) -> impl Iterator<Item = &ConflictReport> {
        self.groups.values()
    }

    /// Resources whose recovery did not succeed.
    pub fn unresolved(&self) -> impl Iterator<Item = &ConflictReport> {
        self.groups.values().filter(|r| !r.resolution.is_recovered())
    }

    /// Resource name to conflicting entries, in audit order.
    pub fn into_groups(self) -> IndexMap<String, Vec<Entry>> {
        self.groups
            .into_iter()
            .map(|(resource, report)| (resource, report.entries))
            .collect()
    }
}

/// Group `entries` by resource and keep only groups of two or more.
pub fn group_conflicts(entries: &[Entry]) -> IndexMap<String, Vec<Entry>> {
    let mut groups: IndexMap<String, Vec<Entry>> = IndexMap::new();
    for entry in entries {
        groups
            .entry(entry.resource().to_string())
            .or_default()
            .push(entry.clone());
    }
    groups.retain(|_, group| group.len() > 1);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(sequence: u64, worker: &str, resource: &str, action: &str) -> Entry {
        Entry::new(
            sequence,
            worker.to_string(),
            Utc::now(),
            resource.to_string(),
            action.to_string(),
        )
    }

    #[test]
    fn groups_only_repeated_resources() {
        let history = vec![
            entry(0, "w1", "A", "x"),
            entry(1, "w2", "A", "y"),
            entry(2, "w3", "B", "z"),
        ];

        let groups = group_conflicts(&history);
        assert_eq!(groups.len(), 1);
        let a = &groups["A"];
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].action(), "x");
        assert_eq!(a[1].action(), "y");
        assert!(!groups.contains_key("B"));
    }

    #[test]
    fn groups_follow_first_appearance() {
        let history = vec![
            entry(0, "w1", "B", "a"),
            entry(1, "w2", "A", "b"),
            entry(2, "w3", "A", "c"),
            entry(3, "w4", "B", "d"),
        ];

        let groups = group_conflicts(&history);
        let order: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["B", "A"]);
    }

    #[test]
    fn empty_history_has_no_groups() {
        assert!(group_conflicts(&[]).is_empty());
    }

    #[test]
    fn audit_tracks_unresolved() {
        let mut audit = ConflictAudit::default();
        audit.push(ConflictReport {
            resource: "A".to_string(),
            entries: vec![entry(0, "w1", "A", "x"), entry(1, "w2", "A", "y")],
            resolution: Resolution::Recovered,
        });
        audit.push(ConflictReport {
            resource: "B".to_string(),
            entries: vec![entry(2, "w3", "B", "x"), entry(3, "w4", "B", "y")],
            resolution: Resolution::Failed("disk offline".to_string()),
        });

        assert!(!audit.is_clean());
        assert_eq!(audit.len(), 2);
        let unresolved: Vec<&str> = audit.unresolved().map(|r| r.resource.as_str()).collect();
        assert_eq!(unresolved, vec!["B"]);
        assert_eq!(audit.get("A").map(|r| r.workers()), Some(vec!["w1", "w2"]));
    }
}
