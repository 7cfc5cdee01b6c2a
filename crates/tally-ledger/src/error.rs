//! Error types for the ledger

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Which lock in the two-level discipline could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockScope {
    /// The per-resource exclusive lock
    Resource,
    /// The single global lock guarding the history
    Global,
}

impl fmt::Display for LockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockScope::Resource => f.write_str("resource"),
            LockScope::Global => f.write_str("global"),
        }
    }
}

/// Ledger error types
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A lock could not be obtained within the configured timeout
    #[error("Failed to acquire {scope} lock for resource {resource} within {timeout:?}")]
    AcquisitionFailure {
        /// Resource whose `record` call failed
        resource: String,
        /// Lock that timed out
        scope: LockScope,
        /// Configured timeout
        timeout: Duration,
    },

    /// Domain conflict signalled by an operation on a resource
    #[error("Conflict on resource {resource}: {detail}")]
    Conflict {
        /// Resource in conflict
        resource: String,
        /// Description of the conflict
        detail: String,
    },

    /// Recovery strategy failed for a resource
    #[error("Recovery failed for resource {resource}: {reason}")]
    Recovery {
        /// Resource being recovered
        resource: String,
        /// Why recovery failed
        reason: String,
    },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    /// Create a lock acquisition failure
    pub fn acquisition(resource: impl Into<String>, scope: LockScope, timeout: Duration) -> Self {
        Self::AcquisitionFailure {
            resource: resource.into(),
            scope,
            timeout,
        }
    }

    /// Create a conflict error
    pub fn conflict(resource: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.into(),
            detail: detail.into(),
        }
    }

    /// Create a recovery error
    pub fn recovery(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Recovery {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AcquisitionFailure { .. })
    }

    /// Resource the error refers to, if any.
    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::AcquisitionFailure { resource, .. }
            | Self::Conflict { resource, .. }
            | Self::Recovery { resource, .. } => Some(resource),
            Self::Config(_) => None,
        }
    }
}
