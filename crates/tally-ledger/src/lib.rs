//! # Tally Ledger
//!
//! In-memory, append-only record of actions performed against named
//! resources by concurrently running workers, plus a post-hoc audit that
//! flags every resource touched more than once and runs a (simulated)
//! recovery for it.
//!
//! # Architecture
//!
//! - **Entry**: immutable, timestamped record of one committed action
//! - **Ledger**: owns the history and a lazily grown per-resource lock table
//! - **Audit**: groups a snapshot by resource and resolves each conflict
//! - **Recovery**: injectable strategy invoked once per conflicting resource
//!
//! `record` always takes the resource lock before the global lock. That fixed
//! order is what keeps overlapping concurrent callers deadlock free.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod lock_table;

pub mod audit;
pub mod config;
pub mod entry;
pub mod ledger;
pub mod recovery;

pub use audit::{group_conflicts, ConflictAudit, ConflictReport, Resolution};
pub use config::LedgerConfig;
pub use entry::Entry;
pub use error::{LedgerError, LockScope, Result};
pub use ledger::{Ledger, ResourceHold};
pub use recovery::{FixedDelayRecovery, NoopRecovery, RecoveryStrategy, DEFAULT_RECOVERY_DELAY};
