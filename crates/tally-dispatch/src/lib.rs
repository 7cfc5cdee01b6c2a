//! # Tally Dispatch
//!
//! Fan-out/fan-in submission of work items to a shared [`tally_ledger::Ledger`]
//! with per-unit error isolation.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod dispatcher;
pub mod work;

pub use dispatcher::{Dispatcher, UnitHandle};
pub use work::{BatchReport, Outcome, WorkItem, WorkItemParseError};
