//! Concurrent migration of a work list.
//!
//! The executor drives a bounded pool of copy tasks over a
//! [`MigrationWorkList`](crate::reconcile::MigrationWorkList). A failing
//! artifact never stops the run; every entry ends up in the report either as
//! an outcome or, after cancellation, as not attempted.

mod persist;
mod runner;

pub use persist::{write_remaining, write_report};
pub use runner::MigrationExecutor;
