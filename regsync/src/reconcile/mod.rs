//! Reconciliation of a source inventory against a destination inventory.
//!
//! The result is a [`MigrationWorkList`], persisted before any copy starts.

mod reconciler;
mod work_list;

pub use reconciler::{difference, Reconciler, PREVIEW_LIMIT};
pub use work_list::MigrationWorkList;
