//! # Regsync
//!
//! Reconciles two artifact registries and migrates whatever the destination
//! is missing.
//!
//! - **Inventories**: enumerate a registry completely or fail; partial
//!   listings never leak
//! - **Reconciliation**: exact set difference, persisted as a work list
//!   before anything is copied
//! - **Copy workers**: one external copy per attempt, retried with
//!   configurable backoff
//! - **Migration executor**: a bounded pool over the work list with
//!   cooperative cancellation and a full per-artifact report
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use regsync::prelude::*;
//!
//! let config = MigrationConfig::from_env()?;
//! let client = build_http_client(&config.http)?;
//! let source = NexusInventory::from_config(client.clone(), &config);
//! let destination = ArtifactoryInventory::from_config(client, &config);
//!
//! let work_list = Reconciler::new(&config.work_list_path)
//!     .reconcile_inventories(&source, &destination)
//!     .await?;
//!
//! let executor = MigrationExecutor::from_config(&config, Arc::new(CraneCopier::new()));
//! let report = executor.run(&work_list).await;
//! println!("{}", report.summary());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod copy;
pub mod core;
pub mod errors;
pub mod events;
pub mod executor;
pub mod inventory;
pub mod observability;
pub mod reconcile;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{HttpConfig, MigrationConfig};
    pub use crate::copy::{
        BackoffStrategy, CopyPrimitive, CopyWorker, CraneCopier, JitterStrategy, RetryPolicy,
    };
    pub use crate::core::{
        ArtifactIdentifier, CopyOutcome, CopyStatus, DestinationTransform, MigrationReport,
        MigrationSummary,
    };
    pub use crate::errors::{CopyError, RegsyncError, Result};
    pub use crate::events::{CopyEvent, CopyObserver, LoggingCopyObserver, NoOpCopyObserver};
    pub use crate::executor::{write_remaining, write_report, MigrationExecutor};
    #[cfg(feature = "http")]
    pub use crate::inventory::{build_http_client, ArtifactoryInventory, NexusInventory};
    pub use crate::inventory::{ArtifactSet, Inventory, StaticInventory};
    pub use crate::reconcile::{MigrationWorkList, Reconciler};
}
