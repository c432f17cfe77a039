//! Registry inventories.
//!
//! An [`Inventory`] enumerates every artifact a registry holds. Adapters
//! handle their own pagination but only ever return the complete set: if
//! any page fails, the whole listing fails with
//! [`RegsyncError::InventoryUnavailable`](crate::errors::RegsyncError).

#[cfg(feature = "http")]
mod artifactory;
#[cfg(feature = "http")]
mod client;
#[cfg(feature = "http")]
mod nexus;

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::core::ArtifactIdentifier;
use crate::errors::Result;

#[cfg(feature = "http")]
pub use artifactory::{aql_query, identifier_from_path, ArtifactoryInventory, MANIFEST_FILENAME};
#[cfg(feature = "http")]
pub use client::build_http_client;
#[cfg(feature = "http")]
pub use nexus::{NexusComponent, NexusInventory, NexusPage};

/// A set of artifacts, ordered by canonical string.
pub type ArtifactSet = BTreeSet<ArtifactIdentifier>;

/// Protocol for enumerating a registry.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Short name used in logs and errors (e.g. "nexus").
    fn name(&self) -> &str;

    /// Returns every artifact in the registry.
    async fn list(&self) -> Result<ArtifactSet>;
}

/// An inventory backed by a fixed set, for tests and pre-computed listings.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    name: String,
    items: ArtifactSet,
}

impl StaticInventory {
    /// Creates an inventory holding `items`.
    #[must_use]
    pub fn new(name: impl Into<String>, items: impl IntoIterator<Item = ArtifactIdentifier>) -> Self {
        Self {
            name: name.into(),
            items: items.into_iter().collect(),
        }
    }

    /// Creates an inventory from canonical strings, skipping any that do
    /// not parse.
    #[must_use]
    pub fn from_canonical<'a>(name: impl Into<String>, items: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(name, items.into_iter().filter_map(|s| s.parse().ok()))
    }
}

#[async_trait]
impl Inventory for StaticInventory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self) -> Result<ArtifactSet> {
        Ok(self.items.clone())
    }
}
