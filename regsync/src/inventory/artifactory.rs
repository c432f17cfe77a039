//! Destination inventory over an Artifactory AQL search.
//!
//! Each stored image has a `manifest.json` under `{name}/{tag}/`, so the
//! search returns one path per image and the identifier is recovered from
//! its segments.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{ArtifactSet, Inventory};
use crate::config::MigrationConfig;
use crate::core::ArtifactIdentifier;
use crate::errors::{RegsyncError, Result};

const INVENTORY_NAME: &str = "artifactory";

/// The file every stored image version carries.
pub const MANIFEST_FILENAME: &str = "manifest.json";

#[derive(Debug, Default, Deserialize)]
struct AqlResponse {
    #[serde(default)]
    results: Vec<AqlItem>,
}

#[derive(Debug, Default, Deserialize)]
struct AqlItem {
    #[serde(default)]
    path: Option<String>,
}

/// Builds the AQL query that finds every manifest in `repo`.
#[must_use]
pub fn aql_query(repo: &str) -> String {
    format!(
        "items.find({{\n  \"repo\": \"{repo}\",\n  \"name\": \"{MANIFEST_FILENAME}\"\n}}).include(\"repo\",\"path\",\"name\",\"created\",\"modified\")\n"
    )
}

/// Recovers an identifier from a manifest's directory path.
///
/// The last segment is the tag and the rest form the name; paths with fewer
/// than two segments are skipped.
#[must_use]
pub fn identifier_from_path(prefix: &str, path: &str) -> Option<ArtifactIdentifier> {
    let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
    let (tag, name) = parts.split_last()?;
    if name.is_empty() || name.iter().any(|s| s.is_empty()) {
        return None;
    }
    ArtifactIdentifier::new(prefix, name.join("/"), *tag)
}

/// Lists the destination registry by searching for image manifests.
#[derive(Debug, Clone)]
pub struct ArtifactoryInventory {
    client: reqwest::Client,
    search_url: String,
    repo: String,
    username: String,
    password: String,
    prefix: String,
}

impl ArtifactoryInventory {
    /// Creates an inventory searching `repo` at `search_url`.
    ///
    /// `prefix` is the *source* prefix, so the resulting identifiers are
    /// directly comparable with the source inventory.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        search_url: impl Into<String>,
        repo: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            client,
            search_url: search_url.into(),
            repo: repo.into(),
            username: String::new(),
            password: String::new(),
            prefix: prefix.into(),
        }
    }

    /// Sets basic-auth credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Creates the destination inventory described by `config`.
    #[must_use]
    pub fn from_config(client: reqwest::Client, config: &MigrationConfig) -> Self {
        Self::new(
            client,
            config.destination_search_url(),
            &config.destination_repo,
            &config.source_repo,
        )
        .with_credentials(&config.destination_user, &config.destination_password)
    }
}

#[async_trait]
impl Inventory for ArtifactoryInventory {
    fn name(&self) -> &str {
        INVENTORY_NAME
    }

    async fn list(&self) -> Result<ArtifactSet> {
        let mut request = self
            .client
            .post(&self.search_url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(aql_query(&self.repo));
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| RegsyncError::inventory(INVENTORY_NAME, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegsyncError::inventory(
                INVENTORY_NAME,
                format!("HTTP {}: {}", status.as_u16(), body.trim()),
            ));
        }

        let payload: AqlResponse = response
            .json()
            .await
            .map_err(|e| RegsyncError::inventory(INVENTORY_NAME, format!("malformed results: {e}")))?;

        let total = payload.results.len();
        let images: ArtifactSet = payload
            .results
            .iter()
            .filter_map(|item| identifier_from_path(&self.prefix, item.path.as_deref()?))
            .collect();

        info!(
            images = images.len(),
            skipped = total.saturating_sub(images.len()),
            "Listed destination inventory"
        );
        Ok(images)
    }
}
