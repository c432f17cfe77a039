//! Source inventory over a Nexus-style components API.
//!
//! Pages are fetched with a continuation token until the server stops
//! returning one.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info};

use super::{ArtifactSet, Inventory};
use crate::config::MigrationConfig;
use crate::core::ArtifactIdentifier;
use crate::errors::{RegsyncError, Result};

const INVENTORY_NAME: &str = "nexus";

/// One component entry in a listing page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NexusComponent {
    /// Artifact path, e.g. `group/app`.
    #[serde(default)]
    pub name: Option<String>,
    /// Version label.
    #[serde(default)]
    pub version: Option<String>,
}

impl NexusComponent {
    /// Maps the component onto an identifier; `None` if name or version is
    /// missing.
    #[must_use]
    pub fn identifier(&self, prefix: &str) -> Option<ArtifactIdentifier> {
        ArtifactIdentifier::new(prefix, self.name.as_deref()?, self.version.as_deref()?)
    }
}

/// One page of the components listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NexusPage {
    /// Components on this page.
    #[serde(default)]
    pub items: Vec<NexusComponent>,
    /// Token for the next page, absent on the last page.
    #[serde(default)]
    pub continuation_token: Option<String>,
}

impl NexusPage {
    /// The next-page token, treating an empty string as absent.
    #[must_use]
    pub fn next_token(&self) -> Option<&str> {
        self.continuation_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Lists the source registry through its paginated components endpoint.
#[derive(Debug, Clone)]
pub struct NexusInventory {
    client: reqwest::Client,
    api_url: String,
    prefix: String,
}

impl NexusInventory {
    /// Creates an inventory reading `api_url` and prefixing identifiers
    /// with `prefix`.
    #[must_use]
    pub fn new(client: reqwest::Client, api_url: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            prefix: prefix.into(),
        }
    }

    /// Creates the source inventory described by `config`.
    #[must_use]
    pub fn from_config(client: reqwest::Client, config: &MigrationConfig) -> Self {
        Self::new(client, &config.source_api, &config.source_repo)
    }

    async fn fetch_page(&self, token: Option<&str>) -> Result<NexusPage> {
        let mut request = self.client.get(&self.api_url);
        if let Some(token) = token {
            request = request.query(&[("continuationToken", token)]);
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

        response
            .json::<NexusPage>()
            .await
            .map_err(|e| RegsyncError::inventory(INVENTORY_NAME, format!("malformed page: {e}")))
    }
}

#[async_trait]
impl Inventory for NexusInventory {
    fn name(&self) -> &str {
        INVENTORY_NAME
    }

    async fn list(&self) -> Result<ArtifactSet> {
        let mut images = ArtifactSet::new();
        let mut seen_tokens = HashSet::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;
        let mut skipped = 0usize;

        loop {
            let page = self.fetch_page(token.as_deref()).await?;
            pages += 1;

            for component in &page.items {
                match component.identifier(&self.prefix) {
                    Some(id) => {
                        images.insert(id);
                    }
                    None => skipped += 1,
                }
            }
            debug!(page = pages, items = page.items.len(), "Fetched components page");

            match page.next_token() {
                None => break,
                Some(next) => {
                    if !seen_tokens.insert(next.to_string()) {
                        return Err(RegsyncError::inventory(
                            INVENTORY_NAME,
                            format!("continuation token '{next}' repeated"),
                        ));
                    }
                    token = Some(next.to_string());
                }
            }
        }

        info!(images = images.len(), pages, skipped, "Listed source inventory");
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{local_http_client, StubResponse, StubServer};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_page_parsing() {
        let page: NexusPage = serde_json::from_str(
            r#"{"items":[{"name":"group/app","version":"1.0","id":"x"},{"name":"lib"}],
                "continuationToken":"abc"}"#,
        )
        .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next_token(), Some("abc"));
        assert_eq!(
            page.items[0].identifier("repo").unwrap().as_str(),
            "repo/group/app:1.0"
        );
        assert!(page.items[1].identifier("repo").is_none());
    }

    #[test]
    fn test_empty_token_ends_pagination() {
        let page: NexusPage =
            serde_json::from_str(r#"{"items":[],"continuationToken":""}"#).unwrap();
        assert_eq!(page.next_token(), None);

        let page: NexusPage =
            serde_json::from_str(r#"{"items":[],"continuationToken":null}"#).unwrap();
        assert_eq!(page.next_token(), None);
    }

    #[tokio::test]
    async fn test_list_follows_continuation_tokens() {
        let server = StubServer::start(vec![
            StubResponse::json(
                200,
                r#"{"items":[{"name":"app","version":"1.0"}],"continuationToken":"t1"}"#,
            ),
            StubResponse::json(
                200,
                r#"{"items":[{"name":"app","version":"2.0"},{"version":"3.0"}],"continuationToken":null}"#,
            ),
        ])
        .await;

        let inventory = NexusInventory::new(
            local_http_client(),
            server.url("/service/rest/v1/components?repository=repo"),
            "repo",
        );
        let images = inventory.list().await.unwrap();

        let rendered: Vec<_> = images.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["repo/app:1.0", "repo/app:2.0"]);

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert!(!requests[0].target.contains("continuationToken"));
        assert!(requests[1].target.contains("repository=repo"));
        assert!(requests[1].target.contains("continuationToken=t1"));
    }

    #[tokio::test]
    async fn test_failed_page_fails_whole_listing() {
        let server = StubServer::start(vec![
            StubResponse::json(
                200,
                r#"{"items":[{"name":"app","version":"1.0"}],"continuationToken":"t1"}"#,
            ),
            StubResponse::json(503, r#"{"error":"busy"}"#),
        ])
        .await;

        let inventory = NexusInventory::new(local_http_client(), server.url("/components"), "repo");
        let err = inventory.list().await.unwrap_err();

        assert!(matches!(err, RegsyncError::InventoryUnavailable { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_unavailable() {
        let server = StubServer::start(vec![StubResponse::json(200, "not json")]).await;

        let inventory = NexusInventory::new(local_http_client(), server.url("/components"), "repo");
        let err = inventory.list().await.unwrap_err();

        assert!(err.to_string().contains("malformed page"));
    }

    #[tokio::test]
    async fn test_repeated_token_is_rejected() {
        let page = r#"{"items":[],"continuationToken":"same"}"#;
        let server = StubServer::start(vec![
            StubResponse::json(200, page),
            StubResponse::json(200, page),
        ])
        .await;

        let inventory = NexusInventory::new(local_http_client(), server.url("/components"), "repo");
        let err = inventory.list().await.unwrap_err();

        assert!(err.to_string().contains("repeated"));
    }
}
