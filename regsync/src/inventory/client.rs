//! Shared HTTP client for inventory adapters.

use crate::config::HttpConfig;
use crate::errors::{RegsyncError, Result};

/// Builds the client used by every inventory adapter.
pub fn build_http_client(config: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.clone())
        .danger_accept_invalid_certs(config.insecure_tls)
        .build()
        .map_err(|e| RegsyncError::config(format!("failed to build HTTP client: {e}")))
}
