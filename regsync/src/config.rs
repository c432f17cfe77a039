//! Run configuration.
//!
//! A [`MigrationConfig`] is built once at process start, usually from the
//! environment, and handed to each component. Nothing reads the environment
//! after that.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::copy::RetryPolicy;
use crate::core::DestinationTransform;
use crate::errors::{RegsyncError, Result};

/// Configuration for the inventory HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Whether to skip TLS certificate verification.
    #[serde(default = "default_true")]
    pub insecure_tls: bool,
}

fn default_timeout() -> f64 {
    30.0
}

fn default_user_agent() -> String {
    concat!("regsync/", env!("CARGO_PKG_VERSION")).to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            insecure_tls: true,
        }
    }
}

impl HttpConfig {
    /// Gets timeout as Duration; out-of-range values fall back to the default.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_timeout()))
    }
}

/// Everything a reconcile or migrate run needs to know.
#[derive(Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Source repository name; also the prefix of every identifier.
    pub source_repo: String,
    /// Source components endpoint, including the repository query.
    pub source_api: String,
    /// Destination base URL (scheme and host).
    pub destination_url: String,
    /// Destination repository searched for manifests.
    pub destination_repo: String,
    /// Destination username.
    pub destination_user: String,
    /// Destination password. Never serialized.
    #[serde(skip_serializing, default)]
    pub destination_password: String,
    /// Prefix that replaces `source_repo` in copy targets.
    pub destination_prefix: String,
    /// Worker pool size.
    pub concurrency: usize,
    /// Retry policy for each artifact.
    pub retry: RetryPolicy,
    /// Where the reconciler writes the work list.
    pub work_list_path: PathBuf,
    /// Where the executor writes failed and unattempted artifacts.
    pub remaining_list_path: PathBuf,
    /// Append-only error log.
    pub error_log_path: PathBuf,
    /// Optional JSON run report.
    pub report_path: Option<PathBuf>,
    /// Copy executable.
    pub crane_bin: String,
    /// Inventory HTTP settings; `insecure_tls` also controls `--insecure`.
    pub http: HttpConfig,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        let source_repo = "source.repo.com".to_string();
        let destination_prefix = "artifactory.repo.com/target".to_string();
        Self {
            source_api: default_source_api(&source_repo),
            destination_url: default_destination_url(&destination_prefix),
            source_repo,
            destination_repo: "docker-repo-hosted".to_string(),
            destination_user: "your_username".to_string(),
            destination_password: "your_password".to_string(),
            destination_prefix,
            concurrency: 5,
            retry: RetryPolicy::default(),
            work_list_path: PathBuf::from("not_found_images.log"),
            remaining_list_path: PathBuf::from("remaining_images.log"),
            error_log_path: PathBuf::from("migration_errors.log"),
            report_path: None,
            crane_bin: "crane".to_string(),
            http: HttpConfig::default(),
        }
    }
}

fn default_source_api(source_repo: &str) -> String {
    format!("http://{source_repo}/service/rest/v1/components?repository={source_repo}")
}

fn default_destination_url(destination_prefix: &str) -> String {
    let host = destination_prefix.split('/').next().unwrap_or(destination_prefix);
    format!("https://{host}")
}

impl MigrationConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// Unset or blank variables fall back to defaults; values that are set
    /// but unparseable are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let source_repo = get("NEXUS_REPO").unwrap_or(defaults.source_repo);
        let source_api = get("NEXUS_API").unwrap_or_else(|| default_source_api(&source_repo));
        let destination_prefix = get("DEST_REPO").unwrap_or(defaults.destination_prefix);
        let destination_url = get("ARTIFACTORY_URL")
            .unwrap_or_else(|| default_destination_url(&destination_prefix));

        let max_attempts = parse_var(&get, "MAX_RETRY", defaults.retry.max_attempts)?;
        let delay_seconds: f64 = parse_var(
            &get,
            "RETRY_DELAY",
            defaults.retry.base_delay().as_secs_f64(),
        )?;
        let retry_delay = Duration::try_from_secs_f64(delay_seconds).map_err(|_| {
            RegsyncError::config(format!(
                "RETRY_DELAY must be a non-negative number of seconds, got {delay_seconds}"
            ))
        })?;

        let timeout_seconds: f64 = parse_var(&get, "HTTP_TIMEOUT", defaults.http.timeout_seconds)?;
        if Duration::try_from_secs_f64(timeout_seconds).is_err() {
            return Err(RegsyncError::config(format!(
                "HTTP_TIMEOUT must be a non-negative number of seconds, got {timeout_seconds}"
            )));
        }

        let http = HttpConfig {
            timeout_seconds,
            insecure_tls: parse_bool(&get, "INSECURE_TLS", defaults.http.insecure_tls)?,
            ..defaults.http
        };

        Ok(Self {
            source_repo,
            source_api,
            destination_url,
            destination_repo: get("ARTIFACTORY_REPO").unwrap_or(defaults.destination_repo),
            destination_user: get("ARTIFACTORY_USER").unwrap_or(defaults.destination_user),
            destination_password: get("ARTIFACTORY_PASSWORD")
                .unwrap_or(defaults.destination_password),
            destination_prefix,
            concurrency: parse_var(&get, "MAX_WORKER", defaults.concurrency)?,
            retry: defaults
                .retry
                .with_max_attempts(max_attempts)
                .with_base_delay(retry_delay),
            work_list_path: get("WORK_LIST").map_or(defaults.work_list_path, PathBuf::from),
            remaining_list_path: get("REMAINING_LIST")
                .map_or(defaults.remaining_list_path, PathBuf::from),
            error_log_path: get("ERROR_LOG").map_or(defaults.error_log_path, PathBuf::from),
            report_path: get("REPORT_PATH").map(PathBuf::from),
            crane_bin: get("CRANE_BIN").unwrap_or(defaults.crane_bin),
            http,
        })
    }

    /// Sets the worker pool size.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the maximum attempts per artifact.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.retry = self.retry.with_max_attempts(attempts);
        self
    }

    /// Sets the delay between attempts.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry = self.retry.with_base_delay(delay);
        self
    }

    /// Sets the work list path.
    #[must_use]
    pub fn with_work_list_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.work_list_path = path.into();
        self
    }

    /// Sets the remaining list path.
    #[must_use]
    pub fn with_remaining_list_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.remaining_list_path = path.into();
        self
    }

    /// Sets the report path.
    #[must_use]
    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// Effective pool size; always at least one.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.concurrency.max(1)
    }

    /// The source-to-destination prefix rewrite.
    #[must_use]
    pub fn destination_transform(&self) -> DestinationTransform {
        DestinationTransform::new(&self.source_repo, &self.destination_prefix)
    }

    /// The destination AQL search endpoint.
    #[must_use]
    pub fn destination_search_url(&self) -> String {
        format!(
            "{}/artifactory/api/search/aql",
            self.destination_url.trim_end_matches('/')
        )
    }
}

impl std::fmt::Debug for MigrationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationConfig")
            .field("source_repo", &self.source_repo)
            .field("source_api", &self.source_api)
            .field("destination_url", &self.destination_url)
            .field("destination_repo", &self.destination_repo)
            .field("destination_user", &self.destination_user)
            .field("destination_password", &"<redacted>")
            .field("destination_prefix", &self.destination_prefix)
            .field("concurrency", &self.concurrency)
            .field("retry", &self.retry)
            .field("work_list_path", &self.work_list_path)
            .field("remaining_list_path", &self.remaining_list_path)
            .field("error_log_path", &self.error_log_path)
            .field("report_path", &self.report_path)
            .field("crane_bin", &self.crane_bin)
            .field("http", &self.http)
            .finish()
    }
}

fn parse_var<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| RegsyncError::config(format!("{key}='{raw}': {e}"))),
    }
}

fn parse_bool<G>(get: &G, key: &str, default: bool) -> Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(RegsyncError::config(format!("{key}='{v}' is not a boolean"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.source_repo, "source.repo.com");
        assert_eq!(
            config.source_api,
            "http://source.repo.com/service/rest/v1/components?repository=source.repo.com"
        );
        assert_eq!(config.destination_url, "https://artifactory.repo.com");
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay(), Duration::from_secs(5));
        assert_eq!(config.work_list_path, PathBuf::from("not_found_images.log"));
        assert!(config.report_path.is_none());
        assert!(config.http.insecure_tls);
    }

    #[test]
    fn test_overrides() {
        let config = MigrationConfig::from_lookup(lookup(&[
            ("NEXUS_REPO", "nexus.local"),
            ("DEST_REPO", "jfrog.local/docker"),
            ("MAX_WORKER", "12"),
            ("MAX_RETRY", "7"),
            ("RETRY_DELAY", "0.5"),
            ("INSECURE_TLS", "false"),
            ("REPORT_PATH", "report.json"),
        ]))
        .unwrap();

        assert_eq!(
            config.source_api,
            "http://nexus.local/service/rest/v1/components?repository=nexus.local"
        );
        assert_eq!(config.destination_url, "https://jfrog.local");
        assert_eq!(config.concurrency, 12);
        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.retry.base_delay(), Duration::from_millis(500));
        assert!(!config.http.insecure_tls);
        assert_eq!(config.report_path, Some(PathBuf::from("report.json")));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = MigrationConfig::from_lookup(lookup(&[("MAX_WORKER", "  ")])).unwrap();
        assert_eq!(config.concurrency, 5);
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = MigrationConfig::from_lookup(lookup(&[("MAX_WORKER", "many")])).unwrap_err();
        assert!(matches!(err, RegsyncError::Config(_)));
        assert!(err.to_string().contains("MAX_WORKER"));
    }

    #[test]
    fn test_negative_delay_rejected() {
        let err = MigrationConfig::from_lookup(lookup(&[("RETRY_DELAY", "-1")])).unwrap_err();
        assert!(matches!(err, RegsyncError::Config(_)));
    }

    #[test]
    fn test_destination_transform_and_search_url() {
        let config = MigrationConfig::new();
        let transform = config.destination_transform();
        assert_eq!(transform.source_prefix(), "source.repo.com");
        assert_eq!(transform.destination_prefix(), "artifactory.repo.com/target");
        assert_eq!(
            config.destination_search_url(),
            "https://artifactory.repo.com/artifactory/api/search/aql"
        );
    }

    #[test]
    fn test_pool_size_at_least_one() {
        assert_eq!(MigrationConfig::new().with_concurrency(0).pool_size(), 1);
    }

    #[test]
    fn test_output_path_builders() {
        let config = MigrationConfig::new()
            .with_remaining_list_path("/data/left.log")
            .with_report_path("/data/report.json");
        assert_eq!(config.remaining_list_path, PathBuf::from("/data/left.log"));
        assert_eq!(config.report_path, Some(PathBuf::from("/data/report.json")));
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", MigrationConfig::new());
        assert!(!rendered.contains("your_password"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_serialize_skips_password() {
        let json = serde_json::to_value(MigrationConfig::new()).unwrap();
        assert!(json.get("destination_password").is_none());
    }
}
