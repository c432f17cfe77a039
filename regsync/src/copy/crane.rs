//! `crane cp` as a copy primitive.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::CopyPrimitive;
use crate::errors::CopyError;

/// Runs `crane cp [--insecure] SRC DST` for each copy.
#[derive(Debug, Clone)]
pub struct CraneCopier {
    binary: String,
    insecure: bool,
}

impl Default for CraneCopier {
    fn default() -> Self {
        Self {
            binary: "crane".to_string(),
            insecure: true,
        }
    }
}

impl CraneCopier {
    /// Creates a copier that runs `crane` from `PATH` with TLS checks off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the executable to run.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Sets whether `--insecure` is passed.
    #[must_use]
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// The executable being run.
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Command-line arguments for one copy.
    #[must_use]
    pub fn args(&self, source: &str, destination: &str) -> Vec<String> {
        let mut args = vec!["cp".to_string()];
        if self.insecure {
            args.push("--insecure".to_string());
        }
        args.push(source.to_string());
        args.push(destination.to_string());
        args
    }
}

#[async_trait]
impl CopyPrimitive for CraneCopier {
    async fn copy(&self, source: &str, destination: &str) -> Result<(), CopyError> {
        let args = self.args(source, destination);
        debug!(binary = %self.binary, ?args, "Running copy command");

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CopyError::unexpected(format!("failed to run {}: {e}", self.binary)))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(CopyError::failed(output.status.code(), stderr))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_args_insecure() {
        let copier = CraneCopier::new();
        assert_eq!(
            copier.args("src/app:1", "dst/app:1"),
            vec!["cp", "--insecure", "src/app:1", "dst/app:1"]
        );
    }

    #[test]
    fn test_args_secure() {
        let copier = CraneCopier::new().with_insecure(false);
        assert_eq!(copier.args("a", "b"), vec!["cp", "a", "b"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let copier = CraneCopier::new().with_binary("true");
        assert!(copier.copy("a", "b").await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_retryable_failure() {
        let copier = CraneCopier::new().with_binary("false");
        let err = copier.copy("a", "b").await.unwrap_err();
        assert!(matches!(err, CopyError::Failed { code: Some(1), .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_binary_is_unexpected() {
        let copier = CraneCopier::new().with_binary("regsync-no-such-copier-binary");
        let err = copier.copy("a", "b").await.unwrap_err();
        assert!(matches!(err, CopyError::Unexpected(_)));
    }
}
