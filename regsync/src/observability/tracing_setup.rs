//! Tracing subscriber initialization for the `regsync` binary.
//!
//! # Priority (highest to lowest)
//!
//! 1. `REGSYNC_LOG` env var (per-target directives, e.g. `regsync=debug,warn`)
//! 2. `RUST_LOG` env var
//! 3. CLI flags (`-v` → debug, `-q` → error)
//! 4. Default level: `info`
//!
//! The error log layer sits beside the console filter, so error lines are
//! written even when the console is quieted.

use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use super::ErrorLogLayer;

/// Environment variable with project-specific filter directives.
pub const LOG_ENV_VAR: &str = "REGSYNC_LOG";

/// Verbosity level derived from CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// `--quiet` / `-q`: only errors.
    Quiet,
    /// Default: progress and above.
    Normal,
    /// `--verbose` / `-v`: debug-level output.
    Verbose,
}

impl Verbosity {
    /// Determine verbosity from the parsed CLI flags; verbose wins.
    #[must_use]
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    /// Map to a default `tracing::Level`.
    #[must_use]
    pub const fn default_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
        }
    }
}

/// Console output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Installs the global subscriber: console output on stderr plus the
/// optional error log.
pub fn init_subscriber(
    verbosity: Verbosity,
    format: LogFormat,
    error_log: Option<ErrorLogLayer>,
) -> Result<(), TryInitError> {
    let filter = build_env_filter(verbosity);

    let console: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => {
            let use_ansi = std::io::IsTerminal::is_terminal(&std::io::stderr());
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(use_ansi)
                .with_target(verbosity == Verbosity::Verbose)
                .with_filter(filter)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(console)
        .with(error_log)
        .try_init()
}

/// Build an `EnvFilter` respecting `REGSYNC_LOG` > `RUST_LOG` > verbosity.
fn build_env_filter(verbosity: Verbosity) -> EnvFilter {
    if let Ok(directives) = std::env::var(LOG_ENV_VAR) {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = verbosity.default_level();
    let directive = if verbosity == Verbosity::Verbose {
        format!("warn,regsync={level}")
    } else {
        level.to_string()
    };
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Verbose);
    }

    #[test]
    fn default_level_mapping() {
        assert_eq!(Verbosity::Quiet.default_level(), Level::ERROR);
        assert_eq!(Verbosity::Normal.default_level(), Level::INFO);
        assert_eq!(Verbosity::Verbose.default_level(), Level::DEBUG);
    }

    #[test]
    fn build_env_filter_produces_valid_filter() {
        let _filter = build_env_filter(Verbosity::Normal);
        let _filter = build_env_filter(Verbosity::Verbose);
        let _filter = build_env_filter(Verbosity::Quiet);
    }
}
