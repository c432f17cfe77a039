//! Observability utilities.

mod error_log;
mod tracing_setup;

pub use error_log::{ErrorLogHealth, ErrorLogLayer};
pub use tracing_setup::{init_subscriber, LogFormat, Verbosity, LOG_ENV_VAR};
