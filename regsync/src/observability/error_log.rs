//! Append-only error log fed by `tracing`.
//!
//! Every `ERROR` event becomes one line:
//! `{RFC3339 timestamp} - ERROR - {message}`.
//!
//! A lost write cannot be reported through `tracing` itself, so the layer
//! latches the first failure in an [`ErrorLogHealth`] that the caller checks
//! before declaring a run finished.

use parking_lot::Mutex;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::errors::{RegsyncError, Result};
use crate::utils::iso_timestamp;

/// A layer that appends error events to a file.
pub struct ErrorLogLayer {
    writer: Mutex<Box<dyn Write + Send>>,
    health: ErrorLogHealth,
}

/// Shared record of the first write failure on an [`ErrorLogLayer`].
#[derive(Debug, Clone, Default)]
pub struct ErrorLogHealth {
    failure: Arc<Mutex<Option<(io::ErrorKind, String)>>>,
}

impl ErrorLogHealth {
    /// Returns the first write or flush error the log hit, if any.
    pub fn check(&self) -> io::Result<()> {
        match &*self.failure.lock() {
            Some((kind, message)) => Err(io::Error::new(*kind, message.clone())),
            None => Ok(()),
        }
    }

    fn record(&self, err: &io::Error) {
        let mut failure = self.failure.lock();
        if failure.is_none() {
            *failure = Some((err.kind(), err.to_string()));
        }
    }
}

impl ErrorLogLayer {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| RegsyncError::persistence(path, e))?;
        Ok(Self::from_writer(file))
    }

    /// Writes to an arbitrary sink.
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            health: ErrorLogHealth::default(),
        }
    }

    /// A handle that reports whether any line failed to reach the sink.
    #[must_use]
    pub fn health(&self) -> ErrorLogHealth {
        self.health.clone()
    }
}

impl std::fmt::Debug for ErrorLogLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorLogLayer").finish_non_exhaustive()
    }
}

impl<S: Subscriber> Layer<S> for ErrorLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level != Level::ERROR {
            return;
        }

        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let line = format!("{} - {} - {}\n", iso_timestamp(), level, visitor.finish());

        let mut writer = self.writer.lock();
        if let Err(err) = writer.write_all(line.as_bytes()).and_then(|()| writer.flush()) {
            self.health.record(&err);
        }
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tracing::{error, info, warn};
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// A sink whose disk is full.
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).to_string()
        }
    }

    #[test]
    fn test_only_errors_are_written() {
        let buf = SharedBuf::default();
        let subscriber =
            tracing_subscriber::registry().with(ErrorLogLayer::from_writer(buf.clone()));

        tracing::subscriber::with_default(subscriber, || {
            info!("Copying a -> b");
            warn!("attempt 1 failed");
            error!("Failed to copy {} after {} attempts", "repo/app:1.0", 3);
        });

        let contents = buf.contents();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(" - ERROR - Failed to copy repo/app:1.0 after 3 attempts"));
        assert!(lines[0].contains('T'));
    }

    #[test]
    fn test_structured_fields_are_appended() {
        let buf = SharedBuf::default();
        let subscriber =
            tracing_subscriber::registry().with(ErrorLogLayer::from_writer(buf.clone()));

        tracing::subscriber::with_default(subscriber, || {
            error!(inventory = "nexus", "Listing failed");
        });

        assert!(buf.contents().contains("ERROR - Listing failed inventory=nexus"));
    }

    #[test]
    fn test_open_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migration_errors.log");
        std::fs::write(&path, "earlier\n").unwrap();

        let subscriber = tracing_subscriber::registry().with(ErrorLogLayer::open(&path).unwrap());
        tracing::subscriber::with_default(subscriber, || {
            error!("boom");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("earlier\n"));
        assert!(contents.trim_end().ends_with(" - ERROR - boom"));
    }

    #[test]
    fn test_open_in_missing_directory_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent_dir").join("migration_errors.log");

        let err = ErrorLogLayer::open(&path).unwrap_err();

        assert!(matches!(err, RegsyncError::Persistence { .. }));
        assert!(err.to_string().contains("migration_errors.log"));
    }

    #[test]
    fn test_write_failure_is_latched() {
        let layer = ErrorLogLayer::from_writer(FullDisk);
        let health = layer.health();

        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            info!("never written");
            assert!(health.check().is_ok());
            error!("first");
            error!("second");
        });

        let err = health.check().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert!(err.to_string().contains("no space left"));
    }

    #[test]
    fn test_successful_writes_keep_health_clean() {
        let buf = SharedBuf::default();
        let layer = ErrorLogLayer::from_writer(buf.clone());
        let health = layer.health();

        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            error!("boom");
        });

        assert!(health.check().is_ok());
        assert!(!buf.contents().is_empty());
    }
}
