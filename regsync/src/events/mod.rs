//! Copy progress events.
//!
//! Every copy attempt is reported to a [`CopyObserver`] with the image pair
//! and attempt number so operators can follow retry progression live.

mod observer;

pub use observer::{CopyEvent, CopyObserver, LoggingCopyObserver, NoOpCopyObserver};
