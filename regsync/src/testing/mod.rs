//! Testing utilities for regsync.
//!
//! This module provides:
//! - A scripted copy primitive with per-source failure control
//! - An observer that records copy events
//! - A canned-response HTTP server for inventory adapters

#[cfg(feature = "http")]
mod http_stub;
mod mocks;
mod observers;

#[cfg(feature = "http")]
pub use http_stub::{local_http_client, RecordedRequest, StubResponse, StubServer};
pub use mocks::ScriptedCopier;
pub use observers::CollectingCopyObserver;
