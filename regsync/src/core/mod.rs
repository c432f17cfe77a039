//! Core types: artifact identifiers, copy outcomes and run reports.

mod identifier;
mod outcome;
mod report;

pub use identifier::{ArtifactIdentifier, DestinationTransform, IdentifierParseError};
pub use outcome::{CopyOutcome, CopyStatus};
pub use report::{MigrationReport, MigrationSummary};
