//! Artifact identifiers and the prefix rewrite used to build copy targets.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Error raised when a canonical identifier string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid artifact identifier '{input}': {reason}")]
pub struct IdentifierParseError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

impl IdentifierParseError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// The atomic unit of migration: `{prefix}/{name}:{tag}`.
///
/// Equality, hashing and ordering all use the canonical string, so two
/// identifiers whose parts differ but render identically are the same
/// artifact. Tags are compared exactly; no case or metadata folding.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactIdentifier {
    repository_prefix: String,
    name: String,
    tag: String,
    canonical: String,
}

impl ArtifactIdentifier {
    /// Builds an identifier from its parts.
    ///
    /// Parts are kept verbatim. Returns `None` when any part is empty, which
    /// is how inventory adapters skip malformed entries.
    #[must_use]
    pub fn new(
        repository_prefix: impl Into<String>,
        name: impl Into<String>,
        tag: impl Into<String>,
    ) -> Option<Self> {
        let repository_prefix = repository_prefix.into();
        let name = name.into();
        let tag = tag.into();

        if repository_prefix.is_empty() || name.is_empty() || tag.is_empty() {
            return None;
        }

        let canonical = format!("{repository_prefix}/{name}:{tag}");
        Some(Self {
            repository_prefix,
            name,
            tag,
            canonical,
        })
    }

    /// The registry prefix (e.g. `source.repo.com`).
    #[must_use]
    pub fn repository_prefix(&self) -> &str {
        &self.repository_prefix
    }

    /// The slash-separated artifact path (e.g. `group/app`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The version label.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The canonical `{prefix}/{name}:{tag}` form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

impl FromStr for ArtifactIdentifier {
    type Err = IdentifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let last_slash = input
            .rfind('/')
            .ok_or_else(|| IdentifierParseError::new(input, "missing '/' separator"))?;

        // A ':' before the last '/' belongs to a host:port prefix, not the tag.
        let tag_sep = input[last_slash..]
            .rfind(':')
            .map(|i| i + last_slash)
            .ok_or_else(|| IdentifierParseError::new(input, "missing ':tag' suffix"))?;

        let (path, tag) = (&input[..tag_sep], &input[tag_sep + 1..]);
        let (prefix, name) = path
            .split_once('/')
            .ok_or_else(|| IdentifierParseError::new(input, "missing repository prefix"))?;

        if name.split('/').any(str::is_empty) {
            return Err(IdentifierParseError::new(input, "empty path segment"));
        }

        Self::new(prefix, name, tag)
            .ok_or_else(|| IdentifierParseError::new(input, "empty prefix, name or tag"))
    }
}

impl TryFrom<String> for ArtifactIdentifier {
    type Error = IdentifierParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ArtifactIdentifier> for String {
    fn from(id: ArtifactIdentifier) -> Self {
        id.canonical
    }
}

impl fmt::Display for ArtifactIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl fmt::Debug for ArtifactIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArtifactIdentifier({})", self.canonical)
    }
}

impl PartialEq for ArtifactIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for ArtifactIdentifier {}

impl Hash for ArtifactIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for ArtifactIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ArtifactIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

/// Rewrites a source identifier into its destination location by swapping
/// the leading source prefix for the destination prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationTransform {
    source_prefix: String,
    destination_prefix: String,
}

impl DestinationTransform {
    /// Creates a transform from `source_prefix` to `destination_prefix`.
    #[must_use]
    pub fn new(source_prefix: impl Into<String>, destination_prefix: impl Into<String>) -> Self {
        Self {
            source_prefix: source_prefix.into().trim_end_matches('/').to_string(),
            destination_prefix: destination_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// The prefix being replaced.
    #[must_use]
    pub fn source_prefix(&self) -> &str {
        &self.source_prefix
    }

    /// The replacement prefix.
    #[must_use]
    pub fn destination_prefix(&self) -> &str {
        &self.destination_prefix
    }

    /// Returns the target location, or `None` if the identifier does not
    /// live under the source prefix.
    #[must_use]
    pub fn apply(&self, id: &ArtifactIdentifier) -> Option<String> {
        let rest = id
            .as_str()
            .strip_prefix(self.source_prefix.as_str())?
            .strip_prefix('/')?;
        Some(format!("{}/{rest}", self.destination_prefix))
    }
}
