use std::fmt;

use serde::{Deserialize, Serialize};

/// Domain tag mixed into every etag computation.
const ETAG_DOMAIN: &str = "objstore-body-v1";

/// Content hash of an object body.
///
/// The etag is a domain-separated BLAKE3 hash rendered as lowercase hex.
/// Identical bytes always produce the same etag, which is what makes the
/// "write the same body twice" no-op check possible.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Etag(String);

impl Etag {
    /// Compute the etag of a body.
    pub fn of(body: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(ETAG_DOMAIN.as_bytes());
        hasher.update(b":");
        hasher.update(body);
        Self(hex::encode(hasher.finalize().as_bytes()))
    }

    /// Wrap an etag that was previously computed and persisted.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 8 hex characters) for log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }

    /// Returns `true` if `body` hashes to this etag.
    pub fn matches(&self, body: &[u8]) -> bool {
        Self::of(body) == *self
    }
}

impl fmt::Debug for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Etag({})", self.short())
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Etag> for String {
    fn from(etag: Etag) -> Self {
        etag.0
    }
}
