//! Content-derived value identifiers.
//!
//! The remote store exposes no ids for individual predicate values, so a value
//! is addressed by `sha256(canonical predicate URI ++ value)`. The predicate and
//! value are concatenated without a separator, so `("ab", "c")` and
//! `("a", "bc")` collide.

use crate::{Error, NamespaceResolver, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Lowercase hex SHA-256 identifying one (predicate, value) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentIdentifier(String);

impl ContentIdentifier {
    /// Derives the identifier for a predicate given as URI or prefixed key.
    pub fn derive(resolver: &NamespaceResolver, predicate: &str, value: &str) -> Result<Self> {
        let canonical = resolver
            .canonical_uri(predicate)
            .map_err(|e| Error::InvalidPredicate {
                predicate: predicate.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::from_canonical(&canonical, value))
    }

    /// Derives the identifier for an already canonical predicate URI.
    #[must_use]
    pub fn from_canonical(predicate_uri: &str, value: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(predicate_uri.as_bytes());
        hasher.update(value.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
