//! Core type definitions for entitygraph.
//!
//! This crate defines the pure, I/O-free building blocks the sync layer
//! operates on:
//! - [`NamespaceResolver`]: bidirectional mapping between predicate URIs and
//!   `prefix.localName` keys
//! - [`PredicateKey`]: a predicate that is known to resolve
//! - [`ContentIdentifier`]: the content-derived hash that addresses one
//!   (predicate, value) pair on the remote store
//! - [`Content`] / [`DetailContent`]: what predicate and detail containers hold
//!
//! Everything here is immutable after construction and safe to share across
//! threads.

mod content;
mod identifier;
mod namespace;

pub use content::{Content, ContentKind, DetailContent};
pub use identifier::ContentIdentifier;
pub use namespace::{NamespaceEntry, NamespaceResolver, PredicateKey, PREFIX_SEPARATOR};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("no registered namespace matches {0}")]
    UnknownNamespace(String),

    #[error("unknown prefix in {0}")]
    UnknownPrefix(String),

    #[error("invalid predicate {predicate}: {reason}")]
    InvalidPredicate { predicate: String, reason: String },

    #[error("prefix {0} is already registered")]
    DuplicatePrefix(String),

    #[error("namespace {0} is already registered")]
    DuplicateNamespace(String),

    #[error("invalid content type: expected {expected}, got {actual}")]
    InvalidContentType { expected: String, actual: String },
}

impl Error {
    /// Returns true for resolution failures caused by a missing namespace
    /// registration (as opposed to malformed input).
    pub fn is_identity(&self) -> bool {
        matches!(self, Error::UnknownNamespace(_) | Error::UnknownPrefix(_))
    }
}
