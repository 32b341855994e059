//! Error types for the sync layer.

use entitygraph_client::ClientError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Broad classification of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller asked for an edit that is not allowed.
    Validation,
    /// A predicate, type or prefix could not be resolved.
    Identity,
    /// The entity is in the wrong lifecycle state for the operation.
    State,
    /// The store failed or answered something unusable.
    Remote,
}

/// Errors that can occur while staging or saving edits.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The value is already part of the container.
    #[error("{predicate} already contains {value:?}")]
    DuplicateContent { predicate: String, value: String },

    /// The value is not part of the container.
    #[error("{predicate} does not contain {value:?}")]
    ContentNotFound { predicate: String, value: String },

    /// The detail predicate is not in the allowed set.
    #[error("detail key {0} is not allowed")]
    InvalidDetailKey(String),

    /// No detail to remove.
    #[error("no {detail} detail on {value:?}")]
    DetailNotFound { detail: String, value: String },

    /// Malformed language tag in the configuration.
    #[error("invalid language tag: {0}")]
    InvalidLanguageTag(String),

    /// Types can only be added, and `create` only run, before the entity
    /// exists in the store.
    #[error("entity {0} is already persisted")]
    EntityAlreadyPersisted(String),

    /// The operation needs an entity the store knows about.
    #[error("entity has not been created yet")]
    EntityNotPersisted,

    /// The entity was deleted; it accepts no further operations.
    #[error("entity {0} has been deleted")]
    EntityDeleted(String),

    /// `create` needs at least one asserted type.
    #[error("entity has no type")]
    MissingTypes,

    /// `create` needs at least one staged value.
    #[error("entity has no values")]
    MissingValues,

    /// Namespace resolution or content type failure.
    #[error(transparent)]
    Types(#[from] entitygraph_types::Error),

    /// Transport or HTTP failure, passed through unchanged.
    #[error("remote error: {0}")]
    Remote(#[from] ClientError),

    /// The store answered with something the protocol does not expect.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SyncError {
    /// Which of the four broad failure classes this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::DuplicateContent { .. }
            | SyncError::ContentNotFound { .. }
            | SyncError::InvalidDetailKey(_)
            | SyncError::DetailNotFound { .. }
            | SyncError::InvalidLanguageTag(_) => ErrorKind::Validation,
            SyncError::EntityAlreadyPersisted(_)
            | SyncError::EntityNotPersisted
            | SyncError::EntityDeleted(_)
            | SyncError::MissingTypes
            | SyncError::MissingValues => ErrorKind::State,
            SyncError::Types(e) if e.is_identity() => ErrorKind::Identity,
            SyncError::Types(_) => ErrorKind::Validation,
            SyncError::Remote(_) | SyncError::Protocol(_) => ErrorKind::Remote,
        }
    }

    /// The HTTP status of a remote failure, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Remote(e) => e.status(),
            _ => None,
        }
    }
}
