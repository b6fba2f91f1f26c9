//! Error types for the inkling sync engine.

use thiserror::Error;

use crate::paths::CollectionKind;

/// Result type alias using inkling's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for inkling operations.
///
/// All payloads are owned strings so the enum is `Clone`: subscription
/// pushes carry `Result<DocumentSet>` over broadcast channels, which
/// requires cloneable values.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Identity resolution failed. Terminal for the session.
    #[error("Auth error: {0}")]
    Auth(String),

    /// A subscription delivered a failure. Sticky until the cache is
    /// reopened; scoped to a single collection.
    #[error("Sync error ({collection}): {message}")]
    Sync {
        collection: CollectionKind,
        message: String,
    },

    /// A create/update/delete command failed.
    #[error("Mutation error ({operation}): {message}")]
    Mutation {
        operation: String,
        entity_id: Option<String>,
        message: String,
    },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Remote store operation failed
    #[error("Store error: {0}")]
    Store(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Collection-scoped sync failure.
    pub fn sync(collection: CollectionKind, message: impl Into<String>) -> Self {
        Error::Sync {
            collection,
            message: message.into(),
        }
    }

    /// Mutation failure for a named operation, optionally scoped to an entity.
    pub fn mutation(
        operation: impl Into<String>,
        entity_id: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Mutation {
            operation: operation.into(),
            entity_id,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
