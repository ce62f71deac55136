//! Error types for object-store operations.

use std::io;
use thiserror::Error;

use crate::types::ObjectId;

/// Result type for object-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors an object store can return from a primitive.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No object exists with the given id.
    #[error("object not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: ObjectId,
    },

    /// A directory has no entry with the given name.
    #[error("no entry named {name:?} in {parent}")]
    NameNotFound {
        /// The directory searched.
        parent: ObjectId,
        /// The name, lossily decoded.
        name: String,
    },

    /// A name or object id is already taken.
    #[error("already exists: {what}")]
    AlreadyExists {
        /// What collided.
        what: String,
    },

    /// A directory operation was attempted on a non-directory.
    #[error("not a directory: {id}")]
    NotDirectory {
        /// The offending object.
        id: ObjectId,
    },

    /// A file operation was attempted on a directory.
    #[error("is a directory: {id}")]
    IsDirectory {
        /// The offending object.
        id: ObjectId,
    },

    /// A directory to be removed still has entries.
    #[error("directory not empty: {id}")]
    NotEmpty {
        /// The directory.
        id: ObjectId,
    },

    /// The store does not implement the requested primitive.
    #[error("operation not supported: {operation}")]
    Unsupported {
        /// The primitive that was called.
        operation: String,
    },

    /// I/O error in the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(id: ObjectId) -> Self {
        Self::NotFound { id }
    }

    /// Creates a name-not-found error.
    pub fn name_not_found(parent: ObjectId, name: &[u8]) -> Self {
        Self::NameNotFound {
            parent,
            name: String::from_utf8_lossy(name).into_owned(),
        }
    }

    /// Creates an already-exists error.
    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists { what: what.into() }
    }

    /// Creates an unsupported-operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Returns true if this is an object-id lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
