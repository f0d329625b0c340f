//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested object does not exist in the store.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// A stored object's bytes do not match their declared framing.
    #[error("corrupt object: {0}")]
    CorruptObject(String),

    /// An object id, type, or mode string could not be parsed.
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// The requested reference does not exist.
    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// A reference file has an unexpected shape.
    #[error("invalid ref: {0}")]
    InvalidRef(String),
}
