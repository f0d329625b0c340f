//! Protocol error types.

use marrow_storage::{ObjectId, StorageError};
use thiserror::Error;

/// Errors that can occur during a fetch round-trip.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP failure, bad negotiation, or checksum mismatch.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Malformed pkt-line framing.
    #[error("invalid pkt-line: {0}")]
    InvalidPktLine(String),

    /// Pack header or record invariant violated.
    #[error("corrupt pack: {0}")]
    CorruptPack(String),

    /// A ref-delta names a base that is not resolvable.
    #[error("missing delta base: {0}")]
    MissingBase(ObjectId),

    /// A delta stream's declared sizes do not match reality.
    #[error("delta size mismatch: {0}")]
    DeltaSizeMismatch(String),

    /// A delta copy instruction reaches outside the base object.
    #[error("delta copy out of range: {0}")]
    DeltaRange(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
