//! Fetch protocol implementation for Marrow.
//!
//! This crate implements the client half of one smart-HTTP fetch
//! round-trip: reference advertisement, pack negotiation, pack file
//! parsing, and delta resolution against the local object store.

mod client;
mod delta;
mod error;
mod fetch;
mod pack;
mod pktline;

pub use client::{parse_advertisement, verify_fetch_response, RefAdvertisement, RemoteClient};
pub use delta::{apply, resolve, RefDelta};
pub use error::ProtocolError;
pub use fetch::clone_repository;
pub use pack::{PackParser, UnpackOutcome};
pub use pktline::{PktLine, PktLineReader, PktLineWriter};

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
