//! Object storage for Marrow.
//!
//! This crate provides content-addressed loose-object storage for version
//! control objects (blobs, trees, commits), reference management, and the
//! codecs that map trees and commits to their on-disk byte encodings.

mod commit;
mod error;
mod object;
mod refs;
mod repo;
mod store;
mod tree;
mod worktree;

pub use commit::{Commit, Signature};
pub use error::StorageError;
pub use object::{GitObject, ObjectId, ObjectType};
pub use refs::{RefStore, Reference};
pub use repo::Repository;
pub use store::ObjectStore;
pub use tree::{FileMode, Tree, TreeEntry};
pub use worktree::{checkout, snapshot};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
