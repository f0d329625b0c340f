//! Commit object codec.
//!
//! The write path serializes a full commit; the fetch path only ever needs
//! to locate the tree id inside a raw commit buffer, so the decode side is
//! limited to that scan.

use crate::{ObjectId, Result, StorageError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Author or committer identity with timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Display name.
    pub name: String,
    /// Email address, stored without the angle brackets.
    pub email: String,
    /// Seconds since the unix epoch.
    pub timestamp: u64,
    /// Timezone offset in `±HHMM` form.
    pub timezone: String,
}

impl Signature {
    /// Creates a signature with an explicit timestamp.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        timestamp: u64,
        timezone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            timestamp,
            timezone: timezone.into(),
        }
    }

    /// Builds a signature from `GIT_AUTHOR_NAME` / `GIT_AUTHOR_EMAIL` and
    /// the current clock, falling back to built-in defaults.
    pub fn from_env() -> Self {
        let name =
            std::env::var("GIT_AUTHOR_NAME").unwrap_or_else(|_| "Marrow Contributors".to_string());
        let email =
            std::env::var("GIT_AUTHOR_EMAIL").unwrap_or_else(|_| "marrow@localhost".to_string());
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::new(name, email, timestamp, "+0000")
    }

    fn encode_into(&self, role: &str, out: &mut Vec<u8>) {
        out.extend_from_slice(role.as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.name.as_bytes());
        out.extend_from_slice(b" <");
        out.extend_from_slice(self.email.as_bytes());
        out.extend_from_slice(b"> ");
        out.extend_from_slice(self.timestamp.to_string().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.timezone.as_bytes());
        out.push(b'\n');
    }
}

/// A commit: tree pointer, optional parent, identities, and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Id of the root tree.
    pub tree: ObjectId,
    /// Optional parent commit id.
    pub parent: Option<ObjectId>,
    /// Author identity.
    pub author: Signature,
    /// Committer identity.
    pub committer: Signature,
    /// Free-text message.
    pub message: String,
}

impl Commit {
    /// Creates a commit where the committer mirrors the author.
    pub fn new(
        tree: ObjectId,
        parent: Option<ObjectId>,
        author: Signature,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tree,
            parent,
            committer: author.clone(),
            author,
            message: message.into(),
        }
    }

    /// Serializes the commit body.
    ///
    /// Header lines in fixed order (`tree`, optional `parent`, `author`,
    /// `committer`), one blank line, then the newline-terminated message.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"tree ");
        out.extend_from_slice(self.tree.to_hex().as_bytes());
        out.push(b'\n');
        if let Some(parent) = &self.parent {
            out.extend_from_slice(b"parent ");
            out.extend_from_slice(parent.to_hex().as_bytes());
            out.push(b'\n');
        }
        self.author.encode_into("author", &mut out);
        self.committer.encode_into("committer", &mut out);
        out.push(b'\n');
        out.extend_from_slice(self.message.as_bytes());
        if !self.message.ends_with('\n') {
            out.push(b'\n');
        }
        out
    }

    /// Extracts the tree id from a raw commit buffer.
    ///
    /// Scans for the `tree ` marker and reads the 40 hex characters that
    /// follow it — the minimum parse needed to materialize a working tree
    /// from a fetched commit.
    pub fn tree_id_of(raw: &[u8]) -> Result<ObjectId> {
        const MARKER: &[u8] = b"tree ";
        let start = raw
            .windows(MARKER.len())
            .position(|w| w == MARKER)
            .ok_or_else(|| {
                StorageError::CorruptObject("commit has no tree header".to_string())
            })?;
        let hex_start = start + MARKER.len();
        let hex = raw.get(hex_start..hex_start + 40).ok_or_else(|| {
            StorageError::CorruptObject("commit tree id truncated".to_string())
        })?;
        let hex = std::str::from_utf8(hex)
            .map_err(|_| StorageError::CorruptObject("commit tree id not hex".to_string()))?;
        ObjectId::from_hex(hex)
            .map_err(|_| StorageError::CorruptObject("commit tree id not hex".to_string()))
    }
}
