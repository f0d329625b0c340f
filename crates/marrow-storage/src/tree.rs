//! Tree object codec.
//!
//! A tree body is a concatenation of `"<mode> <name>\0"` followed by the
//! referenced object's 20 raw id bytes, one record per entry, ordered by raw
//! byte comparison of the entry names. The ordering is load-bearing: two
//! logically identical directories must serialize to byte-identical bodies
//! so that they hash to the same id.

use crate::{ObjectId, Result, StorageError};

/// Entry modes that can appear in a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Regular file (100644).
    Regular,
    /// Executable file (100755).
    Executable,
    /// Symbolic link (120000).
    Symlink,
    /// Subtree (40000).
    Directory,
}

impl FileMode {
    /// Returns the octal string written into the tree body.
    pub fn as_octal(&self) -> &'static str {
        match self {
            Self::Regular => "100644",
            Self::Executable => "100755",
            Self::Symlink => "120000",
            Self::Directory => "40000",
        }
    }

    /// Parses a mode from the octal bytes found in a tree body.
    pub fn from_octal(mode: &[u8]) -> Result<Self> {
        match mode {
            b"100644" | b"100664" | b"100640" => Ok(Self::Regular),
            b"100755" => Ok(Self::Executable),
            b"120000" => Ok(Self::Symlink),
            b"40000" | b"040000" => Ok(Self::Directory),
            other => Err(StorageError::CorruptObject(format!(
                "unknown tree entry mode: {}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// Returns the full numeric mode value.
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Directory => 0o040000,
        }
    }

    /// Returns the permission bits (the low 9 bits of the mode).
    pub fn permissions(&self) -> u32 {
        self.mode_bits() & 0o777
    }

    /// Returns true for subtree entries.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

/// A single (mode, name, id) tree record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Entry mode.
    pub mode: FileMode,
    /// Path segment, without separators.
    pub name: String,
    /// Id of the referenced blob or subtree.
    pub id: ObjectId,
}

impl TreeEntry {
    /// Creates a new tree entry.
    pub fn new(mode: FileMode, name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            id,
        }
    }
}

/// Tree body encoder/decoder.
pub struct Tree;

impl Tree {
    /// Serializes entries into a tree body, sorting by raw name bytes.
    ///
    /// The sort key is the undecorated name, not the `"<mode> <name>"`
    /// string a record begins with.
    pub fn encode(entries: &[TreeEntry]) -> Vec<u8> {
        let mut sorted: Vec<&TreeEntry> = entries.iter().collect();
        sorted.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));

        let mut body = Vec::new();
        for entry in sorted {
            body.extend_from_slice(entry.mode.as_octal().as_bytes());
            body.push(b' ');
            body.extend_from_slice(entry.name.as_bytes());
            body.push(b'\0');
            body.extend_from_slice(entry.id.as_bytes());
        }
        body
    }

    /// Parses a tree body back into its entries.
    pub fn decode(body: &[u8]) -> Result<Vec<TreeEntry>> {
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < body.len() {
            let nul = body[pos..]
                .iter()
                .position(|&b| b == b'\0')
                .ok_or_else(|| {
                    StorageError::CorruptObject("tree entry missing name terminator".to_string())
                })?;
            let head = &body[pos..pos + nul];
            let space = head.iter().position(|&b| b == b' ').ok_or_else(|| {
                StorageError::CorruptObject("tree entry missing mode separator".to_string())
            })?;

            let mode = FileMode::from_octal(&head[..space])?;
            let name = std::str::from_utf8(&head[space + 1..])
                .map_err(|_| StorageError::CorruptObject("tree entry name not UTF-8".to_string()))?
                .to_string();
            if name.is_empty() {
                return Err(StorageError::CorruptObject(
                    "tree entry with empty name".to_string(),
                ));
            }

            pos += nul + 1;
            if pos + 20 > body.len() {
                return Err(StorageError::CorruptObject(
                    "tree entry id truncated".to_string(),
                ));
            }
            let id = ObjectId::from_raw(&body[pos..pos + 20])?;
            pos += 20;

            entries.push(TreeEntry { mode, name, id });
        }

        Ok(entries)
    }
}
