//! Object types and identity.

use crate::{Result, StorageError};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::fmt;

/// A 20-byte SHA-1 object identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// Creates an ObjectId from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an ObjectId from a 20-byte slice.
    pub fn from_raw(raw: &[u8]) -> Result<Self> {
        let bytes: [u8; 20] = raw.try_into().map_err(|_| {
            StorageError::InvalidObject(format!("invalid object id length: {}", raw.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Creates an ObjectId from a 40-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.len() != 40 {
            return Err(StorageError::InvalidObject(format!(
                "invalid object id length: {}",
                hex.len()
            )));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex, &mut bytes)
            .map_err(|e| StorageError::InvalidObject(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns the hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Computes the SHA-1 hash of data framed with an object header.
    ///
    /// The hashed bytes are exactly `"<type> <len>\0"` followed by the
    /// content, so two objects with identical type and content always
    /// collide to the same id.
    pub fn hash_object(object_type: ObjectType, data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(object_type.as_str().as_bytes());
        hasher.update(b" ");
        hasher.update(data.len().to_string().as_bytes());
        hasher.update(b"\0");
        hasher.update(data);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Object types stored by Marrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// File content.
    Blob,
    /// Directory listing.
    Tree,
    /// Commit object.
    Commit,
}

impl ObjectType {
    /// Returns the string used in the loose object header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        }
    }

    /// Parses an object type from its header string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            _ => Err(StorageError::InvalidObject(format!(
                "unknown object type: {}",
                s
            ))),
        }
    }

    /// Returns the numeric tag used in pack entry headers.
    pub fn pack_type(&self) -> u8 {
        match self {
            Self::Commit => 1,
            Self::Tree => 2,
            Self::Blob => 3,
        }
    }

    /// Parses an object type from a pack entry tag.
    pub fn from_pack_type(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::Commit),
            2 => Ok(Self::Tree),
            3 => Ok(Self::Blob),
            _ => Err(StorageError::InvalidObject(format!(
                "unknown pack type: {}",
                code
            ))),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed, immutable object (blob, tree, or commit).
#[derive(Debug, Clone)]
pub struct GitObject {
    /// The object's content hash.
    pub id: ObjectId,
    /// The type of object.
    pub object_type: ObjectType,
    /// The raw object content (uncompressed, unframed).
    pub data: Bytes,
}

impl GitObject {
    /// Creates a new object, computing its id from type and content.
    pub fn new(object_type: ObjectType, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let id = ObjectId::hash_object(object_type, &data);
        Self {
            id,
            object_type,
            data,
        }
    }

    /// Creates a blob object from file content.
    pub fn blob(content: impl Into<Bytes>) -> Self {
        Self::new(ObjectType::Blob, content)
    }

    /// Returns the size of the object content.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_hex_roundtrip() {
        let hex = "a94a8fe5ccb19ba61c4c0873d391e987982fbbd3";
        let id = ObjectId::from_hex(hex).unwrap();
        assert_eq!(id.to_hex(), hex);
    }

    #[test]
    fn test_object_id_from_raw() {
        let raw = [0xabu8; 20];
        let id = ObjectId::from_raw(&raw).unwrap();
        assert_eq!(*id.as_bytes(), raw);

        assert!(ObjectId::from_raw(&[0u8; 19]).is_err());
        assert!(ObjectId::from_raw(&[0u8; 21]).is_err());
    }

    #[test]
    fn test_object_id_invalid_hex() {
        assert!(ObjectId::from_hex("abc").is_err());
        assert!(ObjectId::from_hex(&"z".repeat(40)).is_err());
    }

    #[test]
    fn test_blob_hash_known_values() {
        // Fixed values any compatible implementation must reproduce.
        let obj = GitObject::blob(b"hello".to_vec());
        assert_eq!(obj.id.to_hex(), "b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0");

        let obj = GitObject::blob(b"hello\n".to_vec());
        assert_eq!(obj.id.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");

        let obj = GitObject::blob(b"".to_vec());
        assert_eq!(obj.id.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = ObjectId::hash_object(ObjectType::Blob, b"content");
        let b = ObjectId::hash_object(ObjectType::Blob, b"content");
        assert_eq!(a, b);

        // Same bytes under a different type hash differently.
        let c = ObjectId::hash_object(ObjectType::Tree, b"content");
        assert_ne!(a, c);
    }

    #[test]
    fn test_object_type_roundtrip() {
        for ot in [ObjectType::Blob, ObjectType::Tree, ObjectType::Commit] {
            assert_eq!(ObjectType::parse(ot.as_str()).unwrap(), ot);
            assert_eq!(ObjectType::from_pack_type(ot.pack_type()).unwrap(), ot);
        }
    }

    #[test]
    fn test_object_type_parse_invalid() {
        assert!(ObjectType::parse("tag").is_err());
        assert!(ObjectType::parse("").is_err());
        assert!(ObjectType::from_pack_type(0).is_err());
        assert!(ObjectType::from_pack_type(6).is_err());
        assert!(ObjectType::from_pack_type(7).is_err());
    }

    #[test]
    fn test_object_id_display() {
        let id = ObjectId::from_bytes([0u8; 20]);
        assert_eq!(format!("{}", id), "0".repeat(40));
    }

    #[test]
    fn test_git_object_size() {
        let obj = GitObject::blob(b"12345".to_vec());
        assert_eq!(obj.size(), 5);
        assert_eq!(obj.object_type, ObjectType::Blob);
    }
}
