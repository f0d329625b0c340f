//! Loose object store.
//!
//! Objects live at `objects/<first-2-hex>/<remaining-38-hex>` under the
//! repository directory. Each file holds the zlib-compressed framed buffer
//! `"<type> <len>\0<content>"`.

use crate::{GitObject, ObjectId, ObjectType, Result, StorageError};
use bytes::Bytes;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Content-addressed loose object store rooted at an `objects/` directory.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    objects_dir: PathBuf,
}

impl ObjectStore {
    /// Opens a store rooted at `<git_dir>/objects`.
    pub fn open(git_dir: impl AsRef<Path>) -> Self {
        Self {
            objects_dir: git_dir.as_ref().join("objects"),
        }
    }

    /// Returns the path of the directory holding the object files.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    /// Stores an object and returns its id.
    ///
    /// The framed buffer is hashed and compressed fully in memory before a
    /// single write, so no object is ever partially persisted. Writing the
    /// same content twice is a no-op after the first write.
    pub fn put(&self, object_type: ObjectType, data: impl Into<Bytes>) -> Result<ObjectId> {
        let object = GitObject::new(object_type, data);
        let hex = object.id.to_hex();
        let fan_out = self.objects_dir.join(&hex[..2]);
        let path = fan_out.join(&hex[2..]);
        if path.exists() {
            tracing::trace!(id = %object.id, "object already stored");
            return Ok(object.id);
        }

        let compressed = compress(&object)?;
        fs::create_dir_all(&fan_out)?;
        fs::write(&path, compressed)?;

        tracing::debug!(id = %object.id, kind = %object.object_type, size = object.size(), "stored object");
        Ok(object.id)
    }

    /// Retrieves an object by id.
    pub fn get(&self, id: &ObjectId) -> Result<GitObject> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::ObjectNotFound(id.to_hex()));
            }
            Err(e) => return Err(e.into()),
        };
        decompress(id, &compressed)
    }

    /// Checks whether an object exists.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_path(id).exists()
    }
}

/// Compresses an object into its loose on-disk form.
fn compress(object: &GitObject) -> Result<Vec<u8>> {
    let header = format!("{} {}\0", object.object_type.as_str(), object.data.len());
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(header.as_bytes())?;
    encoder.write_all(&object.data)?;
    Ok(encoder.finish()?)
}

/// Decompresses a loose object file and validates its framing.
fn decompress(id: &ObjectId, compressed: &[u8]) -> Result<GitObject> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(|e| StorageError::CorruptObject(format!("{}: {}", id, e)))?;

    // Frame header: "<type> <len>\0"
    let nul = raw
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| StorageError::CorruptObject(format!("{}: missing header terminator", id)))?;
    let header = std::str::from_utf8(&raw[..nul])
        .map_err(|_| StorageError::CorruptObject(format!("{}: non-ascii header", id)))?;
    let (type_str, size_str) = header
        .split_once(' ')
        .ok_or_else(|| StorageError::CorruptObject(format!("{}: malformed header", id)))?;

    let object_type = ObjectType::parse(type_str)?;
    let declared: usize = size_str
        .parse()
        .map_err(|_| StorageError::CorruptObject(format!("{}: bad length '{}'", id, size_str)))?;

    let data = &raw[nul + 1..];
    if data.len() != declared {
        return Err(StorageError::CorruptObject(format!(
            "{}: declared length {} but found {} bytes",
            id,
            declared,
            data.len()
        )));
    }

    Ok(GitObject {
        id: *id,
        object_type,
        data: Bytes::from(data.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ObjectStore) {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::open(dir.path());
        (dir, store)
    }

    #[test]
    fn test_put_get_roundtrip() {
        let (_dir, store) = store();
        let id = store.put(ObjectType::Blob, b"hello".to_vec()).unwrap();
        let obj = store.get(&id).unwrap();
        assert_eq!(obj.object_type, ObjectType::Blob);
        assert_eq!(obj.data.as_ref(), b"hello");
        assert_eq!(obj.id, id);
    }

    #[test]
    fn test_put_is_deterministic_and_idempotent() {
        let (_dir, store) = store();
        let a = store.put(ObjectType::Blob, b"same".to_vec()).unwrap();
        let b = store.put(ObjectType::Blob, b"same".to_vec()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_on_disk_layout() {
        let (dir, store) = store();
        let id = store.put(ObjectType::Blob, b"hello".to_vec()).unwrap();
        assert_eq!(id.to_hex(), "b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0");
        let expected = dir
            .path()
            .join("objects")
            .join("b6")
            .join("fc4c620b67d95f953a5c1c1230aaab5db5a1b0");
        assert!(expected.is_file());
    }

    #[test]
    fn test_get_missing_object() {
        let (_dir, store) = store();
        let id = ObjectId::from_hex("b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0").unwrap();
        assert!(!store.contains(&id));
        assert!(matches!(
            store.get(&id),
            Err(StorageError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn test_get_length_mismatch_is_corrupt() {
        let (dir, store) = store();
        // A frame that lies about its length.
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"blob 3\0hello").unwrap();
        let bad = encoder.finish().unwrap();

        let id = ObjectId::from_hex("00000000000000000000ffffffffffffffffffff").unwrap();
        let path = dir.path().join("objects").join("00").join(&id.to_hex()[2..]);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bad).unwrap();

        assert!(matches!(
            store.get(&id),
            Err(StorageError::CorruptObject(_))
        ));
    }

    #[test]
    fn test_get_garbage_is_corrupt() {
        let (dir, store) = store();
        let id = ObjectId::from_hex("00000000000000000000ffffffffffffffffffff").unwrap();
        let path = dir.path().join("objects").join("00").join(&id.to_hex()[2..]);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not zlib at all").unwrap();

        assert!(matches!(
            store.get(&id),
            Err(StorageError::CorruptObject(_))
        ));
    }

    #[test]
    fn test_binary_content_roundtrip() {
        let (_dir, store) = store();
        let data: Vec<u8> = (0..=255).collect();
        let id = store.put(ObjectType::Blob, data.clone()).unwrap();
        let obj = store.get(&id).unwrap();
        assert_eq!(obj.data.as_ref(), data.as_slice());
    }
}
