//! Bridge between the object store and a working directory.
//!
//! `snapshot` turns a directory into a tree graph (the write-tree path);
//! `checkout` walks a tree graph and writes the matching files and
//! directories back out (the clone path).

use crate::repo::GIT_DIR;
use crate::{FileMode, ObjectId, ObjectStore, ObjectType, Result, StorageError, Tree, TreeEntry};
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Recursively snapshots a directory into the store, returning the root
/// tree id.
///
/// The repository metadata directory is skipped; entry order inside each
/// tree body is fixed by the codec's raw-name-byte sort.
pub fn snapshot(store: &ObjectStore, dir: &Path) -> Result<ObjectId> {
    let mut entries = Vec::new();

    for dirent in fs::read_dir(dir)? {
        let dirent = dirent?;
        let name = dirent
            .file_name()
            .into_string()
            .map_err(|n| StorageError::InvalidObject(format!("non-UTF-8 file name: {:?}", n)))?;
        if name == GIT_DIR {
            continue;
        }

        let path = dirent.path();
        let metadata = fs::symlink_metadata(&path)?;

        let (mode, id) = if metadata.file_type().is_symlink() {
            let target = fs::read_link(&path)?;
            let target = target.as_os_str().as_bytes().to_vec();
            (FileMode::Symlink, store.put(ObjectType::Blob, target)?)
        } else if metadata.is_dir() {
            (FileMode::Directory, snapshot(store, &path)?)
        } else {
            let mode = if metadata.permissions().mode() & 0o111 != 0 {
                FileMode::Executable
            } else {
                FileMode::Regular
            };
            (mode, store.put(ObjectType::Blob, fs::read(&path)?)?)
        };

        entries.push(TreeEntry::new(mode, name, id));
    }

    let body = Tree::encode(&entries);
    store.put(ObjectType::Tree, body)
}

/// Materializes a tree into a directory.
///
/// Directories are created and recursed into; files are written with the
/// permission bits taken from the low 9 bits of their entry mode; symlink
/// entries become symlinks pointing at their blob content.
pub fn checkout(store: &ObjectStore, tree_id: &ObjectId, dir: &Path) -> Result<()> {
    let tree = store.get(tree_id)?;
    if tree.object_type != ObjectType::Tree {
        return Err(StorageError::CorruptObject(format!(
            "{}: expected tree, found {}",
            tree_id, tree.object_type
        )));
    }

    fs::create_dir_all(dir)?;
    for entry in Tree::decode(&tree.data)? {
        let path = dir.join(&entry.name);
        match entry.mode {
            FileMode::Directory => {
                checkout(store, &entry.id, &path)?;
            }
            FileMode::Symlink => {
                let blob = store.get(&entry.id)?;
                let target = String::from_utf8_lossy(&blob.data).to_string();
                std::os::unix::fs::symlink(target, &path)?;
            }
            FileMode::Regular | FileMode::Executable => {
                let blob = store.get(&entry.id)?;
                fs::write(&path, &blob.data)?;
                fs::set_permissions(&path, fs::Permissions::from_mode(entry.mode.permissions()))?;
            }
        }
        tracing::trace!(path = %path.display(), id = %entry.id, "checked out entry");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_known_tree() {
        let work = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let store = ObjectStore::open(store_dir.path());

        fs::write(work.path().join("f.txt"), b"1").unwrap();
        let tree_id = snapshot(&store, work.path()).unwrap();
        assert_eq!(
            tree_id.to_hex(),
            "39339b1397e857d983b3c9463c63cbdbbf2be720"
        );

        let tree = store.get(&tree_id).unwrap();
        let entries = Tree::decode(&tree.data).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mode, FileMode::Regular);
        assert_eq!(entries[0].name, "f.txt");
        assert_eq!(
            entries[0].id.to_hex(),
            "56a6051ca2b02b04ef92d5150c9ef600403cb1de"
        );
    }

    #[test]
    fn test_snapshot_skips_git_dir() {
        let work = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let store = ObjectStore::open(store_dir.path());

        fs::create_dir(work.path().join(".git")).unwrap();
        fs::write(work.path().join(".git/HEAD"), b"ref: refs/heads/main\n").unwrap();
        fs::write(work.path().join("a.txt"), b"x").unwrap();

        let tree_id = snapshot(&store, work.path()).unwrap();
        let entries = Tree::decode(&store.get(&tree_id).unwrap().data).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.txt");
    }

    #[test]
    fn test_snapshot_checkout_roundtrip() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let store = ObjectStore::open(store_dir.path());

        fs::write(src.path().join("a.txt"), b"x").unwrap();
        fs::write(src.path().join("b.txt"), b"y").unwrap();
        fs::create_dir(src.path().join("d")).unwrap();
        fs::write(src.path().join("d/c.txt"), b"z").unwrap();
        let script = src.path().join("run.sh");
        fs::write(&script, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let tree_id = snapshot(&store, src.path()).unwrap();
        checkout(&store, &tree_id, dst.path()).unwrap();

        assert_eq!(fs::read(dst.path().join("a.txt")).unwrap(), b"x");
        assert_eq!(fs::read(dst.path().join("b.txt")).unwrap(), b"y");
        assert_eq!(fs::read(dst.path().join("d/c.txt")).unwrap(), b"z");
        let mode = fs::metadata(dst.path().join("run.sh"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);

        // Identical content on both sides means identical tree ids.
        assert_eq!(snapshot(&store, dst.path()).unwrap(), tree_id);
    }

    #[test]
    fn test_checkout_of_blob_id_fails() {
        let dst = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let store = ObjectStore::open(store_dir.path());

        let blob_id = store.put(ObjectType::Blob, b"not a tree".to_vec()).unwrap();
        assert!(matches!(
            checkout(&store, &blob_id, dst.path()),
            Err(StorageError::CorruptObject(_))
        ));
    }
}
