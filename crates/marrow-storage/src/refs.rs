//! Reference management.
//!
//! References are plain files under the repository directory: a ref such as
//! `refs/heads/main` holds 40 hex characters, and `HEAD` holds either a
//! symbolic pointer (`ref: refs/heads/main`) or a raw id.

use crate::{ObjectId, Result, StorageError};
use std::fs;
use std::path::{Path, PathBuf};

/// A reference (branch tip or symbolic ref).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Direct reference to an object.
    Direct(ObjectId),
    /// Symbolic reference (e.g., HEAD -> refs/heads/main).
    Symbolic(String),
}

impl Reference {
    /// Returns the object id if this is a direct reference.
    pub fn as_direct(&self) -> Option<ObjectId> {
        match self {
            Self::Direct(id) => Some(*id),
            Self::Symbolic(_) => None,
        }
    }
}

/// Filesystem-backed reference store rooted at the repository directory.
#[derive(Debug, Clone)]
pub struct RefStore {
    git_dir: PathBuf,
}

impl RefStore {
    /// Opens a ref store rooted at the given repository directory.
    pub fn open(git_dir: impl AsRef<Path>) -> Self {
        Self {
            git_dir: git_dir.as_ref().to_path_buf(),
        }
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        self.git_dir.join(name)
    }

    /// Sets a reference to point to an object.
    pub fn set(&self, name: &str, target: ObjectId) -> Result<()> {
        let path = self.ref_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, format!("{}\n", target))?;
        tracing::debug!(name = %name, target = %target, "wrote ref");
        Ok(())
    }

    /// Sets a symbolic reference.
    pub fn set_symbolic(&self, name: &str, target: &str) -> Result<()> {
        let path = self.ref_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, format!("ref: {}\n", target))?;
        tracing::debug!(name = %name, target = %target, "wrote symbolic ref");
        Ok(())
    }

    /// Reads a reference by name.
    pub fn get(&self, name: &str) -> Result<Reference> {
        let path = self.ref_path(name);
        let content = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::RefNotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let content = content.trim_end();

        if let Some(target) = content.strip_prefix("ref: ") {
            return Ok(Reference::Symbolic(target.to_string()));
        }
        let id = ObjectId::from_hex(content)
            .map_err(|_| StorageError::InvalidRef(format!("{}: '{}'", name, content)))?;
        Ok(Reference::Direct(id))
    }

    /// Resolves HEAD to an object id, following one level of indirection.
    pub fn resolve_head(&self) -> Result<ObjectId> {
        match self.get("HEAD")? {
            Reference::Direct(id) => Ok(id),
            Reference::Symbolic(target) => match self.get(&target)? {
                Reference::Direct(id) => Ok(id),
                Reference::Symbolic(_) => Err(StorageError::InvalidRef(
                    "nested symbolic refs not supported".to_string(),
                )),
            },
        }
    }

    /// Returns the current branch name if HEAD is symbolic.
    pub fn current_branch(&self) -> Option<String> {
        match self.get("HEAD").ok()? {
            Reference::Symbolic(target) => {
                target.strip_prefix("refs/heads/").map(|s| s.to_string())
            }
            Reference::Direct(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ref_store_basic() {
        let dir = TempDir::new().unwrap();
        let store = RefStore::open(dir.path());
        let id = ObjectId::from_hex("a94a8fe5ccb19ba61c4c0873d391e987982fbbd3").unwrap();

        store.set("refs/heads/main", id).unwrap();
        store.set_symbolic("HEAD", "refs/heads/main").unwrap();

        assert_eq!(store.current_branch(), Some("main".to_string()));
        assert_eq!(store.resolve_head().unwrap(), id);
    }

    #[test]
    fn test_ref_file_contents() {
        let dir = TempDir::new().unwrap();
        let store = RefStore::open(dir.path());
        let id = ObjectId::from_hex("a94a8fe5ccb19ba61c4c0873d391e987982fbbd3").unwrap();

        store.set("refs/heads/main", id).unwrap();
        let written = fs::read_to_string(dir.path().join("refs/heads/main")).unwrap();
        assert_eq!(written, "a94a8fe5ccb19ba61c4c0873d391e987982fbbd3\n");

        store.set_symbolic("HEAD", "refs/heads/main").unwrap();
        let head = fs::read_to_string(dir.path().join("HEAD")).unwrap();
        assert_eq!(head, "ref: refs/heads/main\n");
    }

    #[test]
    fn test_missing_ref() {
        let dir = TempDir::new().unwrap();
        let store = RefStore::open(dir.path());
        assert!(matches!(
            store.get("refs/heads/nope"),
            Err(StorageError::RefNotFound(_))
        ));
    }

    #[test]
    fn test_detached_head() {
        let dir = TempDir::new().unwrap();
        let store = RefStore::open(dir.path());
        let id = ObjectId::from_hex("a94a8fe5ccb19ba61c4c0873d391e987982fbbd3").unwrap();

        store.set("HEAD", id).unwrap();
        assert_eq!(store.current_branch(), None);
        assert_eq!(store.resolve_head().unwrap(), id);
    }

    #[test]
    fn test_invalid_ref_contents() {
        let dir = TempDir::new().unwrap();
        let store = RefStore::open(dir.path());
        fs::write(dir.path().join("HEAD"), "garbage\n").unwrap();
        assert!(matches!(
            store.get("HEAD"),
            Err(StorageError::InvalidRef(_))
        ));
    }
}
