//! Repository layout.

use crate::{ObjectStore, RefStore, Result, StorageError};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the repository metadata directory.
pub const GIT_DIR: &str = ".git";

/// A repository: its metadata directory plus object and ref stores.
#[derive(Debug, Clone)]
pub struct Repository {
    git_dir: PathBuf,
    /// Loose object store.
    pub objects: ObjectStore,
    /// Reference store.
    pub refs: RefStore,
}

impl Repository {
    fn from_git_dir(git_dir: PathBuf) -> Self {
        let objects = ObjectStore::open(&git_dir);
        let refs = RefStore::open(&git_dir);
        Self {
            git_dir,
            objects,
            refs,
        }
    }

    /// Initializes a fresh repository under `work_dir`.
    ///
    /// Creates `.git/`, `.git/objects/`, `.git/refs/`, and a HEAD pointing
    /// at `refs/heads/main`.
    pub fn init(work_dir: impl AsRef<Path>) -> Result<Self> {
        let git_dir = work_dir.as_ref().join(GIT_DIR);
        fs::create_dir_all(git_dir.join("objects"))?;
        fs::create_dir_all(git_dir.join("refs"))?;

        let repo = Self::from_git_dir(git_dir);
        repo.refs.set_symbolic("HEAD", "refs/heads/main")?;

        tracing::info!(path = %repo.git_dir.display(), "initialized repository");
        Ok(repo)
    }

    /// Opens an existing repository under `work_dir`.
    pub fn open(work_dir: impl AsRef<Path>) -> Result<Self> {
        let git_dir = work_dir.as_ref().join(GIT_DIR);
        if !git_dir.is_dir() {
            return Err(StorageError::InvalidRef(format!(
                "not a repository: {}",
                work_dir.as_ref().display()
            )));
        }
        Ok(Self::from_git_dir(git_dir))
    }

    /// Returns the repository metadata directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_layout() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        assert!(dir.path().join(".git/objects").is_dir());
        assert!(dir.path().join(".git/refs").is_dir());
        let head = fs::read_to_string(dir.path().join(".git/HEAD")).unwrap();
        assert_eq!(head, "ref: refs/heads/main\n");
        assert_eq!(repo.git_dir(), dir.path().join(".git"));
    }

    #[test]
    fn test_open_missing_repository() {
        let dir = TempDir::new().unwrap();
        assert!(Repository::open(dir.path()).is_err());
    }

    #[test]
    fn test_init_then_open() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let repo = Repository::open(dir.path()).unwrap();
        assert!(repo.refs.current_branch().is_some());
    }
}
