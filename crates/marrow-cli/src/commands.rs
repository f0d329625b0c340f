//! CLI command implementations.

use marrow_protocol::ProtocolError;
use marrow_storage::{
    snapshot, Commit, ObjectId, ObjectType, Repository, Signature, StorageError, Tree,
};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Initialize a new repository in the current directory.
pub fn init() -> Result<()> {
    let repo = Repository::init(".")?;
    println!(
        "Initialized empty repository in {}",
        repo.git_dir().display()
    );
    Ok(())
}

/// Hash a file as a blob, optionally storing it.
pub fn hash_object(write: bool, file: &Path) -> Result<()> {
    let content = std::fs::read(file)?;
    let id = if write {
        let repo = Repository::open(".")?;
        repo.objects.put(ObjectType::Blob, content)?
    } else {
        ObjectId::hash_object(ObjectType::Blob, &content)
    };
    println!("{}", id);
    Ok(())
}

/// Print an object's content verbatim.
pub fn cat_file(object: &str) -> Result<()> {
    let repo = Repository::open(".")?;
    let id = ObjectId::from_hex(object)?;
    let obj = repo.objects.get(&id)?;

    // Raw bytes, no trailing newline of our own.
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&obj.data)?;
    stdout.flush()?;
    Ok(())
}

/// List a tree's entries.
pub fn ls_tree(name_only: bool, tree: &str) -> Result<()> {
    let repo = Repository::open(".")?;
    let id = ObjectId::from_hex(tree)?;
    let obj = repo.objects.get(&id)?;
    if obj.object_type != ObjectType::Tree {
        return Err(StorageError::CorruptObject(format!(
            "{}: expected tree, found {}",
            id, obj.object_type
        ))
        .into());
    }

    for entry in Tree::decode(&obj.data)? {
        if name_only {
            println!("{}", entry.name);
        } else {
            let kind = if entry.mode.is_dir() { "tree" } else { "blob" };
            println!(
                "{:0>6} {} {}\t{}",
                entry.mode.as_octal(),
                kind,
                entry.id,
                entry.name
            );
        }
    }
    Ok(())
}

/// Snapshot the current directory into a tree object.
pub fn write_tree() -> Result<()> {
    let repo = Repository::open(".")?;
    let id = snapshot(&repo.objects, Path::new("."))?;
    println!("{}", id);
    Ok(())
}

/// Create a commit object for an existing tree.
pub fn commit_tree(tree: &str, parent: Option<&str>, message: &str) -> Result<()> {
    let repo = Repository::open(".")?;
    let tree_id = ObjectId::from_hex(tree)?;
    let parent_id = parent.map(ObjectId::from_hex).transpose()?;

    let commit = Commit::new(tree_id, parent_id, Signature::from_env(), message);
    let id = repo.objects.put(ObjectType::Commit, commit.encode())?;
    println!("{}", id);
    Ok(())
}

/// Clone a remote repository.
pub fn clone(url: &str, dir: Option<&Path>) -> Result<()> {
    let target = match dir {
        Some(dir) => dir.to_path_buf(),
        None => clone_target(url),
    };

    marrow_protocol::clone_repository(url, &target)?;
    println!("Cloned into {}", target.display());
    Ok(())
}

/// Derives a destination directory from the last URL segment, like
/// `clone https://host/name.git` -> `name`.
fn clone_target(url: &str) -> std::path::PathBuf {
    let name = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("repository")
        .trim_end_matches(".git");
    Path::new(name).to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::clone_target;
    use std::path::Path;

    #[test]
    fn test_clone_target_derivation() {
        for (url, expected) in [
            ("https://example.com/repo.git", "repo"),
            ("https://example.com/repo", "repo"),
            ("https://example.com/nested/path/repo.git/", "repo"),
        ] {
            assert_eq!(clone_target(url), Path::new(expected), "url: {url}");
        }
    }
}
