//! Clone orchestration.
//!
//! Wires the protocol pieces together: advertise, record refs, fetch the
//! pack, store literals, resolve deltas, and materialize the default
//! branch's tree into the target directory.

use crate::{delta, PackParser, RemoteClient, Result};
use marrow_storage::{checkout, Commit, ObjectType, Reference, Repository, StorageError};
use std::path::Path;

/// Branch used when the remote does not advertise a HEAD symref.
const FALLBACK_BRANCH: &str = "refs/heads/main";

/// Clones a remote repository into `target_dir`.
///
/// Any failure aborts the command with the underlying error; directories
/// already created are not rolled back.
pub fn clone_repository(url: &str, target_dir: &Path) -> Result<()> {
    let repo = Repository::init(target_dir)?;
    let client = RemoteClient::new(url);

    let advertisement = client.advertise()?;
    let default_branch = advertisement
        .default_branch
        .clone()
        .unwrap_or_else(|| FALLBACK_BRANCH.to_string());
    tracing::info!(url = %url, refs = advertisement.refs.len(), branch = %default_branch, "cloning");

    // Every advertised ref becomes a local ref file; HEAD becomes the
    // symbolic pointer to the default branch.
    repo.refs.set_symbolic("HEAD", &default_branch)?;
    for (id, name) in &advertisement.refs {
        if name == "HEAD" {
            continue;
        }
        repo.refs.set(name, *id)?;
    }

    let pack = client.fetch(&advertisement.wanted_ids())?;
    let outcome = PackParser::new(&pack).parse(&repo.objects)?;
    let resolved = delta::resolve(&repo.objects, outcome.pending)?;
    tracing::info!(
        literals = outcome.stored.len(),
        deltas = resolved.len(),
        "unpacked objects"
    );

    // Walk HEAD -> commit -> tree and write the working directory.
    let head_id = match repo.refs.get(&default_branch) {
        Ok(Reference::Direct(id)) => id,
        Ok(Reference::Symbolic(_)) => {
            return Err(StorageError::InvalidRef(format!(
                "default branch {} is itself symbolic",
                default_branch
            ))
            .into());
        }
        Err(e) => return Err(e.into()),
    };
    let head_commit = repo.objects.get(&head_id)?;
    if head_commit.object_type != ObjectType::Commit {
        return Err(StorageError::CorruptObject(format!(
            "{}: branch tip is a {}, expected a commit",
            head_id, head_commit.object_type
        ))
        .into());
    }
    let tree_id = Commit::tree_id_of(&head_commit.data)?;
    checkout(&repo.objects, &tree_id, target_dir)?;

    tracing::info!(head = %head_id, tree = %tree_id, "checked out working tree");
    Ok(())
}
