//! Working-tree checkouts with libgit2

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::Repository;
use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures while producing a checkout
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("filesystem error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Materializes a repository at one revision into a directory
pub trait Checkout {
    fn checkout(&self, url: &str, revision: &str, target: &Path) -> Result<(), CheckoutError>;
}

/// Full-history clone followed by a detached checkout of the revision.
///
/// History is kept intact so tools run inside the snapshot can still read
/// revision metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullClone;

impl Checkout for FullClone {
    fn checkout(&self, url: &str, revision: &str, target: &Path) -> Result<(), CheckoutError> {
        debug!("Cloning {} into {}", url, target.display());
        let repository = RepoBuilder::new().clone(url, target)?;

        let commit = repository.revparse_single(revision)?.peel_to_commit()?;
        repository.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
        repository.set_head_detached(commit.id())?;

        debug!("Checked out {} in {}", commit.id(), target.display());
        Ok(())
    }
}

/// Check if the given path is a git repository
pub fn is_git_repository<P: AsRef<Path>>(path: P) -> bool {
    Repository::open(path.as_ref()).is_ok()
}

/// Full id of the commit HEAD points at
pub fn head_revision<P: AsRef<Path>>(path: P) -> Result<String, CheckoutError> {
    let repository = Repository::open(path.as_ref())?;
    let commit = repository.head()?.peel_to_commit()?;
    Ok(commit.id().to_string())
}

/// Remove a directory tree if it exists
pub fn remove_existing(path: &Path) -> Result<(), CheckoutError> {
    if path.exists() {
        debug!("Removing existing directory: {}", path.display());
        std::fs::remove_dir_all(path).map_err(|source| CheckoutError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use std::fs;
    use tempfile::TempDir;

    fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> git2::Oid {
        let workdir = repo.workdir().unwrap();
        fs::write(workdir.join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = Signature::now("Test", "test@example.com").unwrap();
        let parents = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parent_refs)
            .unwrap()
    }

    #[test]
    fn test_full_clone_checks_out_older_revision() {
        let source = TempDir::new().unwrap();
        let repo = Repository::init(source.path()).unwrap();
        let first = commit_file(&repo, "a.txt", "one", "first");
        commit_file(&repo, "a.txt", "two", "second");

        let target_root = TempDir::new().unwrap();
        let target = target_root.path().join("snapshot");
        let url = format!("file://{}", source.path().display());
        FullClone.checkout(&url, &first.to_string(), &target).unwrap();

        assert!(is_git_repository(&target));
        assert_eq!(head_revision(&target).unwrap(), first.to_string());
        assert_eq!(fs::read_to_string(target.join("a.txt")).unwrap(), "one");

        // Full history is present, not just the checked-out commit
        let clone = Repository::open(&target).unwrap();
        let mut walk = clone.revwalk().unwrap();
        walk.push_glob("refs/remotes/*").unwrap();
        assert_eq!(walk.count(), 2);
    }

    #[test]
    fn test_unknown_revision_fails() {
        let source = TempDir::new().unwrap();
        let repo = Repository::init(source.path()).unwrap();
        commit_file(&repo, "a.txt", "one", "first");

        let target_root = TempDir::new().unwrap();
        let url = format!("file://{}", source.path().display());
        let result = FullClone.checkout(&url, "deadbeefdeadbeef", &target_root.path().join("s"));
        assert!(matches!(result, Err(CheckoutError::Git(_))));
    }

    #[test]
    fn test_remove_existing() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("old");
        fs::create_dir_all(nested.join("deep")).unwrap();
        fs::write(nested.join("deep/file"), "x").unwrap();

        remove_existing(&nested).unwrap();
        assert!(!nested.exists());
        remove_existing(&nested).unwrap();
    }
}
