//! The gix-backed implementation of [`GitRepo`].

use std::path::{Path, PathBuf};

use crate::error::GitError;
use crate::repo::GitRepo;
use crate::types::*;

/// A [`GitRepo`] implementation backed by
/// [gix](https://github.com/GitoxideLabs/gitoxide) for reads and the git CLI
/// for mutations and network operations.
///
/// Construct via [`GixRepo::open`] or [`GixRepo::clone_from`].
pub struct GixRepo {
    pub(crate) repo: gix::Repository,
    pub(crate) workdir: PathBuf,
    pub(crate) credential: Option<Credential>,
}

impl GixRepo {
    /// Open the non-bare repository at or above `path`.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = gix::open(path).map_err(|e| GitError::BackendError { message: e.to_string() })?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| GitError::BackendError {
                message: format!("{} is a bare repository", path.display()),
            })?;
        Ok(Self {
            repo,
            workdir,
            credential: None,
        })
    }

    /// Attach the credential used for fetch and push.
    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Clone `url` into `dest`, checking out only `branch` (or the remote's
    /// default branch when `None`), and open the result.
    pub fn clone_from(
        url: &str,
        dest: &Path,
        branch: Option<&str>,
        credential: Option<Credential>,
    ) -> Result<Self, GitError> {
        crate::remote_impl::clone(url, dest, branch, credential.as_ref())?;
        let repo = Self::open(dest)?;
        Ok(match credential {
            Some(cred) => repo.with_credential(cred),
            None => repo,
        })
    }
}

impl GitRepo for GixRepo {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    // === Refs ===
    fn head_oid(&self) -> Result<GitOid, GitError> {
        crate::refs_impl::head_oid(self)
    }

    fn current_branch(&self) -> Result<Option<String>, GitError> {
        crate::refs_impl::current_branch(self)
    }

    fn read_ref(&self, name: &RefName) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::read_ref(self, name)
    }

    // === Status ===
    fn status(&self) -> Result<Vec<StatusEntry>, GitError> {
        crate::status_impl::status(self)
    }

    fn has_staged_changes(&self) -> Result<bool, GitError> {
        crate::status_impl::has_staged_changes(self)
    }

    // === Diff ===
    fn diff_worktree(&self, pathspec: &str) -> Result<String, GitError> {
        crate::diff_impl::diff_worktree(self, pathspec)
    }

    fn diff_trees(&self, old: GitOid, new: GitOid) -> Result<Vec<DiffEntry>, GitError> {
        crate::diff_impl::diff_trees(self, old, new)
    }

    // === Branches ===
    fn checkout_branch(&self, branch: &str) -> Result<(), GitError> {
        crate::checkout_impl::checkout_branch(self, branch)
    }

    fn create_branch(&self, branch: &str) -> Result<(), GitError> {
        crate::checkout_impl::create_branch(self, branch)
    }

    // === Commit ===
    fn stage_all(&self) -> Result<(), GitError> {
        crate::commit_impl::stage_all(self)
    }

    fn commit(&self, message: &str, signature: &Signature) -> Result<GitOid, GitError> {
        crate::commit_impl::commit(self, message, signature)
    }

    fn merge(&self, branch: &str, signature: &Signature) -> Result<(), GitError> {
        crate::merge_impl::merge(self, branch, signature)
    }

    // === Remote ===
    fn fetch_branch(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        crate::remote_impl::fetch_branch(self, remote, branch)
    }

    fn push_branch(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        crate::push_impl::push_branch(self, remote, branch)
    }

    fn delete_remote_branch(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        crate::push_impl::delete_remote_branch(self, remote, branch)
    }
}
