//! The [`GitRepo`] trait: the abstraction boundary between the
//! reconciliation layer and git.
//!
//! The trait is object-safe so a session can hold `Box<dyn GitRepo>` and
//! tests can swap in another backend.
//!
//! | Group     | Methods                                                   |
//! |-----------|-----------------------------------------------------------|
//! | Refs      | `head_oid`, `current_branch`, `read_ref`                  |
//! | Status    | `status`, `has_staged_changes`                            |
//! | Diff      | `diff_worktree`, `diff_trees`                             |
//! | Branches  | `checkout_branch`, `create_branch`                        |
//! | Commit    | `stage_all`, `commit`, `merge`                            |
//! | Remote    | `fetch_branch`, `push_branch`, `delete_remote_branch`     |

use std::path::Path;

use crate::error::GitError;
use crate::types::{DiffEntry, GitOid, RefName, Signature, StatusEntry};

/// The git abstraction used by every sdk-regen component.
pub trait GitRepo {
    /// Root of the working tree.
    fn workdir(&self) -> &Path;

    // -----------------------------------------------------------------------
    // Refs
    // -----------------------------------------------------------------------

    /// Resolve `HEAD` to a commit.
    ///
    /// Returns [`GitError::NotFound`] on an unborn branch.
    fn head_oid(&self) -> Result<GitOid, GitError>;

    /// The short name of the checked-out branch, or `None` when detached.
    fn current_branch(&self) -> Result<Option<String>, GitError>;

    /// Resolve a ref to its OID, returning `None` if it does not exist.
    fn read_ref(&self, name: &RefName) -> Result<Option<GitOid>, GitError>;

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Changed paths in the index and working tree relative to `HEAD`,
    /// including untracked files.
    ///
    /// Replaces: `git status --porcelain`.
    fn status(&self) -> Result<Vec<StatusEntry>, GitError>;

    /// Returns `true` if the index differs from `HEAD`.
    ///
    /// Replaces: `git diff --cached --quiet` (exit code check).
    fn has_staged_changes(&self) -> Result<bool, GitError>;

    // -----------------------------------------------------------------------
    // Diff
    // -----------------------------------------------------------------------

    /// Unified diff of the working tree (staged or not) against `HEAD`,
    /// limited to `pathspec` (empty means the whole tree). Untracked files
    /// do not appear.
    ///
    /// Replaces: `git diff HEAD -- <pathspec>`.
    fn diff_worktree(&self, pathspec: &str) -> Result<String, GitError>;

    /// File-level changes between two commits' trees.
    ///
    /// Replaces: `git diff-tree -r --name-status <old> <new>`.
    fn diff_trees(&self, old: GitOid, new: GitOid) -> Result<Vec<DiffEntry>, GitError>;

    // -----------------------------------------------------------------------
    // Branches
    // -----------------------------------------------------------------------

    /// Check out an existing local branch.
    ///
    /// Returns [`GitError::NotFound`] if the branch does not exist.
    fn checkout_branch(&self, branch: &str) -> Result<(), GitError>;

    /// Create a new branch at `HEAD` and check it out, carrying any
    /// uncommitted changes along.
    fn create_branch(&self, branch: &str) -> Result<(), GitError>;

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    /// Stage every change in the working tree, including deletions and
    /// untracked files.
    ///
    /// Replaces: `git add --all`.
    fn stage_all(&self) -> Result<(), GitError>;

    /// Commit the index with `signature` as both author and committer and
    /// return the new commit.
    fn commit(&self, message: &str, signature: &Signature) -> Result<GitOid, GitError>;

    /// Merge `branch` into the checked-out branch.
    ///
    /// Conflicts are never resolved: the merge is aborted and
    /// [`GitError::MergeConflict`] returned.
    fn merge(&self, branch: &str, signature: &Signature) -> Result<(), GitError>;

    // -----------------------------------------------------------------------
    // Remote
    // -----------------------------------------------------------------------

    /// Fetch `refs/heads/<branch>` from `remote` into the local branch of
    /// the same name.
    ///
    /// Returns [`GitError::NotFound`] if the remote has no such branch.
    fn fetch_branch(&self, remote: &str, branch: &str) -> Result<(), GitError>;

    /// Push the local branch to the same name on `remote`. Never forces.
    ///
    /// Returns [`GitError::PushRejected`] on non-fast-forward.
    fn push_branch(&self, remote: &str, branch: &str) -> Result<(), GitError>;

    /// Delete `refs/heads/<branch>` on `remote` by pushing an empty source.
    fn delete_remote_branch(&self, remote: &str, branch: &str) -> Result<(), GitError>;
}
