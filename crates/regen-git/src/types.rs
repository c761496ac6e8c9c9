//! Value types for the regen git abstraction layer.
//!
//! These types form the vocabulary of the [`GitRepo`](crate::GitRepo) trait.
//! They contain no gix or CLI types; the backend is an implementation
//! detail.

use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// GitOid
// ---------------------------------------------------------------------------

/// A git object identifier (SHA-1, 20 bytes).
///
/// Displays as 40 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GitOid([u8; 20]);

impl GitOid {
    /// Create a `GitOid` from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GitOid({self})")
    }
}

impl FromStr for GitOid {
    type Err = OidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 40 {
            return Err(OidParseError {
                value: s.to_owned(),
                reason: format!("expected 40 hex characters, got {}", s.len()),
            });
        }
        let mut bytes = [0u8; 20];
        for (slot, pair) in bytes.iter_mut().zip(s.as_bytes().chunks(2)) {
            let digits = std::str::from_utf8(pair).ok();
            *slot = digits
                .and_then(|d| u8::from_str_radix(d, 16).ok())
                .ok_or_else(|| OidParseError {
                    value: s.to_owned(),
                    reason: format!("invalid hex pair {:?}", String::from_utf8_lossy(pair)),
                })?;
        }
        Ok(Self(bytes))
    }
}

/// Error from parsing a hex string into a [`GitOid`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OidParseError {
    /// The raw value that failed.
    pub value: String,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for OidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid OID {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for OidParseError {}

// ---------------------------------------------------------------------------
// RefName
// ---------------------------------------------------------------------------

const HEADS_PREFIX: &str = "refs/heads/";

/// A fully qualified git ref name (`refs/...`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RefName(String);

impl RefName {
    /// The local branch ref for `branch` (`refs/heads/<branch>`).
    ///
    /// Accepts either a short name or an already-qualified branch ref.
    #[must_use]
    pub fn branch(branch: &str) -> Self {
        if branch.starts_with(HEADS_PREFIX) {
            Self(branch.to_owned())
        } else {
            Self(format!("{HEADS_PREFIX}{branch}"))
        }
    }

    /// Return the ref name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Status types
// ---------------------------------------------------------------------------

/// The state of a path in one column of `git status` (index or worktree).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileStatus {
    /// No change in this column.
    Unmodified,
    /// Content differs.
    Modified,
    /// File type changed (e.g. regular file to symlink).
    TypeChanged,
    /// Newly added.
    Added,
    /// Removed.
    Deleted,
    /// Renamed from another path.
    Renamed,
    /// Copied from another path.
    Copied,
    /// Not tracked at all.
    Untracked,
    /// Unmerged, both sides modified the content (`UU`).
    UpdatedButUnmerged,
    /// Any other unmerged combination (add/add, delete/modify, ...).
    Conflicted,
}

/// A single entry from `git status`, pairing a path with its index and
/// worktree states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusEntry {
    /// Path relative to the repository root, slash-separated.
    pub path: String,
    /// Source path for renames and copies.
    pub orig_path: Option<String>,
    /// HEAD vs index.
    pub index: FileStatus,
    /// Index vs working tree.
    pub worktree: FileStatus,
}

impl StatusEntry {
    /// Both columns, index first.
    #[must_use]
    pub const fn columns(&self) -> [FileStatus; 2] {
        [self.index, self.worktree]
    }
}

// ---------------------------------------------------------------------------
// Diff types
// ---------------------------------------------------------------------------

/// The kind of change between two trees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeType {
    /// File was added.
    Added,
    /// File content or mode was modified.
    Modified,
    /// File was deleted.
    Deleted,
    /// File was renamed (may also be modified).
    Renamed {
        /// The original path before the rename.
        from: String,
    },
    /// File was copied from another path.
    Copied {
        /// The source path.
        from: String,
    },
}

/// A single file-level change between two trees.
///
/// Produced by [`GitRepo::diff_trees`](crate::GitRepo::diff_trees).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffEntry {
    /// Path of the file (in the new tree, or the old tree for deletions).
    pub path: String,
    /// What kind of change occurred.
    pub change_type: ChangeType,
}

// ---------------------------------------------------------------------------
// Identity and auth
// ---------------------------------------------------------------------------

/// Author/committer identity for commits created by the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

impl Signature {
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// HTTP basic credential presented to the remote on clone, fetch and push.
///
/// The secret is handed to git through a transient credential helper and
/// is never written to the repository config or printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    secret: String,
}

impl Credential {
    #[must_use]
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
