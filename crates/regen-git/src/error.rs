//! Error types for git operations.
//!
//! [`GitError`] is the single error type returned by all [`GitRepo`](crate::GitRepo)
//! methods. Variants are specific enough that callers can tell a missing
//! remote branch from a rejected push or a merge conflict without parsing
//! messages.

use thiserror::Error;

/// Errors returned by [`GitRepo`](crate::GitRepo) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// A requested ref, branch, or object was not found.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable description of what was missing.
        message: String,
    },

    /// An OID string could not be parsed.
    #[error("invalid OID `{value}`: {reason}")]
    InvalidOid {
        /// The raw value that failed validation.
        value: String,
        /// Why validation failed.
        reason: String,
    },

    /// An I/O error occurred (process spawn, file system).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A git subprocess exited unsuccessfully.
    #[error("`git {command}` failed: {stderr}")]
    CommandFailed {
        /// The git subcommand and arguments (credentials never included).
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// The remote refused a push because it is not a fast-forward of the
    /// remote ref (someone else pushed first).
    #[error("push of `{refspec}` to `{remote}` rejected: {message}")]
    PushRejected {
        /// The remote name.
        remote: String,
        /// The refspec that was pushed.
        refspec: String,
        /// Details from git.
        message: String,
    },

    /// A push failed for a reason other than non-fast-forward.
    #[error("push to `{remote}` failed: {message}")]
    PushFailed {
        /// The remote name.
        remote: String,
        /// Details from git.
        message: String,
    },

    /// A merge produced conflicts. The merge has been aborted.
    #[error("merge conflict: {message}")]
    MergeConflict {
        /// Description of the conflict.
        message: String,
    },

    /// gix returned an unclassified error.
    #[error("git backend error: {message}")]
    BackendError {
        /// Freeform error description from the backend.
        message: String,
    },
}

impl From<crate::types::OidParseError> for GitError {
    fn from(e: crate::types::OidParseError) -> Self {
        Self::InvalidOid {
            value: e.value,
            reason: e.reason,
        }
    }
}
