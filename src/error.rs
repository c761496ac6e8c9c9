//! Error type for a regeneration cycle.
//!
//! [`RegenError`] names every failure the reconciliation layer can surface.
//! Each variant carries enough context to tell an operator what went wrong
//! and whether re-running the cycle can help; nothing here is retried
//! internally.

use std::path::PathBuf;

use regen_git::GitError;
use thiserror::Error;

use crate::host::HostError;

/// Convenience alias used throughout the crate.
pub type Result<T, E = RegenError> = std::result::Result<T, E>;

/// Unified error type for detector, reconciler, publisher and ledger
/// operations.
#[derive(Debug, Error)]
pub enum RegenError {
    /// An operation that needs a working copy ran before the clone.
    /// This is a programming error in the driver.
    #[error("repository has not been cloned; clone before calling {operation}")]
    RepositoryNotCloned {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// Working-tree status or diff could not be computed.
    #[error("failed to read working-tree status: {source}")]
    VcsStatus {
        #[source]
        source: GitError,
    },

    /// Fetching a branch from the remote failed for a reason other than
    /// the branch being absent.
    #[error("failed to fetch branch `{branch}`: {source}")]
    VcsFetch {
        branch: String,
        #[source]
        source: GitError,
    },

    /// The remote refused the push because another writer moved the ref.
    /// Re-resolve the branch and re-run the cycle to recover.
    #[error("push of `{branch}` rejected by the remote: {source}")]
    PushRejected {
        branch: String,
        #[source]
        source: GitError,
    },

    /// The requested branch does not exist on the remote.
    #[error("branch `{branch}` not found on the remote")]
    BranchNotFound { branch: String },

    /// An open pull request for this workflow is on a different branch than
    /// the one configured. Fix the configured branch name or close the PR.
    #[error(
        "existing pull request #{number} uses branch `{existing}` but `{requested}` was requested"
    )]
    BranchMismatch {
        number: u64,
        existing: String,
        requested: String,
    },

    /// More than one open pull request carries this workflow's title.
    #[error("pull requests {numbers:?} all match title `{title}`; close all but one")]
    AmbiguousPullRequest { title: String, numbers: Vec<u64> },

    /// Merging the regeneration branch into the target hit conflicts.
    /// A human has to merge it.
    #[error("merging `{branch}` into `{target}` conflicts: {source}")]
    MergeConflict {
        branch: String,
        target: String,
        #[source]
        source: GitError,
    },

    /// The last ledger block does not carry a readable version header.
    #[error("malformed release ledger record: {reason}")]
    MalformedLedgerRecord { reason: String },

    /// A record that would encode to a block the ledger cannot read back.
    /// Nothing is written.
    #[error("invalid release ledger record: {reason}")]
    InvalidLedgerRecord { reason: String },

    /// The ledger exists but holds no records.
    #[error("release ledger is empty")]
    EmptyLedger,

    /// The ledger file does not exist.
    #[error("release ledger not found at {}", path.display())]
    LedgerNotFound { path: PathBuf },

    /// Staging produced nothing to commit even though a change was
    /// detected. Indicates the detector and the publisher disagree.
    #[error("nothing to commit on `{branch}` after staging all changes")]
    NothingToCommit { branch: String },

    /// The host rejected a pull-request mutation as conflicting with its
    /// current state (HTTP 409/422).
    #[error("pull request update conflicted on the host: {source}")]
    PullRequestConflict {
        #[source]
        source: HostError,
    },

    /// Any other git failure.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Any other host API failure.
    #[error(transparent)]
    Host(HostError),

    /// The generator hook failed; nothing was committed.
    #[error("generator failed: {0}")]
    Generator(String),

    /// The changelog between two generator versions could not be produced.
    #[error("failed to get changelog: {0}")]
    Changelog(String),

    /// The configuration is incomplete or invalid.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// The workflow event payload is not a push event with commit ids.
    #[error("invalid workflow event payload {}: {reason}", path.display())]
    InvalidEventPayload { path: PathBuf, reason: String },

    /// Ledger or event-payload file I/O.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<HostError> for RegenError {
    fn from(source: HostError) -> Self {
        if source.is_conflict() {
            Self::PullRequestConflict { source }
        } else {
            Self::Host(source)
        }
    }
}
