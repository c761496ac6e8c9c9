//! Merging a branch into the checked-out branch.

use tracing::warn;

use crate::cmd::command_failed;
use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::Signature;

pub fn merge(repo: &GixRepo, branch: &str, signature: &Signature) -> Result<(), GitError> {
    let args = ["merge", "--no-edit", branch];
    let out = repo.git_as(&args, Some(signature))?;
    if out.success {
        return Ok(());
    }

    let conflicted = out.stdout.contains("CONFLICT") || out.stdout.contains("Automatic merge failed");
    if !conflicted {
        return Err(command_failed(&args, &out));
    }

    if let Err(e) = repo.git_ok(&["merge", "--abort"]) {
        warn!(error = %e, "failed to abort conflicted merge");
    }
    let message = out
        .stdout
        .lines()
        .filter(|line| line.starts_with("CONFLICT"))
        .collect::<Vec<_>>()
        .join("; ");
    Err(GitError::MergeConflict {
        message: format!("merging `{branch}`: {message}"),
    })
}
