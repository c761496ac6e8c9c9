//! Push operations via the git CLI.
//!
//! gix does not provide a push API; these shell out with the repository's
//! credential helper.

use crate::cmd::GitOutput;
use crate::error::GitError;
use crate::gix_repo::GixRepo;

pub fn push_branch(repo: &GixRepo, remote: &str, branch: &str) -> Result<(), GitError> {
    let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
    push(repo, remote, &refspec)
}

pub fn delete_remote_branch(repo: &GixRepo, remote: &str, branch: &str) -> Result<(), GitError> {
    let refspec = format!(":refs/heads/{branch}");
    push(repo, remote, &refspec)
}

fn push(repo: &GixRepo, remote: &str, refspec: &str) -> Result<(), GitError> {
    let out = repo.git(&["push", "--porcelain", remote, refspec])?;
    if out.success {
        return Ok(());
    }
    Err(classify_failure(remote, refspec, &out))
}

fn classify_failure(remote: &str, refspec: &str, out: &GitOutput) -> GitError {
    let message = format!("{}{}", out.stdout.trim(), out.stderr.trim());
    let rejected = ["[rejected]", "non-fast-forward", "fetch first", "stale info"]
        .iter()
        .any(|marker| message.contains(marker));
    if rejected {
        GitError::PushRejected {
            remote: remote.to_owned(),
            refspec: refspec.to_owned(),
            message,
        }
    } else {
        GitError::PushFailed {
            remote: remote.to_owned(),
            message,
        }
    }
}
