//! Branch checkout and creation.

use crate::cmd::command_failed;
use crate::error::GitError;
use crate::gix_repo::GixRepo;

pub fn checkout_branch(repo: &GixRepo, branch: &str) -> Result<(), GitError> {
    let args = ["checkout", "--quiet", branch, "--"];
    let out = repo.git(&args)?;
    if out.success {
        return Ok(());
    }
    if out.stderr.contains("did not match any") || out.stderr.contains("invalid reference") {
        return Err(GitError::NotFound {
            message: format!("branch `{branch}` does not exist locally"),
        });
    }
    Err(command_failed(&args, &out))
}

pub fn create_branch(repo: &GixRepo, branch: &str) -> Result<(), GitError> {
    repo.git_ok(&["checkout", "--quiet", "-b", branch])?;
    Ok(())
}
