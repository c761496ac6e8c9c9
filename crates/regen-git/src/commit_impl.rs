//! Staging and committing.

use crate::cmd::command_failed;
use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::repo::GitRepo;
use crate::types::*;

pub fn stage_all(repo: &GixRepo) -> Result<(), GitError> {
    repo.git_ok(&["add", "--all"])?;
    Ok(())
}

pub fn commit(repo: &GixRepo, message: &str, signature: &Signature) -> Result<GitOid, GitError> {
    let args = ["commit", "--quiet", "--no-verify", "-m", message];
    let out = repo.git_as(&args, Some(signature))?;
    if !out.success {
        return Err(command_failed(&args[..2], &out));
    }
    repo.head_oid()
}
