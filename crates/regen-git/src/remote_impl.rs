//! Clone and fetch via the git CLI.

use std::path::Path;

use tracing::info;

use crate::cmd::{GitOutput, command, command_failed};
use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::Credential;

pub fn clone(
    url: &str,
    dest: &Path,
    branch: Option<&str>,
    credential: Option<&Credential>,
) -> Result<(), GitError> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let dest_str = dest.to_string_lossy();
    let mut args = vec!["clone", "--quiet", "--single-branch"];
    if let Some(branch) = branch {
        args.extend(["--branch", branch]);
    }
    args.extend([url, dest_str.as_ref()]);

    info!(url, dest = %dest.display(), branch = branch.unwrap_or("<default>"), "cloning repository");
    let out: GitOutput = command(Path::new("."), credential, None, &args).output()?.into();
    if out.success {
        Ok(())
    } else {
        Err(command_failed(&["clone", url], &out))
    }
}

pub fn fetch_branch(repo: &GixRepo, remote: &str, branch: &str) -> Result<(), GitError> {
    let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
    let args = ["fetch", "--quiet", "--update-head-ok", remote, &refspec];
    let out = repo.git(&args)?;
    if out.success {
        return Ok(());
    }
    if out.stderr.contains("couldn't find remote ref") {
        return Err(GitError::NotFound {
            message: format!("remote `{remote}` has no branch `{branch}`"),
        });
    }
    Err(command_failed(&args, &out))
}
