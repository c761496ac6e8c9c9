//! git CLI invocation.
//!
//! Network operations, commits and merges go through the `git` binary
//! because gix does not provide high-level push or merge-into-worktree.
//! The credential, when present, is supplied through an inline credential
//! helper that reads it from the child's environment.

use std::process::{Command, Output};

use tracing::debug;

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::{Credential, Signature};

const USERNAME_VAR: &str = "REGEN_GIT_USERNAME";
const SECRET_VAR: &str = "REGEN_GIT_SECRET";

const CREDENTIAL_HELPER: &str = "credential.helper=!f() { test \"$1\" = get || exit 0; \
     echo \"username=${REGEN_GIT_USERNAME}\"; echo \"password=${REGEN_GIT_SECRET}\"; }; f";

/// Captured result of a git subprocess.
pub struct GitOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for GitOutput {
    fn from(out: Output) -> Self {
        Self {
            success: out.status.success(),
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        }
    }
}

/// Build a `git` command with the credential helper and identity wired in.
pub fn command(
    cwd: &std::path::Path,
    credential: Option<&Credential>,
    signature: Option<&Signature>,
    args: &[&str],
) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(cwd).env("GIT_TERMINAL_PROMPT", "0");
    if let Some(cred) = credential {
        cmd.args(["-c", "credential.helper=", "-c", CREDENTIAL_HELPER])
            .env(USERNAME_VAR, cred.username())
            .env(SECRET_VAR, cred.secret());
    }
    if let Some(sig) = signature {
        cmd.env("GIT_AUTHOR_NAME", &sig.name)
            .env("GIT_AUTHOR_EMAIL", &sig.email)
            .env("GIT_COMMITTER_NAME", &sig.name)
            .env("GIT_COMMITTER_EMAIL", &sig.email);
    }
    cmd.args(args);
    cmd
}

impl GixRepo {
    /// Run git in the working tree and capture output regardless of exit
    /// status.
    pub(crate) fn git(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        self.git_as(args, None)
    }

    /// Like [`git`](Self::git) with an explicit author/committer identity.
    pub(crate) fn git_as(
        &self,
        args: &[&str],
        signature: Option<&Signature>,
    ) -> Result<GitOutput, GitError> {
        debug!(args = %args.join(" "), "running git");
        let out = command(&self.workdir, self.credential.as_ref(), signature, args).output()?;
        Ok(out.into())
    }

    /// Run git and fail with [`GitError::CommandFailed`] on non-zero exit.
    pub(crate) fn git_ok(&self, args: &[&str]) -> Result<String, GitError> {
        let out = self.git(args)?;
        if out.success {
            Ok(out.stdout)
        } else {
            Err(command_failed(args, &out))
        }
    }
}

pub fn command_failed(args: &[&str], out: &GitOutput) -> GitError {
    GitError::CommandFailed {
        command: args.join(" "),
        stderr: out.stderr.trim().to_owned(),
    }
}
