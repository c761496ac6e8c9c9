//! Commit and push of regenerated output.

use regen_git::{GitError, GitOid, Signature};
use tracing::{info, instrument};

use crate::error::{RegenError, Result};
use crate::session::RepositorySession;

pub const BOT_NAME: &str = "speakeasybot";
pub const BOT_EMAIL: &str = "bot@speakeasyapi.dev";

/// Remote every push goes to.
pub const REMOTE: &str = "origin";

/// Author and committer of every commit this tool makes.
#[must_use]
pub fn bot_signature() -> Signature {
    Signature::new(BOT_NAME, BOT_EMAIL)
}

/// Provenance message for a regeneration commit.
#[must_use]
pub fn commit_message(spec_version: &str, generator_version: &str) -> String {
    format!("ci: regenerated with OpenAPI Doc {spec_version}, Speakeasy CLI {generator_version}")
}

/// Stages, commits and pushes the working copy's current branch.
pub struct CommitPublisher<'a> {
    session: &'a RepositorySession,
}

impl<'a> CommitPublisher<'a> {
    #[must_use]
    pub const fn new(session: &'a RepositorySession) -> Self {
        Self { session }
    }

    /// Stage every change, commit as the bot, push the current branch.
    ///
    /// # Errors
    /// - [`RegenError::NothingToCommit`] when staging leaves the index equal
    ///   to `HEAD`.
    /// - [`RegenError::PushRejected`] when the remote branch moved.
    #[instrument(skip(self))]
    pub fn commit_and_push(&self, spec_version: &str, generator_version: &str) -> Result<GitOid> {
        let repo = self.session.repo("commit_and_push")?;
        let branch = repo.current_branch()?.ok_or_else(|| GitError::NotFound {
            message: "HEAD is detached; nothing to push".to_owned(),
        })?;

        repo.stage_all()?;
        if !repo.has_staged_changes()? {
            return Err(RegenError::NothingToCommit { branch });
        }

        let commit = repo.commit(
            &commit_message(spec_version, generator_version),
            &bot_signature(),
        )?;

        repo.push_branch(REMOTE, &branch).map_err(|source| match source {
            GitError::PushRejected { .. } => RegenError::PushRejected {
                branch: branch.clone(),
                source,
            },
            other => RegenError::Git(other),
        })?;

        info!(%branch, %commit, "committed and pushed");
        Ok(commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_both_versions() {
        assert_eq!(
            commit_message("3.0.0", "1.19.2"),
            "ci: regenerated with OpenAPI Doc 3.0.0, Speakeasy CLI 1.19.2"
        );
    }

    #[test]
    fn bot_identity() {
        let sig = bot_signature();
        assert_eq!(sig.name, "speakeasybot");
        assert_eq!(sig.email, "bot@speakeasyapi.dev");
    }
}
