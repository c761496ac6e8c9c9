//! The per-run repository session.
//!
//! A [`RepositorySession`] pairs the host API client with the working copy
//! once it exists. The working copy is absent until
//! [`RepositorySession::clone_repository`] (or [`RepositorySession::open`])
//! binds it; every other operation asks for it through
//! [`RepositorySession::repo`], which fails with
//! [`RegenError::RepositoryNotCloned`] before that.

use std::fmt;
use std::path::Path;

use regen_git::{Credential, GitRepo, GixRepo};
use tracing::{info, instrument};

use crate::error::{RegenError, Result};
use crate::host::PullRequestHost;

pub struct RepositorySession {
    credential: Option<Credential>,
    repo: Option<Box<dyn GitRepo>>,
    host: Box<dyn PullRequestHost>,
}

impl RepositorySession {
    /// An unbound session.
    #[must_use]
    pub fn new(host: Box<dyn PullRequestHost>, credential: Option<Credential>) -> Self {
        Self {
            credential,
            repo: None,
            host,
        }
    }

    /// Clone `url` at `branch` (single branch) into `dest` and bind it.
    ///
    /// # Errors
    /// [`RegenError::Git`] if the clone fails.
    #[instrument(skip(self), fields(dest = %dest.display()))]
    pub fn clone_repository(&mut self, url: &str, dest: &Path, branch: Option<&str>) -> Result<()> {
        let repo = GixRepo::clone_from(url, dest, branch, self.credential.clone())?;
        info!("cloned repository");
        self.repo = Some(Box::new(repo));
        Ok(())
    }

    /// Bind an existing working copy at `path`.
    ///
    /// # Errors
    /// [`RegenError::Git`] if `path` is not a non-bare repository.
    pub fn open(&mut self, path: &Path) -> Result<()> {
        let mut repo = GixRepo::open(path)?;
        if let Some(credential) = &self.credential {
            repo = repo.with_credential(credential.clone());
        }
        self.repo = Some(Box::new(repo));
        Ok(())
    }

    /// Bind an already-opened working copy.
    pub fn bind(&mut self, repo: Box<dyn GitRepo>) {
        self.repo = Some(repo);
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.repo.is_some()
    }

    /// The working copy, for `operation`.
    ///
    /// # Errors
    /// [`RegenError::RepositoryNotCloned`] when nothing is bound yet.
    pub fn repo(&self, operation: &'static str) -> Result<&dyn GitRepo> {
        self.repo
            .as_deref()
            .ok_or(RegenError::RepositoryNotCloned { operation })
    }

    #[must_use]
    pub fn host(&self) -> &dyn PullRequestHost {
        self.host.as_ref()
    }
}

impl fmt::Debug for RepositorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositorySession")
            .field("credential", &self.credential)
            .field("workdir", &self.repo.as_ref().map(|r| r.workdir().to_owned()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostError, NewPullRequest, PullRequest, Tag};

    struct NoHost;

    impl PullRequestHost for NoHost {
        fn list_open_pull_requests(&self, _: &str, _: &str) -> Result<Vec<PullRequest>, HostError> {
            Ok(Vec::new())
        }
        fn create_pull_request(
            &self,
            _: &str,
            _: &str,
            _: &NewPullRequest,
        ) -> Result<PullRequest, HostError> {
            unreachable!()
        }
        fn update_pull_request_body(
            &self,
            _: &str,
            _: &str,
            _: u64,
            _: &str,
        ) -> Result<PullRequest, HostError> {
            unreachable!()
        }
        fn first_tag(&self, _: &str, _: &str) -> Result<Option<Tag>, HostError> {
            Ok(None)
        }
    }

    #[test]
    fn unbound_session_rejects_repo_access() {
        let session = RepositorySession::new(Box::new(NoHost), None);
        assert!(!session.is_bound());
        let err = session.repo("is_significant").err().unwrap();
        assert!(matches!(
            err,
            RegenError::RepositoryNotCloned {
                operation: "is_significant"
            }
        ));
    }

    #[test]
    fn debug_hides_secret() {
        let session = RepositorySession::new(
            Box::new(NoHost),
            Some(Credential::new("gen", "ghp_topsecret")),
        );
        assert!(!format!("{session:?}").contains("ghp_topsecret"));
    }

    #[test]
    fn open_rejects_non_repository() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = RepositorySession::new(Box::new(NoHost), None);
        assert!(session.open(dir.path()).is_err());
        assert!(!session.is_bound());
    }
}
