//! Branch and pull request reconciliation.
//!
//! Maps one regeneration cycle onto the host's branch and pull-request
//! primitives so that re-running the same cycle converges on one branch and
//! one pull request instead of piling up duplicates.
//!
//! ```text
//! Unresolved ──resolve_branch──▶ BranchResolved ──(commit)──▶ Committed
//!                                                              │
//!                     create_or_update_pull_request ◀──────────┤ pr mode
//!                                 │                            │
//!                                 ▼                            ▼ direct mode
//!                          PullRequestOpen                   Merged
//! ```

use regen_git::{GitError, GitOid, RefName};
use tracing::{info, instrument, warn};

use crate::changelog::ChangelogSource;
use crate::config::PipelineConfig;
use crate::error::{RegenError, Result};
use crate::host::{NewPullRequest, PullRequest};
use crate::ledger::ReleaseRecord;
use crate::publish::{REMOTE, bot_signature};
use crate::session::RepositorySession;

/// Prefix of branches generated when none is requested.
pub const GENERATED_BRANCH_PREFIX: &str = "speakeasy-sdk-regen-";

/// Where the cycle's branch came from.
///
/// Direct mode has no variant of its own: it also commits to a generated
/// branch, which is merged into the target and then deleted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BranchState {
    /// Named by the operator.
    Supplied(String),
    /// Taken from the head of the open regeneration pull request.
    Discovered(String),
    /// Created fresh from the invocation time.
    Generated(String),
}

impl BranchState {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Supplied(n) | Self::Discovered(n) | Self::Generated(n) => n,
        }
    }
}

/// Progress of the reconciler through one cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileState {
    Unresolved,
    BranchResolved(BranchState),
    Committed { branch: String, commit: GitOid },
    PullRequestOpen(PullRequest),
    Merged { branch: String, commit: GitOid },
}

/// Markdown body of the regeneration pull request.
#[must_use]
pub fn pull_request_body(record: &ReleaseRecord, changelog: &str) -> String {
    let mut body = format!(
        "# Generated by Speakeasy CLI\nBased on:\n- OpenAPI Doc {} {}\n- Speakeasy CLI {} https://github.com/speakeasy-api/speakeasy",
        record.spec_version, record.spec_location, record.generator_version
    );
    if !changelog.trim().is_empty() {
        body.push_str("\n\n\n## CHANGELOG\n\n");
        body.push_str(changelog);
    }
    body
}

pub struct Reconciler<'a> {
    session: &'a RepositorySession,
    config: &'a PipelineConfig,
    discovered: Option<String>,
    state: ReconcileState,
}

impl<'a> Reconciler<'a> {
    #[must_use]
    pub const fn new(session: &'a RepositorySession, config: &'a PipelineConfig) -> Self {
        Self {
            session,
            config,
            discovered: None,
            state: ReconcileState::Unresolved,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ReconcileState {
        &self.state
    }

    /// Record a pushed commit on `branch`.
    pub fn mark_committed(&mut self, branch: &str, commit: GitOid) {
        self.state = ReconcileState::Committed {
            branch: branch.to_owned(),
            commit,
        };
    }

    /// Look for the open pull request titled for this workflow.
    ///
    /// Returns the branch to use and the pull request, if any. Read-only on
    /// the host.
    ///
    /// # Errors
    /// - [`RegenError::BranchMismatch`] when a pull request exists on a
    ///   different branch than a non-empty `desired`.
    /// - [`RegenError::AmbiguousPullRequest`] when several match.
    #[instrument(skip(self))]
    pub fn find_existing_pull_request(
        &mut self,
        desired: &str,
    ) -> Result<(String, Option<PullRequest>)> {
        self.session.repo("find_existing_pull_request")?;
        let title = self.config.pr_title();
        let prs = self
            .session
            .host()
            .list_open_pull_requests(&self.config.owner, &self.config.repo)?;

        let mut matching: Vec<PullRequest> = prs.into_iter().filter(|pr| pr.title == title).collect();
        if matching.len() > 1 {
            return Err(RegenError::AmbiguousPullRequest {
                title,
                numbers: matching.iter().map(|pr| pr.number).collect(),
            });
        }

        let Some(pr) = matching.pop() else {
            info!("no existing pull request");
            return Ok((desired.to_owned(), None));
        };

        if !desired.is_empty() && pr.head_ref != desired {
            return Err(RegenError::BranchMismatch {
                number: pr.number,
                existing: pr.head_ref,
                requested: desired.to_owned(),
            });
        }

        info!(number = pr.number, branch = %pr.head_ref, "found existing pull request");
        self.discovered = Some(pr.head_ref.clone());
        Ok((pr.head_ref.clone(), Some(pr)))
    }

    /// Check out `desired` from the remote, or create a fresh branch when it
    /// is empty.
    ///
    /// # Errors
    /// - [`RegenError::BranchNotFound`] when the remote lacks `desired`.
    /// - [`RegenError::VcsFetch`] for other fetch failures.
    #[instrument(skip(self))]
    pub fn resolve_branch(&mut self, desired: &str) -> Result<String> {
        let repo = self.session.repo("resolve_branch")?;

        let state = if desired.is_empty() {
            let name = self.generated_branch_name()?;
            repo.create_branch(&name)?;
            info!(branch = %name, "created branch");
            BranchState::Generated(name)
        } else {
            repo.fetch_branch(REMOTE, desired)
                .map_err(|source| match source {
                    GitError::NotFound { .. } => RegenError::BranchNotFound {
                        branch: desired.to_owned(),
                    },
                    source => RegenError::VcsFetch {
                        branch: desired.to_owned(),
                        source,
                    },
                })?;
            repo.checkout_branch(desired)?;
            info!(branch = desired, "checked out existing branch");
            if self.discovered.as_deref() == Some(desired) {
                BranchState::Discovered(desired.to_owned())
            } else {
                BranchState::Supplied(desired.to_owned())
            }
        };

        let name = state.name().to_owned();
        self.state = ReconcileState::BranchResolved(state);
        Ok(name)
    }

    /// `speakeasy-sdk-regen-<invoked_at>`, suffixed when a local branch of
    /// that name already exists.
    fn generated_branch_name(&self) -> Result<String> {
        let repo = self.session.repo("resolve_branch")?;
        let base = format!("{GENERATED_BRANCH_PREFIX}{}", self.config.invoked_at);
        let mut candidate = base.clone();
        let mut n = 1u32;
        while repo.read_ref(&RefName::branch(&candidate))?.is_some() {
            n += 1;
            candidate = format!("{base}-{n}");
        }
        Ok(candidate)
    }

    /// Delete `branch` on the remote.
    ///
    /// # Errors
    /// [`RegenError::Git`] if the push fails.
    #[instrument(skip(self))]
    pub fn delete_branch(&self, branch: &str) -> Result<()> {
        let repo = self.session.repo("delete_branch")?;
        repo.delete_remote_branch(REMOTE, branch)?;
        info!(branch, "deleted remote branch");
        Ok(())
    }

    /// Edit the body of `existing`, or open a new pull request from `branch`
    /// into the target branch.
    ///
    /// # Errors
    /// - [`RegenError::Changelog`] when the changelog lookup fails.
    /// - [`RegenError::PullRequestConflict`] on HTTP 409/422.
    #[instrument(skip(self, record, existing, changelog), fields(release = %record.release_version))]
    pub fn create_or_update_pull_request(
        &mut self,
        branch: &str,
        record: &ReleaseRecord,
        previous_generator_version: &str,
        existing: Option<&PullRequest>,
        changelog: &dyn ChangelogSource,
    ) -> Result<PullRequest> {
        self.session.repo("create_or_update_pull_request")?;
        let text = changelog.changelog(&record.generator_version, previous_generator_version)?;
        let body = pull_request_body(record, &text);
        let host = self.session.host();
        let (owner, repo) = (&self.config.owner, &self.config.repo);

        let pr = if let Some(existing) = existing {
            info!(number = existing.number, "updating pull request");
            host.update_pull_request_body(owner, repo, existing.number, &body)?
        } else {
            info!("creating pull request");
            host.create_pull_request(
                owner,
                repo,
                &NewPullRequest {
                    title: self.config.pr_title(),
                    head: branch.to_owned(),
                    base: self.config.target_branch().to_owned(),
                    body,
                    maintainer_can_modify: true,
                },
            )?
        };

        info!(url = %pr.html_url, "pull request ready");
        self.state = ReconcileState::PullRequestOpen(pr.clone());
        Ok(pr)
    }

    /// Merge `branch` into the target branch and push it.
    ///
    /// # Errors
    /// - [`RegenError::MergeConflict`] when the merge needs a human; the
    ///   working copy is left on the target branch with the merge aborted.
    /// - [`RegenError::PushRejected`] when the target moved on the remote.
    #[instrument(skip(self))]
    pub fn merge_branch(&mut self, branch: &str) -> Result<GitOid> {
        let repo = self.session.repo("merge_branch")?;
        let target = self.config.target_branch();

        repo.checkout_branch(target)?;
        repo.merge(branch, &bot_signature())
            .map_err(|source| match source {
                GitError::MergeConflict { .. } => RegenError::MergeConflict {
                    branch: branch.to_owned(),
                    target: target.to_owned(),
                    source,
                },
                other => RegenError::Git(other),
            })?;
        repo.push_branch(REMOTE, target)
            .map_err(|source| match source {
                GitError::PushRejected { .. } => RegenError::PushRejected {
                    branch: target.to_owned(),
                    source,
                },
                other => RegenError::Git(other),
            })
            .inspect_err(|e| warn!(error = %e, "push of merged target failed"))?;

        let commit = repo.head_oid()?;
        info!(%commit, target, "merged branch");
        self.state = ReconcileState::Merged {
            branch: branch.to_owned(),
            commit,
        };
        Ok(commit)
    }
}
