//! One regeneration cycle, end to end.
//!
//! Order matters: the ledger record is appended before the commit so it
//! ships with the generated output, and nothing is pushed when the detector
//! finds no significant change.

use std::path::Path;
use std::process::Command;

use regen_git::GitOid;
use serde::Serialize;
use tracing::{info, instrument};

use crate::changelog::ChangelogSource;
use crate::config::{Mode, PipelineConfig};
use crate::detect::{self, SignificancePolicy};
use crate::error::{RegenError, Result};
use crate::host::PullRequest;
use crate::ledger::{LedgerStore, ReleaseRecord};
use crate::publish::CommitPublisher;
use crate::reconcile::Reconciler;
use crate::session::RepositorySession;

/// Produces the output tree inside the working copy and describes the
/// release it amounts to.
pub trait Generator {
    /// # Errors
    /// [`RegenError::Generator`] when generation fails.
    fn generate(&mut self, workdir: &Path) -> Result<ReleaseRecord>;
}

impl<F> Generator for F
where
    F: FnMut(&Path) -> Result<ReleaseRecord>,
{
    fn generate(&mut self, workdir: &Path) -> Result<ReleaseRecord> {
        self(workdir)
    }
}

/// Runs an optional command in the working copy, then reports a fixed
/// record. With no command the tree is assumed to be generated already.
#[derive(Clone, Debug)]
pub struct CommandGenerator {
    argv: Vec<String>,
    record: ReleaseRecord,
}

impl CommandGenerator {
    #[must_use]
    pub const fn new(argv: Vec<String>, record: ReleaseRecord) -> Self {
        Self { argv, record }
    }
}

impl Generator for CommandGenerator {
    fn generate(&mut self, workdir: &Path) -> Result<ReleaseRecord> {
        if let Some((program, args)) = self.argv.split_first() {
            info!(program, ?args, "running generator");
            let status = Command::new(program)
                .args(args)
                .current_dir(workdir)
                .status()
                .map_err(|e| RegenError::Generator(format!("could not run {program}: {e}")))?;
            if !status.success() {
                return Err(RegenError::Generator(format!("{program} exited with {status}")));
            }
        }
        Ok(self.record.clone())
    }
}

/// What a cycle did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing significant changed; nothing was pushed.
    NoChange { branch: String },
    /// The change is on `branch` with a pull request open.
    PullRequest {
        branch: String,
        commit: GitOid,
        pull_request: PullRequest,
    },
    /// The change was merged into the target branch and `branch` deleted.
    Merged {
        branch: String,
        commit: GitOid,
        merge_commit: GitOid,
    },
}

/// Run one cycle against a bound session.
///
/// # Errors
/// Any error of the components involved; the cycle stops at the first.
#[instrument(skip_all, fields(mode = %config.mode))]
pub fn run_cycle(
    session: &RepositorySession,
    config: &PipelineConfig,
    generator: &mut dyn Generator,
    changelog: &dyn ChangelogSource,
) -> Result<CycleOutcome> {
    let mut reconciler = Reconciler::new(session, config);

    let (branch, existing) = match config.mode {
        Mode::Pr => {
            let (desired, existing) = reconciler.find_existing_pull_request(&config.branch_name)?;
            (reconciler.resolve_branch(&desired)?, existing)
        }
        Mode::Direct => (reconciler.resolve_branch("")?, None),
    };

    let workdir = session.repo("run_cycle")?.workdir().to_owned();
    let record = generator.generate(&workdir)?;

    if config.force {
        info!("force set; skipping change detection");
    } else {
        let policy = SignificancePolicy::from(&config.detection);
        if !detect::is_significant(session, &policy, &config.sdk_dir)? {
            info!(%branch, "no significant changes");
            return Ok(CycleOutcome::NoChange { branch });
        }
    }

    LedgerStore::in_repo(&workdir).append(&record)?;
    let commit = CommitPublisher::new(session)
        .commit_and_push(&record.spec_version, &record.generator_version)?;
    reconciler.mark_committed(&branch, commit);

    match config.mode {
        Mode::Pr => {
            let pull_request = reconciler.create_or_update_pull_request(
                &branch,
                &record,
                &config.previous_generator_version,
                existing.as_ref(),
                changelog,
            )?;
            Ok(CycleOutcome::PullRequest {
                branch,
                commit,
                pull_request,
            })
        }
        Mode::Direct => {
            let merge_commit = reconciler.merge_branch(&branch)?;
            reconciler.delete_branch(&branch)?;
            Ok(CycleOutcome::Merged {
                branch,
                commit,
                merge_commit,
            })
        }
    }
}

/// Merge an already pushed `branch` into the target and delete it.
///
/// # Errors
/// [`RegenError::BranchNotFound`], [`RegenError::MergeConflict`] or any
/// push failure.
#[instrument(skip(session, config))]
pub fn finalize(session: &RepositorySession, config: &PipelineConfig, branch: &str) -> Result<GitOid> {
    let mut reconciler = Reconciler::new(session, config);
    reconciler.resolve_branch(branch)?;
    let merge_commit = reconciler.merge_branch(branch)?;
    reconciler.delete_branch(branch)?;
    Ok(merge_commit)
}

/// The last released version and what the release step should do with it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReleaseSummary {
    #[serde(flatten)]
    pub record: ReleaseRecord,
    /// Cut a git release (tag) for this version.
    pub create_git_release: bool,
}

/// Read the last ledger record from the session's working copy.
///
/// # Errors
/// [`RegenError::RepositoryNotCloned`] before clone, otherwise as
/// [`LedgerStore::read_last`].
#[instrument(skip(session, config))]
pub fn last_release(session: &RepositorySession, config: &PipelineConfig) -> Result<ReleaseSummary> {
    let repo = session.repo("last_release")?;
    let record = LedgerStore::in_repo(repo.workdir()).read_last()?;
    info!(release = %record.release_version, "read last release");
    Ok(ReleaseSummary {
        record,
        create_git_release: config.create_git_release(),
    })
}
