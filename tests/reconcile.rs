mod common;

use common::{FakeHost, TITLE, config, pr, remote_head, setup};

use regen::changelog::NoChangelog;
use regen::error::RegenError;
use regen::ledger::ReleaseRecord;
use regen::publish::CommitPublisher;
use regen::reconcile::{BranchState, ReconcileState, Reconciler};
use regen::session::RepositorySession;

fn record() -> ReleaseRecord {
    ReleaseRecord::new("1.2.0", "3.0.0", "openapi.yaml", "1.19.2")
}

// ===========================================================================
// find_existing_pull_request
// ===========================================================================

#[test]
fn no_pull_request_keeps_desired_branch() {
    let fx = setup(FakeHost::with_open(vec![pr(7, "chore: something else", "other")]));
    let cfg = config("pr", "");
    let mut reconciler = Reconciler::new(&fx.session, &cfg);

    let first = reconciler.find_existing_pull_request("").unwrap();
    let second = reconciler.find_existing_pull_request("").unwrap();
    assert_eq!(first, (String::new(), None));
    assert_eq!(first, second);
    assert_eq!(fx.host.state().list_calls, 2);
    assert_eq!(fx.host.mutations(), 0);
}

#[test]
fn existing_pull_request_supplies_branch() {
    let fx = setup(FakeHost::with_open(vec![pr(12, TITLE, "speakeasy-sdk-regen-1")]));
    let cfg = config("pr", "");
    let mut reconciler = Reconciler::new(&fx.session, &cfg);

    let (branch, found) = reconciler.find_existing_pull_request("").unwrap();
    assert_eq!(branch, "speakeasy-sdk-regen-1");
    assert_eq!(found.unwrap().number, 12);

    // Same answer when the operator names the same branch.
    let (branch, _) = reconciler
        .find_existing_pull_request("speakeasy-sdk-regen-1")
        .unwrap();
    assert_eq!(branch, "speakeasy-sdk-regen-1");
    assert_eq!(fx.host.mutations(), 0);
}

#[test]
fn pull_request_on_other_branch_is_mismatch() {
    let fx = setup(FakeHost::with_open(vec![pr(3, TITLE, "feature-x")]));
    let cfg = config("pr", "feature-y");
    let mut reconciler = Reconciler::new(&fx.session, &cfg);

    let err = reconciler.find_existing_pull_request("feature-y").unwrap_err();
    match err {
        RegenError::BranchMismatch {
            number,
            existing,
            requested,
        } => {
            assert_eq!(number, 3);
            assert_eq!(existing, "feature-x");
            assert_eq!(requested, "feature-y");
        }
        other => panic!("expected BranchMismatch, got {other:?}"),
    }
}

#[test]
fn several_matching_pull_requests_are_ambiguous() {
    let fx = setup(FakeHost::with_open(vec![pr(1, TITLE, "a"), pr(2, TITLE, "b")]));
    let cfg = config("pr", "");
    let mut reconciler = Reconciler::new(&fx.session, &cfg);

    let err = reconciler.find_existing_pull_request("").unwrap_err();
    assert!(
        matches!(err, RegenError::AmbiguousPullRequest { ref numbers, .. } if *numbers == [1, 2]),
        "got {err:?}"
    );
}

#[test]
fn unbound_session_is_rejected() {
    let session = RepositorySession::new(Box::new(FakeHost::default()), None);
    let cfg = config("pr", "");
    let mut reconciler = Reconciler::new(&session, &cfg);

    assert!(matches!(
        reconciler.find_existing_pull_request(""),
        Err(RegenError::RepositoryNotCloned { .. })
    ));
    assert!(matches!(
        reconciler.resolve_branch(""),
        Err(RegenError::RepositoryNotCloned { .. })
    ));
    assert!(matches!(
        reconciler.merge_branch("x"),
        Err(RegenError::RepositoryNotCloned { .. })
    ));
}

// ===========================================================================
// resolve_branch
// ===========================================================================

#[test]
fn empty_desired_generates_timestamped_branch() {
    let fx = setup(FakeHost::default());
    let cfg = config("direct", "");
    let mut reconciler = Reconciler::new(&fx.session, &cfg);

    let branch = reconciler.resolve_branch("").unwrap();
    assert_eq!(branch, "speakeasy-sdk-regen-1700000000");
    let repo = fx.session.repo("test").unwrap();
    assert_eq!(repo.current_branch().unwrap().as_deref(), Some(branch.as_str()));
    assert_eq!(
        reconciler.state(),
        &ReconcileState::BranchResolved(BranchState::Generated(branch.clone()))
    );

    // A second resolution in the same run does not collide.
    let again = reconciler.resolve_branch("").unwrap();
    assert_eq!(again, "speakeasy-sdk-regen-1700000000-2");
}

#[test]
fn missing_remote_branch_is_not_found() {
    let fx = setup(FakeHost::default());
    let cfg = config("pr", "nope");
    let mut reconciler = Reconciler::new(&fx.session, &cfg);

    let err = reconciler.resolve_branch("nope").unwrap_err();
    assert!(
        matches!(err, RegenError::BranchNotFound { ref branch } if branch == "nope"),
        "got {err:?}"
    );
}

#[test]
fn supplied_branch_is_fetched_and_checked_out() {
    let fx = setup(FakeHost::default());
    fx.push_remote_branch("regen", "sdk/extra.ts", "export {};\n");
    let cfg = config("pr", "regen");
    let mut reconciler = Reconciler::new(&fx.session, &cfg);

    let branch = reconciler.resolve_branch("regen").unwrap();
    assert_eq!(branch, "regen");
    assert!(fx.workdir().join("sdk/extra.ts").exists());
    assert_eq!(
        reconciler.state(),
        &ReconcileState::BranchResolved(BranchState::Supplied("regen".to_owned()))
    );
}

#[test]
fn discovered_branch_is_recorded() {
    let fx = setup(FakeHost::with_open(vec![pr(5, TITLE, "regen")]));
    fx.push_remote_branch("regen", "sdk/extra.ts", "export {};\n");
    let cfg = config("pr", "");
    let mut reconciler = Reconciler::new(&fx.session, &cfg);

    let (desired, _) = reconciler.find_existing_pull_request("").unwrap();
    reconciler.resolve_branch(&desired).unwrap();
    assert_eq!(
        reconciler.state(),
        &ReconcileState::BranchResolved(BranchState::Discovered("regen".to_owned()))
    );
}

// ===========================================================================
// Pull requests
// ===========================================================================

#[test]
fn creates_pull_request_with_deterministic_title() {
    let fx = setup(FakeHost::default());
    let cfg = config("pr", "");
    let mut reconciler = Reconciler::new(&fx.session, &cfg);

    let created = reconciler
        .create_or_update_pull_request("regen", &record(), "1.18.0", None, &NoChangelog)
        .unwrap();
    assert_eq!(created.head_ref, "regen");

    let state = fx.host.state();
    assert_eq!(state.created.len(), 1);
    let new = &state.created[0];
    assert_eq!(new.title, TITLE);
    assert_eq!(new.head, "regen");
    assert_eq!(new.base, "main");
    assert!(new.maintainer_can_modify);
    assert!(new.body.starts_with("# Generated by Speakeasy CLI\nBased on:\n"));
    assert!(!new.body.contains("CHANGELOG"));
}

#[test]
fn existing_pull_request_gets_body_update_only() {
    let existing = pr(9, TITLE, "regen");
    let fx = setup(FakeHost::with_open(vec![existing.clone()]));
    let cfg = config("pr", "");
    let mut reconciler = Reconciler::new(&fx.session, &cfg);
    let changelog = |current: &str, previous: &str| -> regen::Result<String> {
        Ok(format!("- generator {previous} -> {current}"))
    };

    let updated = reconciler
        .create_or_update_pull_request("regen", &record(), "1.18.0", Some(&existing), &changelog)
        .unwrap();
    assert_eq!(updated.number, 9);

    let state = fx.host.state();
    assert!(state.created.is_empty());
    assert_eq!(state.updated.len(), 1);
    let (number, body) = &state.updated[0];
    assert_eq!(*number, 9);
    assert!(body.ends_with("\n\n\n## CHANGELOG\n\n- generator 1.18.0 -> 1.19.2"));
    drop(state);
    assert!(matches!(reconciler.state(), ReconcileState::PullRequestOpen(p) if p.number == 9));
}

#[test]
fn unprocessable_create_is_conflict() {
    let host = FakeHost::default();
    host.0.borrow_mut().fail_create = Some(422);
    let fx = setup(host);
    let cfg = config("pr", "");
    let mut reconciler = Reconciler::new(&fx.session, &cfg);

    let err = reconciler
        .create_or_update_pull_request("regen", &record(), "", None, &NoChangelog)
        .unwrap_err();
    assert!(matches!(err, RegenError::PullRequestConflict { .. }), "got {err:?}");
}

// ===========================================================================
// Commit, merge, delete
// ===========================================================================

#[test]
fn commit_without_changes_is_rejected() {
    let fx = setup(FakeHost::default());
    let err = CommitPublisher::new(&fx.session)
        .commit_and_push("3.0.0", "1.19.2")
        .unwrap_err();
    assert!(
        matches!(err, RegenError::NothingToCommit { ref branch } if branch == "main"),
        "got {err:?}"
    );
}

#[test]
fn commit_on_stale_branch_is_push_rejected() {
    let fx = setup(FakeHost::default());
    fx.advance_remote_main("docs/usage.md", "use it\n");
    let before = remote_head(fx.remote.path(), "main");

    fx.write("sdk/new.ts", "export const added = true;\n");
    let err = CommitPublisher::new(&fx.session)
        .commit_and_push("3.0.0", "1.19.2")
        .unwrap_err();
    assert!(
        matches!(err, RegenError::PushRejected { ref branch, .. } if branch == "main"),
        "got {err:?}"
    );
    assert_eq!(remote_head(fx.remote.path(), "main"), before);
}

#[test]
fn merge_onto_moved_target_is_push_rejected() {
    let fx = setup(FakeHost::default());
    let cfg = config("direct", "");
    let mut reconciler = Reconciler::new(&fx.session, &cfg);

    let branch = reconciler.resolve_branch("").unwrap();
    fx.write("sdk/new.ts", "export const added = true;\n");
    CommitPublisher::new(&fx.session)
        .commit_and_push("3.0.0", "1.19.2")
        .unwrap();

    // main moves without touching the regenerated files.
    fx.advance_remote_main("docs/usage.md", "use it\n");
    let before = remote_head(fx.remote.path(), "main");

    let err = reconciler.merge_branch(&branch).unwrap_err();
    assert!(
        matches!(err, RegenError::PushRejected { ref branch, .. } if branch == "main"),
        "got {err:?}"
    );
    assert_eq!(remote_head(fx.remote.path(), "main"), before);
}

#[test]
fn merge_branch_pushes_target_and_delete_removes_branch() {
    let fx = setup(FakeHost::default());
    let cfg = config("direct", "");
    let mut reconciler = Reconciler::new(&fx.session, &cfg);

    let branch = reconciler.resolve_branch("").unwrap();
    fx.write("sdk/new.ts", "export const added = true;\n");
    let commit = CommitPublisher::new(&fx.session)
        .commit_and_push("3.0.0", "1.19.2")
        .unwrap();
    assert_eq!(remote_head(fx.remote.path(), &branch), Some(commit.to_string()));

    let merged = reconciler.merge_branch(&branch).unwrap();
    assert_eq!(merged, commit);
    assert_eq!(remote_head(fx.remote.path(), "main"), Some(commit.to_string()));

    reconciler.delete_branch(&branch).unwrap();
    assert_eq!(remote_head(fx.remote.path(), &branch), None);
}

#[test]
fn conflicting_merge_is_reported() {
    let fx = setup(FakeHost::default());
    let cfg = config("direct", "");
    let mut reconciler = Reconciler::new(&fx.session, &cfg);

    let branch = reconciler.resolve_branch("").unwrap();
    fx.write("sdk/index.ts", "export const answer = 42;\n");
    CommitPublisher::new(&fx.session)
        .commit_and_push("3.0.0", "1.19.2")
        .unwrap();

    // Someone else moves main in a conflicting direction.
    fx.advance_remote_main("sdk/index.ts", "export const answer = 43;\n");
    fx.session
        .repo("test")
        .unwrap()
        .fetch_branch("origin", "main")
        .unwrap();

    let err = reconciler.merge_branch(&branch).unwrap_err();
    assert!(
        matches!(err, RegenError::MergeConflict { ref target, .. } if target == "main"),
        "got {err:?}"
    );
}
