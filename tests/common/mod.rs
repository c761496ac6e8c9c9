//! Shared test helpers for sdk-regen integration tests.
//!
//! Every test gets a bare "origin" in a temp directory seeded with one
//! commit on `main`, and a session whose working copy is a fresh clone of
//! it. The VCS host is an in-memory [`FakeHost`].

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::Path;
use std::process::Command;
use std::rc::Rc;

use tempfile::TempDir;

use regen::config::PipelineConfig;
use regen::host::{HostError, NewPullRequest, PullRequest, PullRequestHost, Tag};
use regen::session::RepositorySession;

pub const TITLE: &str = "chore: speakeasy sdk regeneration - Generate";

/// Run git in `dir`, panicking on failure. Returns stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).into_owned()
}

/// Tip of `branch` in the bare remote, if it exists.
pub fn remote_head(remote: &Path, branch: &str) -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{branch}")])
        .current_dir(remote)
        .output()
        .expect("failed to run git");
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).trim().to_owned())
}

/// Contents of `path` at `branch` in the bare remote.
pub fn remote_file(remote: &Path, branch: &str, path: &str) -> Option<String> {
    let out = Command::new("git")
        .args(["show", &format!("{branch}:{path}")])
        .current_dir(remote)
        .output()
        .expect("failed to run git");
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).into_owned())
}

// ---------------------------------------------------------------------------
// FakeHost
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct HostState {
    pub open: Vec<PullRequest>,
    pub tags: Vec<Tag>,
    pub created: Vec<NewPullRequest>,
    pub updated: Vec<(u64, String)>,
    pub list_calls: usize,
    /// Status to fail the next create with.
    pub fail_create: Option<u16>,
    next_number: u64,
}

/// In-memory host. Clones share state so a test can inspect what the
/// session did.
#[derive(Clone, Debug, Default)]
pub struct FakeHost(pub Rc<RefCell<HostState>>);

impl FakeHost {
    pub fn with_open(prs: Vec<PullRequest>) -> Self {
        let host = Self::default();
        host.0.borrow_mut().open = prs;
        host
    }

    pub fn state(&self) -> std::cell::Ref<'_, HostState> {
        self.0.borrow()
    }

    pub fn mutations(&self) -> usize {
        let s = self.0.borrow();
        s.created.len() + s.updated.len()
    }
}

pub fn pr(number: u64, title: &str, head: &str) -> PullRequest {
    PullRequest {
        number,
        title: title.to_owned(),
        head_ref: head.to_owned(),
        html_url: format!("https://github.com/acme/sdk/pull/{number}"),
    }
}

impl PullRequestHost for FakeHost {
    fn list_open_pull_requests(
        &self,
        _owner: &str,
        _repo: &str,
    ) -> Result<Vec<PullRequest>, HostError> {
        let mut s = self.0.borrow_mut();
        s.list_calls += 1;
        Ok(s.open.clone())
    }

    fn create_pull_request(
        &self,
        _owner: &str,
        _repo: &str,
        new: &NewPullRequest,
    ) -> Result<PullRequest, HostError> {
        let mut s = self.0.borrow_mut();
        if let Some(status) = s.fail_create.take() {
            return Err(HostError::Http {
                method: "POST",
                url: "https://api.github.com/repos/acme/sdk/pulls".to_owned(),
                status,
                message: "A pull request already exists".to_owned(),
            });
        }
        s.next_number += 1;
        let created = pr(s.next_number, &new.title, &new.head);
        s.created.push(new.clone());
        s.open.push(created.clone());
        Ok(created)
    }

    fn update_pull_request_body(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        body: &str,
    ) -> Result<PullRequest, HostError> {
        let mut s = self.0.borrow_mut();
        s.updated.push((number, body.to_owned()));
        s.open
            .iter()
            .find(|p| p.number == number)
            .cloned()
            .ok_or_else(|| HostError::Http {
                method: "PATCH",
                url: format!("https://api.github.com/repos/acme/sdk/pulls/{number}"),
                status: 404,
                message: "Not Found".to_owned(),
            })
    }

    fn first_tag(&self, _owner: &str, _repo: &str) -> Result<Option<Tag>, HostError> {
        Ok(self.0.borrow().tags.first().cloned())
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

pub struct Fixture {
    pub remote: TempDir,
    pub work: TempDir,
    pub host: FakeHost,
    pub session: RepositorySession,
}

impl Fixture {
    pub fn workdir(&self) -> &Path {
        self.session
            .repo("fixture")
            .expect("fixture session is bound")
            .workdir()
    }

    pub fn write(&self, path: &str, contents: &str) {
        let full = self.workdir().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, contents).unwrap();
    }

    pub fn url(&self) -> String {
        self.remote.path().to_string_lossy().into_owned()
    }

    /// Push a new branch to the remote from a second clone.
    pub fn push_remote_branch(&self, branch: &str, path: &str, contents: &str) {
        let other = self.work.path().join(format!("other-{branch}"));
        git(
            self.work.path(),
            &["clone", "--quiet", &self.url(), &other.to_string_lossy()],
        );
        git(&other, &["checkout", "--quiet", "-b", branch]);
        let full = other.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, contents).unwrap();
        git(&other, &["add", "--all"]);
        git(
            &other,
            &["-c", "user.name=dev", "-c", "user.email=dev@example.com", "commit", "-m", branch],
        );
        git(&other, &["push", "--quiet", "origin", branch]);
    }

    /// Fast-forward the remote's `main` with a commit from a second clone.
    /// The session's working copy does not see it until it fetches.
    pub fn advance_remote_main(&self, path: &str, contents: &str) {
        self.push_remote_branch("advance", path, contents);
        let other = self.work.path().join("other-advance");
        git(&other, &["push", "--quiet", "origin", "advance:main"]);
    }
}

/// Seed a bare remote and clone it through a session backed by `host`.
pub fn setup(host: FakeHost) -> Fixture {
    let remote = TempDir::new().expect("failed to create remote temp dir");
    git(remote.path(), &["init", "--bare", "--initial-branch=main"]);

    let seed = TempDir::new().expect("failed to create seed temp dir");
    git(seed.path(), &["init", "--quiet", "--initial-branch=main"]);
    for (path, contents) in [
        ("sdk/index.ts", "export const answer = 41;\n"),
        ("sdk/models.ts", "// models\nexport type Pet = { name: string };\n"),
        (".speakeasy/gen.yaml", "management:\n  generationVersion: 1.0.0\n"),
        ("README.md", "# acme sdk\n"),
    ] {
        let full = seed.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, contents).unwrap();
    }
    git(seed.path(), &["add", "--all"]);
    git(
        seed.path(),
        &["-c", "user.name=seed", "-c", "user.email=seed@example.com", "commit", "-m", "seed"],
    );
    let url = remote.path().to_string_lossy().into_owned();
    git(seed.path(), &["push", "--quiet", &url, "main:main"]);

    let work = TempDir::new().expect("failed to create work temp dir");
    let mut session = RepositorySession::new(Box::new(host.clone()), None);
    session
        .clone_repository(&url, &work.path().join("repo"), Some("main"))
        .expect("clone failed");

    Fixture {
        remote,
        work,
        host,
        session,
    }
}

/// Configuration for `acme/sdk` on `main` in `mode`.
pub fn config(mode: &str, branch: &str) -> PipelineConfig {
    let vars = [
        ("GITHUB_REPOSITORY", "acme/sdk"),
        ("GITHUB_REF", "refs/heads/main"),
        ("GITHUB_WORKFLOW", "Generate"),
        ("INPUT_MODE", mode),
        ("INPUT_BRANCH_NAME", branch),
        ("INPUT_SPEAKEASY_VERSION", "1.19.2"),
        ("INPUT_OPENAPI_DOC_LOCATION", "openapi.yaml"),
    ];
    let mut cfg = PipelineConfig::from_lookup(|key| {
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| (*v).to_owned())
    })
    .expect("valid test config");
    cfg.invoked_at = 1_700_000_000;
    cfg
}
