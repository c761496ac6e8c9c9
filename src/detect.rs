//! Change significance detection.
//!
//! Regeneration is not byte-for-byte deterministic: whitespace, comments and
//! embedded timestamps drift between runs. The detector decides whether a
//! subtree changed in a way worth shipping.
//!
//! 1. Structural changes (added, deleted, untracked, renamed, copied, or
//!    conflicted paths) are significant without looking at content.
//! 2. Content-only modifications are diffed and each hunk is normalized.
//!    A hunk counts when its removed and added lines still differ after
//!    normalization. Comment lines are recognized by file extension. The
//!    diff counts when any hunk does, or when a file's binary content or
//!    mode changed.
//!
//! Pipeline state files (`gen.yaml` by default) never count.

use std::path::Path;

use regen_git::{FileStatus, GitRepo, StatusEntry};
use tracing::{debug, instrument};

use crate::config::DetectionConfig;
use crate::error::{RegenError, Result};
use crate::session::RepositorySession;

/// Extended-header lines that make a file section significant on their own.
/// They change the file without producing a textual hunk.
const SIGNIFICANT_HEADERS: &[&str] = &[
    "Binary files ",
    "GIT binary patch",
    "old mode ",
    "new mode ",
    "new file mode ",
    "deleted file mode ",
];

/// How a source file marks a comment-only line, picked by extension.
///
/// Files with an unknown extension have no comment lines: every content
/// line counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CommentSyntax {
    /// `//`, `/* ... */` and block continuation lines (`* ...`).
    CStyle,
    /// C-style plus `#` line comments (PHP).
    CStyleAndHash,
    /// `#` line comments.
    Hash,
    /// `#` line comments and docstring delimiters.
    Python,
    /// `<!-- ... -->`.
    Markup,
    Plain,
}

impl CommentSyntax {
    fn for_path(path: &str) -> Self {
        let extension = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" | "go" | "java" | "kt" | "kts" | "cs"
            | "swift" | "scala" | "dart" | "c" | "h" | "cc" | "cpp" | "hpp" | "rs" => Self::CStyle,
            "php" => Self::CStyleAndHash,
            "rb" | "sh" | "bash" | "yaml" | "yml" | "toml" => Self::Hash,
            "py" | "pyi" => Self::Python,
            "md" | "markdown" | "html" | "xml" | "vue" | "svg" => Self::Markup,
            _ => Self::Plain,
        }
    }

    /// `trimmed` is already stripped of surrounding whitespace.
    fn is_comment(self, trimmed: &str) -> bool {
        let c_style = || {
            ["//", "/*", "*/"].iter().any(|p| trimmed.starts_with(p))
                || trimmed == "*"
                || trimmed.starts_with("* ")
        };
        // `#[...]` is an attribute in Rust and PHP, never a comment.
        let hash = || trimmed.starts_with('#') && !trimmed.starts_with("#[");
        match self {
            Self::CStyle => c_style(),
            Self::CStyleAndHash => c_style() || hash(),
            Self::Hash => hash(),
            Self::Python => hash() || trimmed.starts_with("\"\"\""),
            Self::Markup => trimmed.starts_with("<!--"),
            Self::Plain => false,
        }
    }
}

/// What the detector treats as noise.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignificancePolicy {
    state_files: Vec<String>,
    noise_markers: Vec<String>,
}

impl SignificancePolicy {
    #[must_use]
    pub fn new(state_files: Vec<String>, noise_markers: Vec<String>) -> Self {
        Self {
            state_files,
            noise_markers,
        }
    }

    fn is_state_file(&self, path: &str) -> bool {
        Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.state_files.iter().any(|s| s == name))
    }

    /// Whitespace-free form of `line`, or `None` if it is noise.
    fn normalize(&self, line: &str, comments: CommentSyntax) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || comments.is_comment(trimmed) {
            return None;
        }
        if self.noise_markers.iter().any(|m| line.contains(m.as_str())) {
            return None;
        }
        Some(trimmed.split_whitespace().collect())
    }
}

impl From<&DetectionConfig> for SignificancePolicy {
    fn from(config: &DetectionConfig) -> Self {
        Self::new(config.state_files.clone(), config.noise_markers.clone())
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Decides significance for one working copy.
pub struct Detector<'a> {
    repo: &'a dyn GitRepo,
    policy: &'a SignificancePolicy,
}

impl<'a> Detector<'a> {
    #[must_use]
    pub fn new(repo: &'a dyn GitRepo, policy: &'a SignificancePolicy) -> Self {
        Self { repo, policy }
    }

    /// Did `subtree` (repository-relative; empty or `.` for the whole
    /// working copy) change significantly relative to `HEAD`?
    ///
    /// # Errors
    /// [`RegenError::VcsStatus`] if status or diff cannot be computed.
    #[instrument(skip(self))]
    pub fn is_significant(&self, subtree: &str) -> Result<bool> {
        let subtree = normalize_subtree(subtree);
        let status = self
            .repo
            .status()
            .map_err(|source| RegenError::VcsStatus { source })?;

        let relevant: Vec<&StatusEntry> = status
            .iter()
            .filter(|e| touches_subtree(e, subtree))
            .filter(|e| !self.policy.is_state_file(&e.path))
            .collect();

        if relevant.is_empty() {
            debug!("no changes");
            return Ok(false);
        }

        if let Some(entry) = relevant.iter().find(|e| is_structural(e)) {
            debug!(path = %entry.path, "structural change");
            return Ok(true);
        }

        let diff = self
            .repo
            .diff_worktree(subtree)
            .map_err(|source| RegenError::VcsStatus { source })?;
        let significant = diff_is_significant(&diff, self.policy);
        debug!(
            modified = relevant.len(),
            significant, "content change classified"
        );
        Ok(significant)
    }
}

/// [`Detector::is_significant`] against the session's working copy.
///
/// # Errors
/// [`RegenError::RepositoryNotCloned`] before clone, otherwise as
/// [`Detector::is_significant`].
pub fn is_significant(
    session: &RepositorySession,
    policy: &SignificancePolicy,
    subtree: &str,
) -> Result<bool> {
    let repo = session.repo("is_significant")?;
    Detector::new(repo, policy).is_significant(subtree)
}

fn normalize_subtree(subtree: &str) -> &str {
    let s = subtree.trim_start_matches("./").trim_end_matches('/');
    if s == "." { "" } else { s }
}

fn touches_subtree(entry: &StatusEntry, subtree: &str) -> bool {
    if subtree.is_empty() {
        return true;
    }
    let under = |p: &str| Path::new(p).starts_with(subtree);
    under(&entry.path) || entry.orig_path.as_deref().is_some_and(under)
}

fn is_structural(entry: &StatusEntry) -> bool {
    entry.columns().iter().any(|s| {
        matches!(
            s,
            FileStatus::Added
                | FileStatus::Deleted
                | FileStatus::Untracked
                | FileStatus::Renamed
                | FileStatus::Copied
                | FileStatus::Conflicted
        )
    })
}

// ---------------------------------------------------------------------------
// Diff heuristic
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Hunk {
    removed: Vec<String>,
    added: Vec<String>,
}

/// Whether a unified diff contains at least one significant hunk of a
/// non-state file.
///
/// Binary and mode changes carry no hunks; their extended header lines
/// count as significant.
#[must_use]
pub fn diff_is_significant(diff: &str, policy: &SignificancePolicy) -> bool {
    let mut skip_file = false;
    let mut in_header = false;
    let mut comments = CommentSyntax::Plain;
    let mut hunk: Option<Hunk> = None;

    for line in diff.lines() {
        if let Some(paths) = line.strip_prefix("diff --git ") {
            if hunk.take().is_some_and(|h| h.removed != h.added) {
                return true;
            }
            let target = diff_target(paths).unwrap_or_default();
            skip_file = policy.is_state_file(target);
            comments = CommentSyntax::for_path(target);
            in_header = true;
            continue;
        }
        if line.starts_with("@@") {
            if hunk.take().is_some_and(|h| h.removed != h.added) {
                return true;
            }
            in_header = false;
            if !skip_file {
                hunk = Some(Hunk::default());
            }
            continue;
        }
        if in_header {
            if !skip_file && SIGNIFICANT_HEADERS.iter().any(|h| line.starts_with(h)) {
                return true;
            }
            continue;
        }
        let Some(current) = hunk.as_mut() else {
            continue;
        };
        if let Some(removed) = line.strip_prefix('-') {
            current.removed.extend(policy.normalize(removed, comments));
        } else if let Some(added) = line.strip_prefix('+') {
            current.added.extend(policy.normalize(added, comments));
        }
    }

    hunk.is_some_and(|h| h.removed != h.added)
}

/// `a/x b/y` → `y`.
fn diff_target(paths: &str) -> Option<&str> {
    paths.rsplit_once(" b/").map(|(_, b)| b)
}
