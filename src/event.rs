//! Files committed by the push that triggered the workflow.

use std::path::Path;

use regen_git::{ChangeType, GitError, GitOid};
use serde::Deserialize;
use tracing::info;

use crate::error::{RegenError, Result};
use crate::session::RepositorySession;

#[derive(Debug, Deserialize)]
struct PushPayload {
    #[serde(default)]
    before: String,
    #[serde(default)]
    after: String,
}

/// Paths added or modified between the payload's `before` and `after`
/// commits. Deleted paths are skipped; renames report the new path.
///
/// # Errors
/// [`RegenError::Io`] if the payload cannot be read,
/// [`RegenError::InvalidEventPayload`] if it lacks an `after` commit, and
/// [`RegenError::Git`] if a commit id is malformed or unknown.
pub fn committed_files(session: &RepositorySession, payload_path: &Path) -> Result<Vec<String>> {
    let repo = session.repo("committed_files")?;

    let data = std::fs::read_to_string(payload_path).map_err(|source| RegenError::Io {
        path: payload_path.to_owned(),
        source,
    })?;
    let invalid = |reason: String| RegenError::InvalidEventPayload {
        path: payload_path.to_owned(),
        reason,
    };
    let payload: PushPayload = serde_json::from_str(&data).map_err(|e| invalid(e.to_string()))?;
    if payload.after.is_empty() {
        return Err(invalid("no commit hash found in `after`".to_owned()));
    }

    let before = parse_oid(&payload.before)?;
    let after = parse_oid(&payload.after)?;

    let files: Vec<String> = repo
        .diff_trees(before, after)?
        .into_iter()
        .filter(|d| d.change_type != ChangeType::Deleted)
        .map(|d| d.path)
        .collect();

    info!(count = files.len(), "found files in commits");
    Ok(files)
}

fn parse_oid(value: &str) -> Result<GitOid> {
    value
        .parse::<GitOid>()
        .map_err(|e| RegenError::Git(GitError::from(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_tolerates_extra_fields() {
        let payload: PushPayload = serde_json::from_str(
            r#"{"ref": "refs/heads/main", "before": "a", "after": "b", "commits": []}"#,
        )
        .unwrap();
        assert_eq!(payload.before, "a");
        assert_eq!(payload.after, "b");
    }

    #[test]
    fn bad_oid_is_git_error() {
        assert!(matches!(
            parse_oid("not-a-sha"),
            Err(RegenError::Git(GitError::InvalidOid { .. }))
        ));
    }
}
