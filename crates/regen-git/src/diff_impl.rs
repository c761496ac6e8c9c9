//! Textual worktree diff and tree-to-tree name-status diff.

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::*;

pub fn diff_worktree(repo: &GixRepo, pathspec: &str) -> Result<String, GitError> {
    let mut args = vec!["diff", "--no-color", "--no-ext-diff", "HEAD"];
    let pathspec = pathspec.trim_matches('/');
    if !pathspec.is_empty() && pathspec != "." {
        args.extend(["--", pathspec]);
    }
    repo.git_ok(&args)
}

pub fn diff_trees(repo: &GixRepo, old: GitOid, new: GitOid) -> Result<Vec<DiffEntry>, GitError> {
    let old = old.to_string();
    let new = new.to_string();
    let stdout = repo.git_ok(&[
        "diff-tree",
        "-r",
        "-z",
        "-M",
        "--no-commit-id",
        "--name-status",
        &old,
        &new,
    ])?;
    parse_name_status(&stdout)
}

/// Parse `--name-status -z` output: a status field (`A`, `M`, `R100`, ...)
/// followed by one path, or two for renames and copies.
fn parse_name_status(raw: &str) -> Result<Vec<DiffEntry>, GitError> {
    let mut entries = Vec::new();
    let mut fields = raw.split('\0').filter(|f| !f.is_empty());

    while let Some(status) = fields.next() {
        let mut next_path = || {
            fields.next().map(str::to_owned).ok_or_else(|| GitError::BackendError {
                message: format!("diff-tree record {status:?} is missing its path"),
            })
        };
        let (path, change_type) = match status.chars().next() {
            Some('A') => (next_path()?, ChangeType::Added),
            Some('D') => (next_path()?, ChangeType::Deleted),
            Some('M' | 'T') => (next_path()?, ChangeType::Modified),
            Some('R') => {
                let from = next_path()?;
                (next_path()?, ChangeType::Renamed { from })
            }
            Some('C') => {
                let from = next_path()?;
                (next_path()?, ChangeType::Copied { from })
            }
            _ => {
                return Err(GitError::BackendError {
                    message: format!("unknown diff-tree status {status:?}"),
                });
            }
        };
        entries.push(DiffEntry { path, change_type });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_change_kind() {
        let raw = "A\0new.txt\0M\0lib.rs\0D\0old.txt\0R087\0a.rs\0b.rs\0";
        let entries = parse_name_status(raw).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].change_type, ChangeType::Added);
        assert_eq!(entries[2].path, "old.txt");
        assert_eq!(entries[3].path, "b.rs");
        assert_eq!(
            entries[3].change_type,
            ChangeType::Renamed { from: "a.rs".to_owned() }
        );
    }

    #[test]
    fn truncated_record_is_an_error() {
        assert!(parse_name_status("R100\0a.rs\0").is_err());
    }
}
