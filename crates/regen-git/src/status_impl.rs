//! Working-tree status via `git status --porcelain=v1 -z`.

use crate::cmd::command_failed;
use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::*;

const STATUS_ARGS: &[&str] = &["status", "--porcelain=v1", "-z", "--untracked-files=all"];

pub fn status(repo: &GixRepo) -> Result<Vec<StatusEntry>, GitError> {
    let stdout = repo.git_ok(STATUS_ARGS)?;
    parse_porcelain(&stdout)
}

pub fn has_staged_changes(repo: &GixRepo) -> Result<bool, GitError> {
    let args = ["diff", "--cached", "--quiet"];
    let out = repo.git(&args)?;
    match out.code {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        _ => Err(command_failed(&args, &out)),
    }
}

/// Parse NUL-separated porcelain v1 output.
///
/// Each record is `XY <path>`; renames and copies are followed by one more
/// NUL-terminated field holding the source path.
pub(crate) fn parse_porcelain(raw: &str) -> Result<Vec<StatusEntry>, GitError> {
    let mut entries = Vec::new();
    let mut fields = raw.split('\0').filter(|f| !f.is_empty());

    while let Some(record) = fields.next() {
        let mut chars = record.chars();
        let (Some(x), Some(y), Some(' ')) = (chars.next(), chars.next(), chars.next()) else {
            return Err(GitError::BackendError {
                message: format!("unparseable status record {record:?}"),
            });
        };
        if x == '!' {
            continue;
        }
        let path = chars.as_str().to_owned();
        let (index, worktree) = classify(x, y);

        let orig_path = if matches!(x, 'R' | 'C') || matches!(y, 'R' | 'C') {
            fields.next().map(str::to_owned)
        } else {
            None
        };

        entries.push(StatusEntry {
            path,
            orig_path,
            index,
            worktree,
        });
    }
    Ok(entries)
}

fn classify(x: char, y: char) -> (FileStatus, FileStatus) {
    match (x, y) {
        ('?', '?') => (FileStatus::Untracked, FileStatus::Untracked),
        ('U', 'U') => (FileStatus::UpdatedButUnmerged, FileStatus::UpdatedButUnmerged),
        ('D', 'D') | ('A', 'A') | ('A' | 'D', 'U') | ('U', 'A' | 'D') => {
            (FileStatus::Conflicted, FileStatus::Conflicted)
        }
        _ => (column(x), column(y)),
    }
}

const fn column(c: char) -> FileStatus {
    match c {
        'M' => FileStatus::Modified,
        'T' => FileStatus::TypeChanged,
        'A' => FileStatus::Added,
        'D' => FileStatus::Deleted,
        'R' => FileStatus::Renamed,
        'C' => FileStatus::Copied,
        _ => FileStatus::Unmodified,
    }
}
