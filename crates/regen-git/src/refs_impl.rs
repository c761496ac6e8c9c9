//! gix-backed ref reads.

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::*;

/// Convert a `gix::ObjectId` (or `&gix::oid`) to a `GitOid`.
fn from_gix_oid(oid: &gix::oid) -> Result<GitOid, GitError> {
    let bytes: [u8; 20] = oid
        .as_bytes()
        .try_into()
        .map_err(|_| GitError::InvalidOid {
            value: oid.to_string(),
            reason: "only SHA-1 object ids are supported".to_owned(),
        })?;
    Ok(GitOid::from_bytes(bytes))
}

pub fn head_oid(repo: &GixRepo) -> Result<GitOid, GitError> {
    let id = repo.repo.head_id().map_err(|e| GitError::NotFound {
        message: format!("HEAD does not point to a commit: {e}"),
    })?;
    from_gix_oid(id.as_ref())
}

pub fn current_branch(repo: &GixRepo) -> Result<Option<String>, GitError> {
    let name = repo.repo.head_name().map_err(|e| GitError::BackendError {
        message: e.to_string(),
    })?;
    Ok(name.map(|full| full.shorten().to_string()))
}

pub fn read_ref(repo: &GixRepo, name: &RefName) -> Result<Option<GitOid>, GitError> {
    match repo.repo.try_find_reference(name.as_str()) {
        Ok(Some(mut r)) => {
            let id = r
                .peel_to_id_in_place()
                .map_err(|e| GitError::BackendError {
                    message: e.to_string(),
                })?;
            from_gix_oid(id.as_ref()).map(Some)
        }
        Ok(None) => Ok(None),
        Err(e) => Err(GitError::BackendError {
            message: e.to_string(),
        }),
    }
}
