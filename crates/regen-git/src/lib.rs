//! Git abstraction layer for sdk-regen.
//!
//! This crate defines the [`GitRepo`] trait, the single interface through
//! which the reconciliation layer touches a working copy. Nothing outside
//! this crate imports gix or spawns `git` directly; callers depend on
//! `regen-git` and program against the trait.
//!
//! # Crate layout
//!
//! - [`repo`]: the [`GitRepo`] trait definition.
//! - [`types`]: value types used in trait signatures ([`GitOid`], [`RefName`],
//!   [`StatusEntry`], [`DiffEntry`], [`Signature`], [`Credential`]).
//! - [`error`]: the [`GitError`] enum returned by all trait methods.

pub mod error;
pub mod repo;
pub mod types;

// backend modules
mod cmd;
mod gix_repo;
mod refs_impl;
mod status_impl;
mod diff_impl;
mod checkout_impl;
mod commit_impl;
mod remote_impl;
mod push_impl;
mod merge_impl;

pub use gix_repo::GixRepo;

pub use error::GitError;
pub use repo::GitRepo;
pub use types::{
    ChangeType, Credential, DiffEntry, FileStatus, GitOid, OidParseError, RefName, Signature,
    StatusEntry,
};
