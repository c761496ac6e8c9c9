//! sdk-regen library crate.
//!
//! The reconciliation layer of an SDK regeneration pipeline: decide whether
//! regenerated output changed meaningfully, converge it onto one branch and
//! pull request (or merge it directly), and record each release in the
//! append-only `RELEASES.md` ledger.
//!
//! The `sdk-regen` binary wires these modules to the CI environment; the
//! library is what integration tests exercise.

pub mod changelog;
pub mod config;
pub mod cycle;
pub mod detect;
pub mod error;
pub mod event;
pub mod host;
pub mod ledger;
pub mod publish;
pub mod reconcile;
pub mod session;
pub mod telemetry;

pub use error::{RegenError, Result};
