//! Changelog lookup between two generator versions.
//!
//! The reconciler embeds the changelog in the pull request body. Where the
//! text comes from is the caller's business: a closure, an external command,
//! or nothing at all.

use std::process::Command;

use tracing::debug;

use crate::error::{RegenError, Result};

/// Produces the changelog text for `(current, previous)` generator versions.
/// An empty string means "no changelog".
pub trait ChangelogSource {
    /// # Errors
    /// [`RegenError::Changelog`] when the lookup fails.
    fn changelog(&self, current: &str, previous: &str) -> Result<String>;
}

/// Always empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoChangelog;

impl ChangelogSource for NoChangelog {
    fn changelog(&self, _current: &str, _previous: &str) -> Result<String> {
        Ok(String::new())
    }
}

impl<F> ChangelogSource for F
where
    F: Fn(&str, &str) -> Result<String>,
{
    fn changelog(&self, current: &str, previous: &str) -> Result<String> {
        self(current, previous)
    }
}

/// Runs an external command and uses its stdout.
///
/// `{current}` and `{previous}` in any argument are replaced with the
/// versions. Without a previous version there is nothing to compare, so
/// the command is skipped.
#[derive(Clone, Debug)]
pub struct CommandChangelog {
    argv: Vec<String>,
}

impl CommandChangelog {
    /// `argv[0]` is the program.
    #[must_use]
    pub const fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl ChangelogSource for CommandChangelog {
    fn changelog(&self, current: &str, previous: &str) -> Result<String> {
        if previous.is_empty() {
            return Ok(String::new());
        }
        let Some((program, args)) = self.argv.split_first() else {
            return Ok(String::new());
        };
        let args: Vec<String> = args
            .iter()
            .map(|a| a.replace("{current}", current).replace("{previous}", previous))
            .collect();
        debug!(program, ?args, "running changelog command");

        let output = Command::new(program)
            .args(&args)
            .output()
            .map_err(|e| RegenError::Changelog(format!("could not run {program}: {e}")))?;
        if !output.status.success() {
            return Err(RegenError::Changelog(format!(
                "{program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
