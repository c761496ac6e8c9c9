//! Append-only access to the ledger file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{LEDGER_FILE_NAME, ReleaseRecord, codec};
use crate::error::{RegenError, Result};

/// Owns the ledger file at a fixed path.
#[derive(Clone, Debug)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The ledger at the root of a working copy.
    #[must_use]
    pub fn in_repo(workdir: &Path) -> Self {
        Self::new(workdir.join(LEDGER_FILE_NAME))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record` as a new block, creating the file (owner read/write
    /// only) if it is missing. Existing bytes are never rewritten.
    ///
    /// # Errors
    /// [`RegenError::InvalidLedgerRecord`] before anything is written when
    /// the block would not decode, [`RegenError::Io`] when the file cannot
    /// be opened or written.
    pub fn append(&self, record: &ReleaseRecord) -> Result<()> {
        codec::validate(record)?;
        let block = codec::encode(record);
        let mut file = open_for_append(&self.path).map_err(|source| self.io(source))?;
        file.write_all(block.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|source| self.io(source))?;
        debug!(
            path = %self.path.display(),
            release = %record.release_version,
            artifacts = record.artifacts.len(),
            "appended ledger record"
        );
        Ok(())
    }

    /// Decode the most recent record.
    ///
    /// # Errors
    /// [`RegenError::LedgerNotFound`] if the file is missing, otherwise the
    /// codec's [`RegenError::EmptyLedger`] or
    /// [`RegenError::MalformedLedgerRecord`].
    pub fn read_last(&self) -> Result<ReleaseRecord> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RegenError::LedgerNotFound {
                    path: self.path.clone(),
                });
            }
            Err(source) => return Err(self.io(source)),
        };
        codec::decode(&text)
    }

    fn io(&self, source: io::Error) -> RegenError {
        RegenError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(unix)]
fn open_for_append(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .append(true)
        .create(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_for_append(path: &Path) -> io::Result<fs::File> {
    OpenOptions::new().append(true).create(true).open(path)
}
