//! The release ledger (`RELEASES.md`).
//!
//! Each published version is one [`ReleaseRecord`], appended as a text block
//! to the ledger file and never rewritten. The [`codec`] turns records into
//! blocks and recovers the last one; the [`store`] owns the file.
//!
//! # Format invariant
//!
//! Blocks are separated by a blank line (`"\n\n"`) and a block never
//! contains one. Every encoded block starts with the delimiter, so
//! appending to an existing ledger never touches earlier bytes.

pub mod codec;
pub mod store;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub use codec::{decode, encode, validate};
pub use store::LedgerStore;

/// File name of the ledger inside the working copy.
pub const LEDGER_FILE_NAME: &str = "RELEASES.md";

/// A target packaging system.
///
/// Declaration order is the order release lines appear in a ledger block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
    PyPi,
    Go,
    Composer,
    Maven,
}

impl Ecosystem {
    /// All ecosystems in ledger order.
    pub const ALL: [Self; 5] = [Self::Npm, Self::PyPi, Self::Go, Self::Composer, Self::Maven];

    /// The bracketed registry label used in release lines.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Npm => "NPM",
            Self::PyPi => "PyPI",
            Self::Go => "Go",
            Self::Composer => "Composer",
            Self::Maven => "Maven Central",
        }
    }

    /// Target language name as used in pipeline inputs (`INPUT_PUBLISH_<LANG>`).
    #[must_use]
    pub const fn language(self) -> &'static str {
        match self {
            Self::Npm => "typescript",
            Self::PyPi => "python",
            Self::Go => "go",
            Self::Composer => "php",
            Self::Maven => "java",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Ecosystem {
    type Err = String;

    /// Accepts the registry (`npm`, `pypi`, `go`, `composer`, `maven`) or
    /// the target language (`typescript`, `python`, `php`, `java`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "npm" | "typescript" => Ok(Self::Npm),
            "pypi" | "python" => Ok(Self::PyPi),
            "go" => Ok(Self::Go),
            "composer" | "php" => Ok(Self::Composer),
            "maven" | "java" => Ok(Self::Maven),
            other => Err(format!("unknown ecosystem `{other}`")),
        }
    }
}

/// One package published to one registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PublishedArtifact {
    /// Registry package name. For Maven this is `<group>.<artifact>`; for Go
    /// the `owner/repo` path of the release, or empty.
    pub package_name: String,
    /// Registry page for this exact version.
    pub package_url: String,
    /// Directory of the SDK inside the repository.
    pub path: String,
}

impl PublishedArtifact {
    /// An artifact whose URL is the registry's canonical page for
    /// `package_name` at `version`.
    ///
    /// Returns `None` for a Maven package name without a `.` separating
    /// group and artifact.
    #[must_use]
    pub fn canonical(
        ecosystem: Ecosystem,
        package_name: &str,
        version: &str,
        path: &str,
    ) -> Option<Self> {
        let package_url = match ecosystem {
            Ecosystem::Npm => format!("https://www.npmjs.com/package/{package_name}/v/{version}"),
            Ecosystem::PyPi => format!("https://pypi.org/project/{package_name}/{version}"),
            Ecosystem::Go => format!("https://github.com/{package_name}/releases/tag/v{version}"),
            Ecosystem::Composer => {
                format!("https://packagist.org/packages/{package_name}#v{version}")
            }
            Ecosystem::Maven => {
                let (group, artifact) = package_name.rsplit_once('.')?;
                format!("https://central.sonatype.com/artifact/{group}/{artifact}/{version}")
            }
        };
        Some(Self {
            package_name: package_name.to_owned(),
            package_url,
            path: path.to_owned(),
        })
    }
}

/// One ledger entry: what was released, from which OpenAPI document, by which generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReleaseRecord {
    pub release_version: String,
    pub spec_version: String,
    pub spec_location: String,
    pub generator_version: String,
    /// Published artifacts keyed by ecosystem. Absent means not published.
    pub artifacts: BTreeMap<Ecosystem, PublishedArtifact>,
}

impl ReleaseRecord {
    #[must_use]
    pub fn new(
        release_version: impl Into<String>,
        spec_version: impl Into<String>,
        spec_location: impl Into<String>,
        generator_version: impl Into<String>,
    ) -> Self {
        Self {
            release_version: release_version.into(),
            spec_version: spec_version.into(),
            spec_location: spec_location.into(),
            generator_version: generator_version.into(),
            artifacts: BTreeMap::new(),
        }
    }

    /// Builder-style insert of a published artifact.
    #[must_use]
    pub fn with_artifact(mut self, ecosystem: Ecosystem, artifact: PublishedArtifact) -> Self {
        self.artifacts.insert(ecosystem, artifact);
        self
    }

    #[must_use]
    pub fn artifact(&self, ecosystem: Ecosystem) -> Option<&PublishedArtifact> {
        self.artifacts.get(&ecosystem)
    }
}

impl fmt::Display for ReleaseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(self))
    }
}
