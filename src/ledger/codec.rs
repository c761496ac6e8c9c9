//! Ledger text codec.
//!
//! Decoding is two-stage: a strict header grammar for the four mandatory
//! fields, then one independent, optional grammar per ecosystem line. A
//! release line whose URL does not have its registry's shape is treated as
//! absent rather than as an error, so hand-edited ledgers still decode.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{Ecosystem, PublishedArtifact, ReleaseRecord};
use crate::error::{RegenError, Result};

/// Separates ledger blocks. Every encoded block starts with it.
pub const BLOCK_DELIMITER: &str = "\n\n";

const GENERATOR_HOME: &str = "https://github.com/speakeasy-api/speakeasy";

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^## Version (?P<release>[^\]\s]+)\n### Changes\nBased on:\n- OpenAPI Doc (?P<spec_version>\S*) (?P<spec_location>[^\n]*)\n- Speakeasy CLI (?P<generator>\S*)(?: [^\n]*)?$",
    )
    .expect("header pattern is valid")
});

static NPM_LINE: LazyLock<Regex> = LazyLock::new(|| {
    release_line(
        "NPM",
        r"https://www\.npmjs\.com/package/(?P<name>\S+?)/v/[^\s/]+",
    )
});

static PYPI_LINE: LazyLock<Regex> = LazyLock::new(|| {
    release_line("PyPI", r"https://pypi\.org/project/(?P<name>[^\s/]+)/[^\s/]+")
});

static GO_LINE: LazyLock<Regex> = LazyLock::new(|| release_line("Go", r"\S+"));

static GO_RELEASE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/(?P<name>\S+?)/releases/tag/v[^\s/]+$")
        .expect("go release url pattern is valid")
});

static COMPOSER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    release_line(
        "Composer",
        r"https://packagist\.org/packages/(?P<name>[^\s#]+)#v\S+",
    )
});

static MAVEN_LINE: LazyLock<Regex> = LazyLock::new(|| {
    release_line(
        "Maven Central",
        r"https://central\.sonatype\.com/artifact/(?P<group>[^\s/]+)/(?P<artifact>[^\s/]+)/[^\s/]+",
    )
});

/// `- [<label> v<version>] <url> - <path>` with `url_pattern` naming the
/// captures the ecosystem needs.
fn release_line(label: &str, url_pattern: &str) -> Regex {
    let pattern = format!(
        r"(?m)^- \[{} v[^\]\s]+\] (?P<url>{url_pattern}) - (?P<path>[^\n]*)$",
        regex::escape(label)
    );
    Regex::new(&pattern).expect("release line pattern is valid")
}

/// Check that `record` encodes to a block [`decode`] reads back.
///
/// Spec and generator versions may be empty; the release version may not.
///
/// # Errors
/// [`RegenError::InvalidLedgerRecord`] naming the offending field.
pub fn validate(record: &ReleaseRecord) -> Result<()> {
    let invalid = |reason: String| Err(RegenError::InvalidLedgerRecord { reason });
    let release = &record.release_version;
    if release.is_empty() || release.contains(|c: char| c.is_whitespace() || c == ']') {
        return invalid(format!("release version {release:?} must be a single non-empty word"));
    }
    for (field, value) in [
        ("spec version", &record.spec_version),
        ("generator version", &record.generator_version),
    ] {
        if value.contains(char::is_whitespace) {
            return invalid(format!("{field} {value:?} contains whitespace"));
        }
    }
    if record.spec_location.contains('\n') {
        return invalid("spec location spans several lines".to_owned());
    }
    for (ecosystem, artifact) in &record.artifacts {
        if artifact.package_url.contains(char::is_whitespace) || artifact.path.contains('\n') {
            return invalid(format!("{ecosystem} release line would not decode"));
        }
    }
    Ok(())
}

/// Render `record` as a ledger block, delimiter included.
#[must_use]
pub fn encode(record: &ReleaseRecord) -> String {
    let release = &record.release_version;
    let mut out = format!(
        "{BLOCK_DELIMITER}## Version {release}\n### Changes\nBased on:\n- OpenAPI Doc {} {}\n- Speakeasy CLI {} {GENERATOR_HOME}",
        record.spec_version, record.spec_location, record.generator_version,
    );

    let lines: Vec<String> = record
        .artifacts
        .iter()
        .map(|(ecosystem, artifact)| {
            format!(
                "- [{} v{release}] {} - {}",
                ecosystem.label(),
                artifact.package_url,
                artifact.path
            )
        })
        .collect();

    if !lines.is_empty() {
        out.push_str("\n### Releases\n");
        out.push_str(&lines.join("\n"));
    }
    out
}

/// Recover the most recent record from raw ledger text.
///
/// # Errors
/// [`RegenError::EmptyLedger`] for blank text, and
/// [`RegenError::MalformedLedgerRecord`] when the last block has no valid
/// version header.
pub fn decode(text: &str) -> Result<ReleaseRecord> {
    let text = text.replace("\r\n", "\n");
    let block = last_block(&text).ok_or(RegenError::EmptyLedger)?;

    let header = HEADER
        .captures(block)
        .ok_or_else(|| RegenError::MalformedLedgerRecord {
            reason: format!(
                "last block does not start with a version header: {:?}",
                block.lines().next().unwrap_or_default()
            ),
        })?;

    let mut record = ReleaseRecord::new(
        &header["release"],
        &header["spec_version"],
        &header["spec_location"],
        &header["generator"],
    );
    for ecosystem in Ecosystem::ALL {
        if let Some(artifact) = decode_artifact(ecosystem, block) {
            record.artifacts.insert(ecosystem, artifact);
        }
    }
    Ok(record)
}

fn last_block(text: &str) -> Option<&str> {
    text.rsplit(BLOCK_DELIMITER)
        .find(|block| !block.trim().is_empty())
}

fn decode_artifact(ecosystem: Ecosystem, block: &str) -> Option<PublishedArtifact> {
    let pattern: &Regex = match ecosystem {
        Ecosystem::Npm => &NPM_LINE,
        Ecosystem::PyPi => &PYPI_LINE,
        Ecosystem::Go => &GO_LINE,
        Ecosystem::Composer => &COMPOSER_LINE,
        Ecosystem::Maven => &MAVEN_LINE,
    };
    let caps = pattern.captures(block)?;
    let package_url = caps["url"].to_owned();
    let package_name = match ecosystem {
        Ecosystem::Maven => format!("{}.{}", &caps["group"], &caps["artifact"]),
        Ecosystem::Go => GO_RELEASE_URL
            .captures(&package_url)
            .map(|c| c["name"].to_owned())
            .unwrap_or_default(),
        _ => capture(&caps, "name"),
    };
    Some(PublishedArtifact {
        package_name,
        package_url,
        path: capture(&caps, "path"),
    })
}

fn capture(caps: &Captures<'_>, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().to_owned())
        .unwrap_or_default()
}
