//! Pipeline configuration.
//!
//! [`PipelineConfig`] is built once per run from the CI environment
//! (`GITHUB_*` and `INPUT_*` variables), optionally layered over a TOML file
//! for local runs, and then passed by reference. Components take the fields
//! they need; nothing below this module reads the environment.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use regen_git::Credential;
use serde::Deserialize;

use crate::ledger::Ecosystem;

/// Username paired with the access token for HTTPS git operations.
pub const GIT_USERNAME: &str = "gen";

/// Prefix of the deterministic pull request title.
pub const PR_TITLE_PREFIX: &str = "chore: speakeasy sdk regeneration - ";

const DEFAULT_SERVER_URL: &str = "https://github.com";
const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_STATE_FILE: &str = "gen.yaml";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How a regeneration lands on the target branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Commit on a temporary branch, merge it into the target, delete it.
    #[default]
    Direct,
    /// Commit on a long-lived branch and keep one pull request open.
    Pr,
}

impl Mode {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "direct" => Ok(Self::Direct),
            "pr" => Ok(Self::Pr),
            other => Err(ConfigError::invalid("INPUT_MODE", other, "direct, pr")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Pr => write!(f, "pr"),
        }
    }
}

/// Which step of the pipeline this invocation runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Run a full regeneration cycle.
    #[default]
    Generate,
    /// Merge a previously pushed branch into the target (direct mode).
    Finalize,
    /// Report the last ledger record for release tooling.
    Release,
}

impl Action {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "generate" => Ok(Self::Generate),
            "finalize" => Ok(Self::Finalize),
            "release" => Ok(Self::Release),
            other => Err(ConfigError::invalid(
                "INPUT_ACTION",
                other,
                "generate, finalize, release",
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Detection policy
// ---------------------------------------------------------------------------

/// Tuning for the change-significance detector.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectionConfig {
    /// File names of pipeline state files. Changes to them never count.
    #[serde(default = "default_state_files")]
    pub state_files: Vec<String>,

    /// Substrings marking volatile generated lines (timestamps, hashes).
    /// A diff line containing any of them is dropped before comparison.
    #[serde(default)]
    pub noise_markers: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            state_files: default_state_files(),
            noise_markers: Vec::new(),
        }
    }
}

fn default_state_files() -> Vec<String> {
    vec![DEFAULT_STATE_FILE.to_owned()]
}

// ---------------------------------------------------------------------------
// File overlay
// ---------------------------------------------------------------------------

/// Optional `regen.toml` for local runs. Environment values win over it.
///
/// ```toml
/// repository = "acme/sdk-typescript"
/// mode = "pr"
/// branch_name = "regen"
/// sdk_dir = "typescript"
///
/// [detection]
/// noise_markers = ["Generated at"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub server_url: Option<String>,
    pub api_url: Option<String>,
    /// `owner/repo`.
    pub repository: Option<String>,
    pub git_ref: Option<String>,
    pub workflow_name: Option<String>,
    pub base_dir: Option<PathBuf>,
    pub sdk_dir: Option<String>,
    pub mode: Option<Mode>,
    pub branch_name: Option<String>,
    pub previous_generator_version: Option<String>,
    pub generator_version: Option<String>,
    pub openapi_doc_location: Option<String>,
    #[serde(default)]
    pub detection: DetectionConfig,
}

impl FileConfig {
    /// Load the overlay. A missing file yields all defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Everything one run needs to know about its environment.
#[derive(Clone)]
pub struct PipelineConfig {
    pub server_url: String,
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    /// Full ref the workflow runs on, e.g. `refs/heads/main`.
    pub git_ref: String,
    pub workflow_name: String,
    /// Path of the triggering event's JSON payload.
    pub event_path: Option<PathBuf>,
    /// The working copy lives at `<base_dir>/repo`.
    pub base_dir: PathBuf,
    /// Subtree of the working copy holding generated output.
    pub sdk_dir: String,
    access_token: String,
    pub mode: Mode,
    pub action: Action,
    /// Branch requested by the operator; empty means "discover or generate".
    pub branch_name: String,
    pub previous_generator_version: String,
    pub generator_version: String,
    pub openapi_doc_location: String,
    pub languages: Vec<String>,
    pub debug: bool,
    pub force: bool,
    pub create_release: bool,
    /// Ecosystems with an `INPUT_PUBLISH_<LANG>` flag set.
    pub publish: BTreeSet<Ecosystem>,
    pub detection: DetectionConfig,
    /// Unix seconds, captured once when the config is built.
    pub invoked_at: u64,
}

impl PipelineConfig {
    /// Build from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError` for malformed values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from the process environment layered over a TOML overlay.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file is unreadable or a value is malformed.
    pub fn from_env_with_file(path: &Path) -> Result<Self, ConfigError> {
        let file = FileConfig::load(path)?;
        Self::from_parts(|key| std::env::var(key).ok(), file)
    }

    /// Build from an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns `ConfigError` for malformed values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::from_parts(lookup, FileConfig::default())
    }

    /// Build from a key lookup over file defaults. Non-empty lookup values
    /// take precedence.
    ///
    /// # Errors
    /// Returns `ConfigError` for malformed values.
    pub fn from_parts(
        lookup: impl Fn(&str) -> Option<String>,
        file: FileConfig,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| get(key).is_some_and(|v| parse_bool(&v));

        let repository = get("GITHUB_REPOSITORY").or(file.repository).unwrap_or_default();
        let (owner, repo) = split_repository(&repository)?;
        let owner = get("GITHUB_REPOSITORY_OWNER").unwrap_or(owner);

        let base_dir = match get("SPEAKEASY_ENVIRONMENT").as_deref() {
            Some("local") => PathBuf::from("./"),
            Some(_) => PathBuf::from("/"),
            None => file.base_dir.unwrap_or_else(|| PathBuf::from("/")),
        };

        let mode = match get("INPUT_MODE") {
            Some(v) => Mode::parse(&v)?,
            None => file.mode.unwrap_or_default(),
        };
        let action = get("INPUT_ACTION").map_or(Ok(Action::default()), |v| Action::parse(&v))?;

        let publish = Ecosystem::ALL
            .into_iter()
            .filter(|e| *e != Ecosystem::Go)
            .filter(|e| flag(&format!("INPUT_PUBLISH_{}", e.language().to_ascii_uppercase())))
            .collect();

        let invoked_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());

        Ok(Self {
            server_url: get("GITHUB_SERVER_URL")
                .or(file.server_url)
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_owned()),
            api_url: get("GITHUB_API_URL")
                .or(file.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_owned()),
            owner,
            repo,
            git_ref: get("GITHUB_REF").or(file.git_ref).unwrap_or_default(),
            workflow_name: get("GITHUB_WORKFLOW")
                .or(file.workflow_name)
                .unwrap_or_default(),
            event_path: get("GITHUB_EVENT_PATH").map(PathBuf::from),
            base_dir,
            sdk_dir: file.sdk_dir.unwrap_or_else(|| ".".to_owned()),
            access_token: get("INPUT_GITHUB_ACCESS_TOKEN").unwrap_or_default(),
            mode,
            action,
            branch_name: get("INPUT_BRANCH_NAME")
                .or(file.branch_name)
                .unwrap_or_default(),
            previous_generator_version: get("INPUT_PREVIOUS_GEN_VERSION")
                .or(file.previous_generator_version)
                .unwrap_or_default(),
            generator_version: get("INPUT_SPEAKEASY_VERSION")
                .or(file.generator_version)
                .unwrap_or_default(),
            openapi_doc_location: get("INPUT_OPENAPI_DOC_LOCATION")
                .or(file.openapi_doc_location)
                .unwrap_or_default(),
            languages: get("INPUT_LANGUAGES")
                .map(|v| parse_languages(&v))
                .unwrap_or_default(),
            debug: flag("INPUT_DEBUG") || get("RUNNER_DEBUG").as_deref() == Some("1"),
            force: flag("INPUT_FORCE"),
            create_release: flag("INPUT_CREATE_RELEASE"),
            publish,
            detection: file.detection,
            invoked_at,
        })
    }

    /// The access token. Never logged.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Replace the access token (e.g. from a CLI flag).
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
    }

    /// Git credential for the access token, if one is configured.
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        (!self.access_token.is_empty())
            .then(|| Credential::new(GIT_USERNAME, self.access_token.clone()))
    }

    /// `<server_url>/<owner>/<repo>`.
    ///
    /// # Errors
    /// Returns `ConfigError` when no repository is configured.
    pub fn clone_url(&self) -> Result<String, ConfigError> {
        if self.owner.is_empty() || self.repo.is_empty() {
            return Err(ConfigError::missing("GITHUB_REPOSITORY"));
        }
        Ok(format!(
            "{}/{}/{}",
            self.server_url.trim_end_matches('/'),
            self.owner,
            self.repo
        ))
    }

    /// Where the working copy is cloned.
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.base_dir.join("repo")
    }

    /// Short name of the target branch (`refs/heads/main` → `main`).
    /// Defaults to `main` when no ref is configured.
    #[must_use]
    pub fn target_branch(&self) -> &str {
        let short = self
            .git_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.git_ref);
        if short.is_empty() { "main" } else { short }
    }

    /// The title every regeneration pull request of this workflow carries.
    #[must_use]
    pub fn pr_title(&self) -> String {
        format!("{PR_TITLE_PREFIX}{}", self.workflow_name)
    }

    /// Whether artifacts for `ecosystem` are published by this pipeline.
    /// Go modules publish through a git release.
    #[must_use]
    pub fn is_published(&self, ecosystem: Ecosystem) -> bool {
        match ecosystem {
            Ecosystem::Go => self.create_release,
            other => self.publish.contains(&other),
        }
    }

    /// Whether `ecosystem` is among the configured target languages. An
    /// empty list targets every language.
    #[must_use]
    pub fn targets(&self, ecosystem: Ecosystem) -> bool {
        self.languages.is_empty()
            || self
                .languages
                .iter()
                .any(|l| l.parse::<Ecosystem>().is_ok_and(|e| e == ecosystem))
    }

    /// Whether a git release (tag) should be created for this version.
    #[must_use]
    pub fn create_git_release(&self) -> bool {
        self.create_release || self.is_published(Ecosystem::Composer)
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.access_token.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("PipelineConfig")
            .field("server_url", &self.server_url)
            .field("api_url", &self.api_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("git_ref", &self.git_ref)
            .field("workflow_name", &self.workflow_name)
            .field("event_path", &self.event_path)
            .field("base_dir", &self.base_dir)
            .field("sdk_dir", &self.sdk_dir)
            .field("access_token", &token)
            .field("mode", &self.mode)
            .field("action", &self.action)
            .field("branch_name", &self.branch_name)
            .field("previous_generator_version", &self.previous_generator_version)
            .field("generator_version", &self.generator_version)
            .field("openapi_doc_location", &self.openapi_doc_location)
            .field("languages", &self.languages)
            .field("debug", &self.debug)
            .field("force", &self.force)
            .field("create_release", &self.create_release)
            .field("publish", &self.publish)
            .field("detection", &self.detection)
            .field("invoked_at", &self.invoked_at)
            .finish()
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

fn split_repository(value: &str) -> Result<(String, String), ConfigError> {
    if value.is_empty() {
        return Ok((String::new(), String::new()));
    }
    match value.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_owned(), repo.to_owned()))
        }
        _ => Err(ConfigError::invalid(
            "GITHUB_REPOSITORY",
            value,
            "<owner>/<repo>",
        )),
    }
}

/// Accepts `typescript,go`, one per line, or a YAML-style `- go` list.
fn parse_languages(value: &str) -> Vec<String> {
    value
        .split([',', '\n'])
        .map(|l| l.trim().trim_start_matches('-').trim().to_owned())
        .filter(|l| !l.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error building the pipeline configuration.
#[derive(Debug)]
pub struct ConfigError {
    /// The file that was being loaded (if any).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl ConfigError {
    fn invalid(key: &str, value: &str, expected: &str) -> Self {
        Self {
            path: None,
            message: format!("invalid {key} `{value}`; expected one of: {expected}"),
        }
    }

    fn missing(key: &str) -> Self {
        Self {
            path: None,
            message: format!("{key} is not set"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
