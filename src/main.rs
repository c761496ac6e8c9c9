use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use regen::changelog::{ChangelogSource, CommandChangelog, NoChangelog};
use regen::config::{Action, PipelineConfig};
use regen::cycle::{self, CommandGenerator, CycleOutcome, ReleaseSummary};
use regen::detect::{self, SignificancePolicy};
use regen::host::{self, GitHubClient};
use regen::ledger::{Ecosystem, LedgerStore, PublishedArtifact, ReleaseRecord};
use regen::session::RepositorySession;
use regen::{event, telemetry};

const GENERATOR_OWNER: &str = "speakeasy-api";
const GENERATOR_REPO: &str = "speakeasy";

/// SDK regeneration reconciler
///
/// Decides whether regenerated SDK output changed meaningfully, lands it on
/// one branch and pull request (or merges it directly), and records each
/// release in RELEASES.md.
///
/// Configuration comes from the GitHub Actions environment (GITHUB_* and
/// INPUT_* variables), optionally layered over a TOML file.
#[derive(Parser)]
#[command(name = "sdk-regen")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// TOML file with defaults for local runs. Environment values win.
    #[arg(long, global = true, env = "SDK_REGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Use an existing working copy instead of cloning.
    #[arg(long, global = true)]
    workdir: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the step selected by INPUT_ACTION (generate, finalize, release)
    Run(CycleArgs),

    /// Run one regeneration cycle
    ///
    /// Resolves the branch, runs the generator, and if the output changed
    /// significantly appends to the ledger, commits, pushes, and then opens
    /// or updates the pull request (pr mode) or merges into the target
    /// branch (direct mode).
    Cycle(CycleArgs),

    /// Merge a pushed branch into the target branch and delete it
    Finalize {
        /// Branch to merge. Defaults to INPUT_BRANCH_NAME.
        #[arg(long)]
        branch: Option<String>,
    },

    /// Print the last ledger record as JSON
    LastRelease {
        /// Ledger file. Defaults to RELEASES.md in `--workdir` or a fresh
        /// clone of the target branch.
        #[arg(long)]
        ledger: Option<PathBuf>,
    },

    /// Print whether a directory changed significantly
    CheckDirty {
        /// Directory relative to the repository root.
        dir: String,
    },

    /// List files changed by the push that triggered the workflow
    ChangedFiles,

    /// Print the latest released generator tag
    LatestGeneratorTag,
}

#[derive(Args, Clone, Debug)]
struct CycleArgs {
    /// Version being released.
    #[arg(long, env = "INPUT_RELEASE_VERSION")]
    release_version: Option<String>,

    /// Version of the OpenAPI document.
    #[arg(long, env = "INPUT_OPENAPI_DOC_VERSION")]
    spec_version: Option<String>,

    /// Published package, as `<ecosystem>=<name>[:<path>]`. Repeatable.
    #[arg(long = "package", value_name = "SPEC")]
    packages: Vec<String>,

    /// Command that generates the SDK in the working copy.
    #[arg(long, num_args = 1.., allow_hyphen_values = true, value_name = "ARGV")]
    generate_cmd: Vec<String>,

    /// Command printing the changelog; `{current}` and `{previous}` are
    /// replaced with generator versions.
    #[arg(long, num_args = 1.., allow_hyphen_values = true, value_name = "ARGV")]
    changelog_cmd: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_env_with_file(path),
        None => PipelineConfig::from_env(),
    }
    .context("failed to load configuration")?;

    let _telemetry = telemetry::init(config.debug, cli.json_logs);

    match &cli.command {
        Commands::Run(args) => match config.action {
            Action::Generate => run_cycle(&cli, &config, args),
            Action::Finalize => run_finalize(&cli, &config, None),
            Action::Release => run_last_release(&cli, &config, None),
        },
        Commands::Cycle(args) => run_cycle(&cli, &config, args),
        Commands::Finalize { branch } => run_finalize(&cli, &config, branch.as_deref()),
        Commands::LastRelease { ledger } => run_last_release(&cli, &config, ledger.clone()),
        Commands::CheckDirty { dir } => run_check_dirty(&cli, &config, dir),
        Commands::ChangedFiles => run_changed_files(&cli, &config),
        Commands::LatestGeneratorTag => run_latest_generator_tag(&config),
    }
}

fn new_session(config: &PipelineConfig) -> Result<RepositorySession> {
    let client = GitHubClient::new(&config.api_url, config.access_token())
        .context("failed to create GitHub client")?;
    Ok(RepositorySession::new(Box::new(client), config.credential()))
}

/// A session bound to `--workdir` or to a fresh clone of the target branch.
fn bound_session(cli: &Cli, config: &PipelineConfig) -> Result<RepositorySession> {
    let mut session = new_session(config)?;
    if let Some(dir) = &cli.workdir {
        session
            .open(dir)
            .with_context(|| format!("failed to open working copy {}", dir.display()))?;
    } else {
        let url = config.clone_url()?;
        session
            .clone_repository(&url, &config.work_dir(), Some(config.target_branch()))
            .with_context(|| format!("failed to clone {url}"))?;
    }
    Ok(session)
}

fn run_cycle(cli: &Cli, config: &PipelineConfig, args: &CycleArgs) -> Result<()> {
    let record = release_record(config, args)?;
    let session = bound_session(cli, config)?;

    let mut generator = CommandGenerator::new(args.generate_cmd.clone(), record);
    let changelog: Box<dyn ChangelogSource> = if args.changelog_cmd.is_empty() {
        Box::new(NoChangelog)
    } else {
        Box::new(CommandChangelog::new(args.changelog_cmd.clone()))
    };

    let outcome = cycle::run_cycle(&session, config, &mut generator, changelog.as_ref())?;
    match outcome {
        CycleOutcome::NoChange { branch } => {
            info!(%branch, "no changes to publish");
            println!("no changes");
        }
        CycleOutcome::PullRequest {
            branch,
            commit,
            pull_request,
        } => {
            println!("committed {commit} on {branch}");
            println!("pull request: {}", pull_request.html_url);
        }
        CycleOutcome::Merged {
            branch,
            commit,
            merge_commit,
        } => {
            println!("committed {commit} on {branch}");
            println!("merged into {} at {merge_commit}", config.target_branch());
        }
    }
    Ok(())
}

fn run_finalize(cli: &Cli, config: &PipelineConfig, branch: Option<&str>) -> Result<()> {
    let branch = branch.unwrap_or(&config.branch_name);
    if branch.is_empty() {
        bail!("no branch to finalize; pass --branch or set INPUT_BRANCH_NAME");
    }
    let session = bound_session(cli, config)?;
    let merge_commit = cycle::finalize(&session, config, branch)?;
    println!("merged {branch} into {} at {merge_commit}", config.target_branch());
    Ok(())
}

fn run_last_release(cli: &Cli, config: &PipelineConfig, ledger: Option<PathBuf>) -> Result<()> {
    let summary = match ledger {
        Some(path) => ReleaseSummary {
            record: LedgerStore::new(path).read_last()?,
            create_git_release: config.create_git_release(),
        },
        None => cycle::last_release(&bound_session(cli, config)?, config)?,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_check_dirty(cli: &Cli, config: &PipelineConfig, dir: &str) -> Result<()> {
    let session = bound_session(cli, config)?;
    let policy = SignificancePolicy::from(&config.detection);
    let dirty = detect::is_significant(&session, &policy, dir)?;
    println!("{dirty}");
    Ok(())
}

fn run_changed_files(cli: &Cli, config: &PipelineConfig) -> Result<()> {
    let Some(payload) = &config.event_path else {
        bail!("no workflow event payload path (GITHUB_EVENT_PATH)");
    };
    let session = bound_session(cli, config)?;
    for file in event::committed_files(&session, payload)? {
        println!("{file}");
    }
    Ok(())
}

fn run_latest_generator_tag(config: &PipelineConfig) -> Result<()> {
    let client = GitHubClient::new(&config.api_url, config.access_token())?;
    let tag = host::latest_tag(&client, GENERATOR_OWNER, GENERATOR_REPO)
        .context("failed to get generator tags")?;
    println!("{}", tag.name);
    Ok(())
}

/// The record this cycle will append, from arguments and configuration.
fn release_record(config: &PipelineConfig, args: &CycleArgs) -> Result<ReleaseRecord> {
    let Some(release) = args.release_version.as_deref().filter(|v| !v.is_empty()) else {
        bail!("no release version; pass --release-version or set INPUT_RELEASE_VERSION");
    };
    let mut record = ReleaseRecord::new(
        release,
        args.spec_version.clone().unwrap_or_default(),
        config.openapi_doc_location.clone(),
        config.generator_version.clone(),
    );

    for spec in &args.packages {
        let (ecosystem, name, path) = parse_package(spec)?;
        if !config.targets(ecosystem) || !config.is_published(ecosystem) {
            info!(%ecosystem, "not targeted or not published; leaving out of the ledger");
            continue;
        }
        let artifact = PublishedArtifact::canonical(ecosystem, name, release, path)
            .with_context(|| format!("invalid package name `{name}` for {ecosystem}"))?;
        record = record.with_artifact(ecosystem, artifact);
    }
    Ok(record)
}

/// `npm=@acme/sdk:typescript` → (Npm, "@acme/sdk", "typescript"). The path
/// defaults to the ecosystem's language.
fn parse_package(spec: &str) -> Result<(Ecosystem, &str, &str)> {
    let Some((ecosystem, rest)) = spec.split_once('=') else {
        bail!("invalid package `{spec}`; expected <ecosystem>=<name>[:<path>]");
    };
    let ecosystem: Ecosystem = ecosystem
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let (name, path) = rest
        .split_once(':')
        .unwrap_or((rest, ecosystem.language()));
    if name.is_empty() {
        bail!("invalid package `{spec}`; name is empty");
    }
    Ok((ecosystem, name, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn package_spec_forms() {
        let (e, n, p) = parse_package("npm=@acme/sdk:ts").unwrap();
        assert_eq!((e, n, p), (Ecosystem::Npm, "@acme/sdk", "ts"));
        let (e, n, p) = parse_package("maven=com.acme.sdk").unwrap();
        assert_eq!((e, n, p), (Ecosystem::Maven, "com.acme.sdk", "java"));
        assert!(parse_package("npm").is_err());
        assert!(parse_package("cobol=x").is_err());
    }

    fn args(packages: &[&str]) -> CycleArgs {
        CycleArgs {
            release_version: Some("1.2.0".to_owned()),
            spec_version: Some("3.0.0".to_owned()),
            packages: packages.iter().map(|p| (*p).to_owned()).collect(),
            generate_cmd: Vec::new(),
            changelog_cmd: Vec::new(),
        }
    }

    fn config(vars: &'static [(&'static str, &'static str)]) -> PipelineConfig {
        PipelineConfig::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_owned())
        })
        .unwrap()
    }

    #[test]
    fn record_keeps_targeted_published_packages() {
        let cfg = config(&[
            ("INPUT_LANGUAGES", "typescript"),
            ("INPUT_PUBLISH_TYPESCRIPT", "true"),
            ("INPUT_PUBLISH_PYTHON", "true"),
        ]);
        let record =
            release_record(&cfg, &args(&["npm=@acme/sdk", "pypi=acme-sdk", "maven=com.acme.sdk"]))
                .unwrap();
        assert!(record.artifact(Ecosystem::Npm).is_some());
        assert!(record.artifact(Ecosystem::PyPi).is_none());
        assert!(record.artifact(Ecosystem::Maven).is_none());
    }

    #[test]
    fn release_summary_flattens_record() {
        let summary = ReleaseSummary {
            record: ReleaseRecord::new("1.2.0", "3.0.0", "openapi.yaml", "1.19.2"),
            create_git_release: true,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["release_version"], "1.2.0");
        assert_eq!(value["create_git_release"], true);
    }
}
