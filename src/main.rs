use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use git_release_notes::archive::{DepositionMetadata, PublishAction, ZenodoClient};
use git_release_notes::cache::{flush_all, Flush, ResponseCache};
use git_release_notes::config::{self, Config};
use git_release_notes::domain::{MergeBases, ReleaseMetadata};
use git_release_notes::git::{Git2Repository, Repository, SystemGit};
use git_release_notes::github::GitHubClient;
use git_release_notes::profile::{ProfileResolver, ProfileStore};
use git_release_notes::reconcile::PullRequestRange;
use git_release_notes::teams::TeamDirectory;
use git_release_notes::ui;
use git_release_notes::workflow::{self, NotesFormat, ReleaseSummary, Workflow};

#[derive(Parser)]
#[command(
    name = "git-release-notes",
    version,
    about = "Reconcile merged pull requests and produce release notes and archive metadata"
)]
struct Cli {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(long, global = true, default_value = ".", help = "Path to the git repository")]
    repo: PathBuf,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = Backend::Git,
        help = "How to read the commit log"
    )]
    backend: Backend,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// The `git` executable
    Git,
    /// Built-in libgit2
    Libgit2,
}

#[derive(Args, Clone)]
struct RangeArgs {
    #[arg(long, help = "Version being released, e.g. 0.6.1")]
    release: Option<String>,

    #[arg(long, help = "Merge base: include commits since this ref")]
    since: String,

    #[arg(long, help = "Already-released sibling branch whose commits are excluded")]
    exclude: Option<String>,

    #[arg(long, default_value = "develop", help = "Ref containing the candidate commits")]
    target: String,
}

impl RangeArgs {
    fn metadata(&self) -> Result<ReleaseMetadata> {
        let mut refs = vec![self.since.as_str()];
        refs.extend(self.exclude.as_deref());
        let bases = MergeBases::from_refs(&refs[..])?;
        Ok(ReleaseMetadata::new(
            self.release.as_deref(),
            bases,
            &self.target,
        ))
    }
}

#[derive(Args, Clone)]
struct OutputArgs {
    #[arg(long, help = "Markdown file with the free-text introduction")]
    body: Option<PathBuf>,

    #[arg(short, long, help = "Write to this file instead of stdout")]
    output: Option<PathBuf>,
}

impl OutputArgs {
    fn body(&self) -> Result<String> {
        match &self.body {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("reading body from {}", path.display())),
            None => Ok(String::new()),
        }
    }

    fn write(&self, text: &str) -> Result<()> {
        match &self.output {
            Some(path) => {
                fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
                ui::display_success(&format!("Wrote {}", path.display()));
            }
            None => print!("{}", text),
        }
        Ok(())
    }
}

#[derive(Subcommand)]
enum Command {
    /// List the pull requests merged in a release range
    Pulls {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Rank authors and reviewers of a release range
    Contributors {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Render release notes
    Notes {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[arg(long, default_value = "md", help = "md or rst")]
        format: String,
    },
    /// Print the archive deposition metadata as JSON
    ArchiveMetadata {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Create or update the archive deposition and upload the release tarball
    Publish {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[arg(long, help = "Version whose deposition this release is a new version of")]
        previous_release: Option<String>,
        #[arg(long, help = "Skip uploading the release tarball")]
        no_upload: bool,
        #[arg(short, long, help = "Skip confirmation prompt")]
        yes: bool,
    },
    /// List organization teams and affiliates
    Teams,
    /// List version-control tags
    Tags,
    /// Delete the response cache file
    PurgeCache,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        ui::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn open_repo(cli: &Cli) -> Result<Box<dyn Repository>> {
    let repo: Box<dyn Repository> = match cli.backend {
        Backend::Git => Box::new(SystemGit::open(&cli.repo)?),
        Backend::Libgit2 => Box::new(Git2Repository::open(&cli.repo)?),
    };
    Ok(repo)
}

fn open_host(config: &Config) -> Result<GitHubClient> {
    let github = &config.github;
    let token = config::resolve_token(&github.token_env, github.token_file.as_deref());
    if token.is_none() {
        ui::display_status(&format!(
            "No GitHub token in ${}; using unauthenticated requests",
            github.token_env
        ));
    }
    let cache = ResponseCache::open(config.paths.cache_file(github));
    Ok(GitHubClient::new(
        &github.api_url,
        github.owner.as_str(),
        github.repo.as_str(),
        token.as_deref(),
        cache,
    )?)
}

fn summarize(
    repo: &dyn Repository,
    host: &mut GitHubClient,
    config: &Config,
    metadata: &ReleaseMetadata,
) -> Result<ReleaseSummary> {
    let summary =
        Workflow::new(repo, host, config).summarize(metadata, ui::display_progress)?;
    for warning in &summary.reconciliation.warnings {
        ui::display_warning(warning);
    }
    for problem in summary.rejected() {
        ui::display_categorization_problem(problem);
    }
    Ok(summary)
}

/// Markdown notes for the archive description
fn markdown_notes(
    config: &Config,
    metadata: &ReleaseMetadata,
    summary: &ReleaseSummary,
    profiles: &mut ProfileStore,
    host: &mut GitHubClient,
) -> Result<String> {
    let mut resolver = ProfileResolver::new(profiles, host, &config.profiles);
    Ok(workflow::render_notes(
        config,
        metadata,
        summary,
        "",
        NotesFormat::Markdown,
        &mut resolver,
    )?)
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref()).context("loading configuration")?;

    match &cli.command {
        Command::Tags => {
            let repo = open_repo(&cli)?;
            ui::display_list(&repo.list_tags()?);
            return Ok(());
        }
        Command::PurgeCache => {
            let mut cache = ResponseCache::open(config.paths.cache_file(&config.github));
            cache.purge()?;
            ui::display_success("Response cache purged");
            return Ok(());
        }
        _ => {}
    }

    let mut host = open_host(&config)?;
    let mut profiles = ProfileStore::open(config.paths.profiles_file())?;

    let result = run_command(&cli, &config, &mut host, &mut profiles);
    let mut stores: [&mut dyn Flush; 2] = [&mut host, &mut profiles];
    flush_all(result, &mut stores)
}

fn run_command(
    cli: &Cli,
    config: &Config,
    host: &mut GitHubClient,
    profiles: &mut ProfileStore,
) -> Result<()> {
    match &cli.command {
        Command::Pulls { range } => {
            let repo = open_repo(cli)?;
            let mut range = PullRequestRange::new(range.metadata()?);
            let reconciliation = Workflow::new(&*repo, &mut *host, config).pulls(&mut range)?;
            for warning in &reconciliation.warnings {
                ui::display_warning(warning);
            }
            ui::display_reconciliation(&reconciliation);
        }
        Command::Contributors { range } => {
            let repo = open_repo(cli)?;
            let metadata = range.metadata()?;
            let mut workflow = Workflow::new(&*repo, &mut *host, config);
            let mut range = PullRequestRange::new(metadata);
            let reconciliation = workflow.pulls(&mut range)?;
            let contributions =
                workflow.contributions(&reconciliation.pull_ids, ui::display_progress)?;
            ui::display_ranking("Authors", &contributions.authors);
            ui::display_ranking("Reviewers", &contributions.reviewers);
        }
        Command::Notes {
            range,
            output,
            format,
        } => {
            let format: NotesFormat = format.parse()?;
            let repo = open_repo(cli)?;
            let metadata = range.metadata()?;
            let summary = summarize(&*repo, &mut *host, config, &metadata)?;
            let body = output.body()?;
            let mut resolver = ProfileResolver::new(&mut *profiles, &mut *host, &config.profiles);
            let text =
                workflow::render_notes(config, &metadata, &summary, &body, format, &mut resolver)?;
            output.write(&text)?;
        }
        Command::ArchiveMetadata { range, output } => {
            let repo = open_repo(cli)?;
            let metadata = range.metadata()?;
            let record = build_archive_metadata(
                &*repo,
                &mut *host,
                &mut *profiles,
                config,
                &metadata,
                &output.body()?,
            )?;
            output.write(&format!("{}\n", serde_json::to_string_pretty(&record)?))?;
        }
        Command::Publish {
            range,
            output,
            previous_release,
            no_upload,
            yes,
        } => {
            let repo = open_repo(cli)?;
            let metadata = range.metadata()?;
            let version = metadata.require_release()?.to_string();
            let record = build_archive_metadata(
                &*repo,
                &mut *host,
                &mut *profiles,
                config,
                &metadata,
                &output.body()?,
            )?;

            let tarball = if *no_upload {
                None
            } else {
                match workflow::find_release(&mut *host, &version)? {
                    Some(release) => workflow::release_tarball(&mut *host, &release)?,
                    None => None,
                }
            };
            // Everything fetched so far stays cached even if publishing fails
            host.flush()?;
            profiles.flush()?;

            let prompt = format!("Publish '{}' to the archive?", record.title);
            if !*yes && !ui::confirm_action(&prompt)? {
                ui::display_status("Operation cancelled by user.");
                return Ok(());
            }

            let token = config::resolve_token(
                &config.archive.token_env,
                config.archive.token_file.as_deref(),
            );
            let mut registry = ZenodoClient::new(&config.archive.api_url, token.as_deref())?;
            let previous_title = previous_release
                .as_deref()
                .map(|v| config.archive.title_for(&config.github.repo, v));
            let outcome = workflow::publish(
                &mut registry,
                &record,
                previous_title.as_deref(),
                tarball.as_ref(),
            )?;
            let verb = match outcome.action {
                PublishAction::Created => "Created",
                PublishAction::NewVersion => "Created new version",
                PublishAction::UpdatedDraft => "Updated draft",
                PublishAction::AlreadyPublished => "Already published",
            };
            ui::display_success(&format!(
                "{} deposition {}: {}",
                verb,
                outcome.deposition.id,
                outcome.deposition.html_url()
            ));
            if let Some(name) = outcome.uploaded {
                ui::display_success(&format!("Uploaded {}", name));
            }
        }
        Command::Teams => {
            let teams = TeamDirectory::load(&mut *host)?;
            ui::display_teams(&teams);
        }
        Command::Tags | Command::PurgeCache => {}
    }
    Ok(())
}

fn build_archive_metadata(
    repo: &dyn Repository,
    host: &mut GitHubClient,
    profiles: &mut ProfileStore,
    config: &Config,
    metadata: &ReleaseMetadata,
    body: &str,
) -> Result<DepositionMetadata> {
    let summary = summarize(repo, &mut *host, config, metadata)?;
    let teams = Workflow::new(repo, &mut *host, config).teams()?;
    let version = metadata.require_release()?;
    let remote = workflow::find_release(&mut *host, version)?;
    let notes = markdown_notes(config, metadata, &summary, &mut *profiles, &mut *host)?;
    let mut resolver = ProfileResolver::new(profiles, host, &config.profiles);
    Ok(workflow::archive_metadata(
        config,
        metadata,
        &summary.contributions,
        &teams,
        remote.as_ref(),
        body,
        &notes,
        &mut resolver,
    )?)
}
