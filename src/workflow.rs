//! Idempotent release-bookkeeping steps.
//!
//! Each step reads through the code host (and so through its response
//! cache); re-running a step after a failure repeats only the remote work
//! that did not complete.

use std::str::FromStr;

use tracing::{info, warn};

use crate::archive::{
    publish_deposition, ArchiveMetadataBuilder, ArchiveRegistry, Artifact, DepositionMetadata,
    PublishOutcome,
};
use crate::attribution::{ContributionCounter, Contributions};
use crate::categorize::PullSorter;
use crate::config::Config;
use crate::domain::{HostRelease, ReleaseMetadata};
use crate::error::{CategorizationError, ReleaseNotesError, Result};
use crate::git::Repository;
use crate::github::CodeHost;
use crate::notes::{MarkdownNotes, NoteRenderer, RstNotes};
use crate::profile::ProfileLookup;
use crate::reconcile::{PullRequestRange, Reconciliation};
use crate::teams::TeamDirectory;

/// Output markup for release notes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesFormat {
    Markdown,
    Rst,
}

impl FromStr for NotesFormat {
    type Err = ReleaseNotesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(NotesFormat::Markdown),
            "rst" | "restructuredtext" => Ok(NotesFormat::Rst),
            other => Err(ReleaseNotesError::config(format!(
                "unknown notes format '{}' (expected md or rst)",
                other
            ))),
        }
    }
}

/// Everything known about one release's pull requests
#[derive(Debug, Clone)]
pub struct ReleaseSummary {
    pub reconciliation: Reconciliation,
    pub contributions: Contributions,
    pub pulls: PullSorter,
}

impl ReleaseSummary {
    pub fn rejected(&self) -> &[CategorizationError] {
        self.pulls.rejected()
    }
}

/// A release tarball and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tarball {
    pub name: String,
    pub url: String,
    pub content: Vec<u8>,
}

/// Steps that need the repository and the code host
pub struct Workflow<'a, R: Repository + ?Sized, H: CodeHost + ?Sized> {
    repo: &'a R,
    host: &'a mut H,
    config: &'a Config,
}

impl<'a, R: Repository + ?Sized, H: CodeHost + ?Sized> Workflow<'a, R, H> {
    pub fn new(repo: &'a R, host: &'a mut H, config: &'a Config) -> Self {
        Workflow { repo, host, config }
    }

    pub fn host(&mut self) -> &mut H {
        self.host
    }

    /// Pull requests in the release range, in commit order
    pub fn pulls(&mut self, range: &mut PullRequestRange) -> Result<Reconciliation> {
        let reconciliation = range.reconcile(
            self.repo,
            self.host,
            &self.config.reconcile,
            self.config.reconcile.pull_base.clone(),
        )?;
        Ok(reconciliation.clone())
    }

    /// Count authors and reviewers; a missing pull request stops the count.
    pub fn contributions<F>(&mut self, ids: &[u64], progress: F) -> Result<Contributions>
    where
        F: FnMut(usize, usize, u64),
    {
        let mut counter = ContributionCounter::new(self.config.attribution.clone());
        counter.record_all(self.host, ids, progress)?;
        Ok(counter.sorted())
    }

    /// Categorize every pull request; badly labelled ones are reported and skipped.
    pub fn sorted_pulls(&mut self, ids: &[u64]) -> Result<PullSorter> {
        let mut sorter = PullSorter::new(self.config.categories.clone());
        let problems = sorter.add_all(self.host, ids)?;
        if !problems.is_empty() {
            warn!("{} pull requests need label fixes", problems.len());
        }
        Ok(sorter)
    }

    /// Reconcile, count and categorize in one pass
    pub fn summarize<F>(
        &mut self,
        metadata: &ReleaseMetadata,
        progress: F,
    ) -> Result<ReleaseSummary>
    where
        F: FnMut(usize, usize, u64),
    {
        let mut range = PullRequestRange::new(metadata.clone());
        let reconciliation = self.pulls(&mut range)?;
        let contributions = self.contributions(&reconciliation.pull_ids, progress)?;
        let pulls = self.sorted_pulls(&reconciliation.pull_ids)?;
        Ok(ReleaseSummary {
            reconciliation,
            contributions,
            pulls,
        })
    }

    pub fn teams(&mut self) -> Result<TeamDirectory> {
        TeamDirectory::load(self.host)
    }

    pub fn find_release(&mut self, version: &str) -> Result<Option<HostRelease>> {
        find_release(self.host, version)
    }

    pub fn release_tarball(&mut self, release: &HostRelease) -> Result<Option<Tarball>> {
        release_tarball(self.host, release)
    }

    /// Version-control tags, as `git tag --list` orders them
    pub fn tags(&self) -> Result<Vec<String>> {
        self.repo.list_tags()
    }
}

/// Render release notes from a summary.
///
/// Sections: body, categorized pulls, reviewers, changelog link.
pub fn render_notes(
    config: &Config,
    metadata: &ReleaseMetadata,
    summary: &ReleaseSummary,
    body: &str,
    format: NotesFormat,
    profiles: &mut dyn ProfileLookup,
) -> Result<String> {
    let mut renderer: Box<dyn NoteRenderer> = match format {
        NotesFormat::Markdown => Box::new(MarkdownNotes::new(metadata, body)),
        NotesFormat::Rst => {
            let prefix = config
                .archive
                .citation_prefix
                .as_deref()
                .unwrap_or(&config.github.repo);
            Box::new(RstNotes::new(metadata, body, prefix)?)
        }
    };
    renderer.sorted_pulls(&summary.pulls);
    renderer.reviewers(&summary.contributions.reviewers, profiles)?;
    renderer.changelog_line(&config.github.owner, &config.github.repo);
    Ok(renderer.render())
}

/// Deposition record for a release
#[allow(clippy::too_many_arguments)]
pub fn archive_metadata(
    config: &Config,
    metadata: &ReleaseMetadata,
    contributions: &Contributions,
    teams: &TeamDirectory,
    remote_release: Option<&HostRelease>,
    body: &str,
    notes: &str,
    profiles: &mut dyn ProfileLookup,
) -> Result<DepositionMetadata> {
    ArchiveMetadataBuilder::new(
        &config.archive,
        &config.teams,
        teams,
        config.github.owner.as_str(),
        config.github.repo.as_str(),
    )
    .build(contributions, metadata, remote_release, body, notes, profiles)
}

/// Publish `metadata` to the archive, attaching the tarball when there is one.
pub fn publish<A: ArchiveRegistry + ?Sized>(
    registry: &mut A,
    metadata: &DepositionMetadata,
    previous_title: Option<&str>,
    tarball: Option<&Tarball>,
) -> Result<PublishOutcome> {
    let artifact = tarball.map(|t| Artifact {
        name: &t.name,
        content: &t.content,
    });
    publish_deposition(registry, metadata, previous_title, artifact)
}

/// Code-host release tagged `v<version>` or named `Version <version>`
pub fn find_release<H: CodeHost + ?Sized>(
    host: &mut H,
    version: &str,
) -> Result<Option<HostRelease>> {
    let version = version.trim_start_matches('v');
    let found = host
        .list_releases()?
        .into_iter()
        .find(|r| r.matches_version(version));
    if found.is_none() {
        info!("No release found for version {}", version);
    }
    Ok(found)
}

/// The release's single `.tar.gz` asset, else the generated source tarball.
///
/// Several `.tar.gz` assets are ambiguous and yield `None`.
pub fn release_tarball<H: CodeHost + ?Sized>(
    host: &mut H,
    release: &HostRelease,
) -> Result<Option<Tarball>> {
    let assets: Vec<_> = release
        .assets
        .iter()
        .filter(|a| a.name.ends_with(".tar.gz"))
        .collect();
    match assets.as_slice() {
        [asset] => {
            let content = host.download(&asset.browser_download_url)?;
            Ok(Some(Tarball {
                name: asset.name.clone(),
                url: asset.browser_download_url.clone(),
                content,
            }))
        }
        [] => {
            let Some(url) = release.tarball_url.clone() else {
                warn!("Release {} has no tarball", release.tag_name);
                return Ok(None);
            };
            info!("No tarball asset on {}; using the source archive", release.tag_name);
            let content = host.download(&url)?;
            let (_, repo) = host.coordinates();
            Ok(Some(Tarball {
                name: format!(
                    "{}-{}.tar.gz",
                    repo,
                    release.tag_name.trim_start_matches('v')
                ),
                url,
                content,
            }))
        }
        _ => {
            warn!("Multiple tarballs found in assets of {}", release.tag_name);
            Ok(None)
        }
    }
}
