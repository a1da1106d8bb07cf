//! Mapping a commit range onto the pull requests it contains.
//!
//! Each commit between the merge base and the target is explained, in order,
//! by: a pinned subject override, the code host's commit to PR association,
//! an exact (normalized) subject match against recently merged PRs, or the
//! PR number written in the subject itself.
//! Commits whose subject is on the ignore list are intentionally
//! unattributed; anything else left over produces a warning.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::config::ReconcileConfig;
use crate::diagnostics::ReconciliationWarning;
use crate::domain::{normalize_subject, Commit, ReleaseMetadata};
use crate::error::Result;
use crate::git::{CommitRangeResolver, Repository};
use crate::github::CodeHost;

/// How one commit was (or was not) attributed to a pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution {
    /// Configured subject override
    Pinned(u64),
    /// Code-host commit association
    Direct(u64),
    /// Subject equal to a recently merged PR title
    SubjectMatch(u64),
    /// PR number named in the subject (`(#N)` or `Merge pull request #N`)
    SubjectNumber(u64),
    /// Attributed to a PR already released on the excluded sibling
    AlreadyReleased(u64),
    /// Subject on the ignore list
    Ignored,
    /// Nothing explains the commit
    Unmatched,
}

impl Attribution {
    /// PR this commit contributes to the release, if any
    pub fn contributed_pull(&self) -> Option<u64> {
        match self {
            Attribution::Pinned(id)
            | Attribution::Direct(id)
            | Attribution::SubjectMatch(id)
            | Attribution::SubjectNumber(id) => Some(*id),
            Attribution::AlreadyReleased(_) | Attribution::Ignored | Attribution::Unmatched => None,
        }
    }
}

/// Result of reconciling one release range
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Unique PR ids in commit order (oldest first)
    pub pull_ids: Vec<u64>,
    /// Every included commit with its attribution, pull filled in when known
    pub commits: Vec<(Commit, Attribution)>,
    /// Commits dropped because they are reachable from the excluded sibling
    pub excluded_commits: usize,
    pub warnings: Vec<ReconciliationWarning>,
}

impl Reconciliation {
    pub fn ignored(&self) -> impl Iterator<Item = &Commit> {
        self.commits
            .iter()
            .filter(|(_, a)| *a == Attribution::Ignored)
            .map(|(c, _)| c)
    }
}

/// Resolves [ReleaseMetadata] to the ordered set of pull requests it contains
pub struct PrReconciler<'a, R: Repository + ?Sized, H: CodeHost + ?Sized> {
    repo: &'a R,
    host: &'a mut H,
    config: &'a ReconcileConfig,
    pull_base: Option<String>,
    recent_titles: Option<HashMap<String, u64>>,
}

impl<'a, R: Repository + ?Sized, H: CodeHost + ?Sized> PrReconciler<'a, R, H> {
    pub fn new(repo: &'a R, host: &'a mut H, config: &'a ReconcileConfig) -> Self {
        PrReconciler {
            repo,
            host,
            config,
            pull_base: None,
            recent_titles: None,
        }
    }

    /// Restrict the recently-merged listing to PRs against `base`
    pub fn with_pull_base(mut self, base: Option<String>) -> Self {
        self.pull_base = base;
        self
    }

    pub fn resolve(&mut self, metadata: &ReleaseMetadata) -> Result<Reconciliation> {
        let resolver = CommitRangeResolver::new(self.repo, self.config.first_parent);
        let target = metadata.target_branch();
        let bases = metadata.merge_bases();

        let (outside_sibling, excluded_pulls) = match bases.excluded() {
            Some(sibling) => {
                let fork = resolver.merge_base(target, sibling)?;
                let pulls: HashSet<u64> = resolver
                    .commits_between(&fork, sibling)?
                    .iter()
                    .filter_map(Commit::subject_pull)
                    .collect();
                let hashes: HashSet<String> = resolver
                    .commits_between(sibling, target)?
                    .into_iter()
                    .map(|c| c.hash)
                    .collect();
                (Some(hashes), pulls)
            }
            None => (None, HashSet::new()),
        };

        let mut result = Reconciliation::default();
        let mut seen_hashes = HashSet::new();
        let mut seen_pulls = HashSet::new();

        for mut commit in resolver.commits_between(bases.primary(), target)? {
            if let Some(outside) = &outside_sibling {
                if !outside.contains(&commit.hash) {
                    result.excluded_commits += 1;
                    continue;
                }
            }
            if !seen_hashes.insert(commit.hash.clone()) {
                continue;
            }

            let mut attribution = self.attribute(&commit, &mut result.warnings)?;
            if let Some(id) = attribution.contributed_pull() {
                if excluded_pulls.contains(&id) {
                    debug!("#{} already released on the excluded branch", id);
                    attribution = Attribution::AlreadyReleased(id);
                }
            }

            if let Some(id) = attribution.contributed_pull() {
                commit.pull = Some(id);
                if seen_pulls.insert(id) {
                    result.pull_ids.push(id);
                }
            }
            result.commits.push((commit, attribution));
        }

        debug!(
            "{}: {} pull requests from {} commits",
            metadata,
            result.pull_ids.len(),
            result.commits.len()
        );
        Ok(result)
    }

    fn attribute(
        &mut self,
        commit: &Commit,
        warnings: &mut Vec<ReconciliationWarning>,
    ) -> Result<Attribution> {
        if let Some(id) = self.config.pinned.get(&commit.subject) {
            return Ok(Attribution::Pinned(*id));
        }

        let associated = self.host.get_pull_commit_association(&commit.hash)?;
        if let Some(&chosen) = associated.first() {
            if associated.len() > 1 {
                let warning = ReconciliationWarning::AmbiguousAssociation {
                    hash: commit.hash.clone(),
                    pulls: associated.clone(),
                    chosen,
                };
                warn!("{}", warning);
                warnings.push(warning);
            }
            return Ok(Attribution::Direct(chosen));
        }

        let subject = normalize_subject(&commit.subject);
        if let Some(id) = self.recent_titles()?.get(subject) {
            return Ok(Attribution::SubjectMatch(*id));
        }

        if let Some(id) = commit.subject_pull() {
            debug!("#{} taken from subject of {}", id, commit.short_hash());
            return Ok(Attribution::SubjectNumber(id));
        }

        if self
            .config
            .ignored_subjects
            .iter()
            .any(|ignored| normalize_subject(ignored) == subject)
        {
            debug!("Ignoring commit {}: {}", commit.short_hash(), commit.subject);
            return Ok(Attribution::Ignored);
        }

        let warning = ReconciliationWarning::UnmatchedSubject {
            hash: commit.hash.clone(),
            subject: commit.subject.clone(),
        };
        warn!("{}", warning);
        warnings.push(warning);
        Ok(Attribution::Unmatched)
    }

    /// Normalized title to PR id of recently merged PRs, fetched on first use
    fn recent_titles(&mut self) -> Result<&HashMap<String, u64>> {
        if self.recent_titles.is_none() {
            let pulls = self
                .host
                .list_recent_merged_pulls(self.pull_base.as_deref(), self.config.recent_pulls)?;
            let mut titles = HashMap::new();
            // Listing is newest first; keep the newest PR for a repeated title
            for pull in pulls {
                titles
                    .entry(normalize_subject(&pull.title).to_string())
                    .or_insert(pull.id);
            }
            self.recent_titles = Some(titles);
        }
        Ok(self.recent_titles.get_or_insert_with(HashMap::new))
    }
}

/// A release range whose pull requests are computed once and then reused
#[derive(Debug, Clone)]
pub struct PullRequestRange {
    metadata: ReleaseMetadata,
    resolved: Option<Reconciliation>,
}

impl PullRequestRange {
    pub fn new(metadata: ReleaseMetadata) -> Self {
        PullRequestRange {
            metadata,
            resolved: None,
        }
    }

    pub fn metadata(&self) -> &ReleaseMetadata {
        &self.metadata
    }

    /// Reconcile on first call; later calls return the stored result.
    pub fn reconcile<R, H>(
        &mut self,
        repo: &R,
        host: &mut H,
        config: &ReconcileConfig,
        pull_base: Option<String>,
    ) -> Result<&Reconciliation>
    where
        R: Repository + ?Sized,
        H: CodeHost + ?Sized,
    {
        if self.resolved.is_none() {
            let reconciliation = PrReconciler::new(repo, host, config)
                .with_pull_base(pull_base)
                .resolve(&self.metadata)?;
            self.resolved = Some(reconciliation);
        }
        Ok(self.resolved.get_or_insert_with(Reconciliation::default))
    }

    /// PR ids, once reconciled
    pub fn pull_ids(&self) -> Option<&[u64]> {
        self.resolved.as_ref().map(|r| r.pull_ids.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MergeBases, PullRequest};
    use crate::git::MockRepository;
    use crate::github::MockCodeHost;

    fn metadata(bases: MergeBases) -> ReleaseMetadata {
        ReleaseMetadata::new(Some("1.3.0"), bases, "main")
    }

    fn config() -> ReconcileConfig {
        ReconcileConfig {
            ignored_subjects: vec!["Format code base (clang-format)".to_string()],
            ..ReconcileConfig::default()
        }
    }

    #[test]
    fn test_direct_subject_and_unmatched() {
        let mut repo = MockRepository::new();
        repo.add_log(
            "v1.2.0",
            "main",
            vec![
                Commit::new("c1", "Add feature (#10)"),
                Commit::new("c2", "Fix the thing"),
                Commit::new("c3", "Mystery commit"),
            ],
        );
        let mut host = MockCodeHost::new();
        host.add_pull(PullRequest::new(10, "Add feature", "alice"), vec![]);
        host.associate("c1", 10);
        host.add_pull(PullRequest::new(11, "Fix the thing", "bob"), vec![]);
        host.add_recent(11);

        let config = config();
        let result = PrReconciler::new(&repo, &mut host, &config)
            .resolve(&metadata(MergeBases::Since("v1.2.0".into())))
            .unwrap();

        assert_eq!(result.pull_ids, vec![10, 11]);
        assert_eq!(result.commits[0].1, Attribution::Direct(10));
        assert_eq!(result.commits[1].1, Attribution::SubjectMatch(11));
        assert_eq!(result.commits[2].1, Attribution::Unmatched);
        assert_eq!(result.commits[1].0.pull, Some(11));
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].hash(), "c3");
    }

    #[test]
    fn test_ignored_subject_is_not_a_warning() {
        let mut repo = MockRepository::new();
        repo.add_log(
            "v1.2.0",
            "main",
            vec![Commit::new("c1", "Format code base (clang-format)")],
        );
        let mut host = MockCodeHost::new();
        let config = config();
        let result = PrReconciler::new(&repo, &mut host, &config)
            .resolve(&metadata(MergeBases::Since("v1.2.0".into())))
            .unwrap();
        assert!(result.pull_ids.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.ignored().count(), 1);
    }

    #[test]
    fn test_pinned_subject_skips_remote() {
        let mut repo = MockRepository::new();
        repo.add_log("v1.2.0", "main", vec![Commit::new("c1", "Fix linking")]);
        let mut host = MockCodeHost::new();
        let mut config = config();
        config.pinned.insert("Fix linking".to_string(), 989);
        let result = PrReconciler::new(&repo, &mut host, &config)
            .resolve(&metadata(MergeBases::Since("v1.2.0".into())))
            .unwrap();
        assert_eq!(result.pull_ids, vec![989]);
        assert_eq!(host.call_count("get_pull_commit_association"), 0);
    }

    #[test]
    fn test_duplicate_pulls_keep_first_position() {
        let mut repo = MockRepository::new();
        repo.add_log(
            "v1.2.0",
            "main",
            vec![
                Commit::new("c1", "Part one"),
                Commit::new("c2", "Other"),
                Commit::new("c3", "Part two"),
            ],
        );
        let mut host = MockCodeHost::new();
        host.associate("c1", 30);
        host.associate("c2", 5);
        host.associate("c3", 30);
        let config = config();
        let result = PrReconciler::new(&repo, &mut host, &config)
            .resolve(&metadata(MergeBases::Since("v1.2.0".into())))
            .unwrap();
        assert_eq!(result.pull_ids, vec![30, 5]);
    }

    #[test]
    fn test_sibling_commits_and_backports_excluded() {
        let mut repo = MockRepository::new();
        repo.add_log(
            "v1.2.0",
            "main",
            vec![
                Commit::new("shared", "Fix shared (#1)"),
                Commit::new("c2", "Backported fix (#2)"),
                Commit::new("c3", "New work (#3)"),
            ],
        );
        repo.set_merge_base("main", "backports/v1.2", "fork");
        repo.add_log(
            "fork",
            "backports/v1.2",
            vec![Commit::new("bp2", "Backported fix (#2)")],
        );
        repo.add_log(
            "backports/v1.2",
            "main",
            vec![
                Commit::new("c2", "Backported fix (#2)"),
                Commit::new("c3", "New work (#3)"),
            ],
        );
        let mut host = MockCodeHost::new();
        host.associate("shared", 1);
        host.associate("c2", 2);
        host.associate("c3", 3);

        let config = config();
        let bases = MergeBases::SinceExcluding {
            base: "v1.2.0".into(),
            sibling: "backports/v1.2".into(),
        };
        let result = PrReconciler::new(&repo, &mut host, &config)
            .resolve(&metadata(bases))
            .unwrap();

        assert_eq!(result.pull_ids, vec![3]);
        assert_eq!(result.excluded_commits, 1);
        assert!(result.commits.iter().all(|(c, _)| c.hash != "shared"));
        assert_eq!(result.commits[0].1, Attribution::AlreadyReleased(2));
        assert_eq!(host.call_count("get_pull_commit_association"), 2);
    }

    #[test]
    fn test_subject_number_when_association_and_listing_miss() {
        let mut repo = MockRepository::new();
        repo.add_log(
            "v1.2.0",
            "main",
            vec![
                Commit::new("c1", "Old fix (#42)"),
                Commit::new("c2", "Merge pull request #43 from alice/topic"),
            ],
        );
        let mut host = MockCodeHost::new();
        let config = config();
        let result = PrReconciler::new(&repo, &mut host, &config)
            .resolve(&metadata(MergeBases::Since("v1.2.0".into())))
            .unwrap();
        assert_eq!(result.pull_ids, vec![42, 43]);
        assert_eq!(result.commits[0].1, Attribution::SubjectNumber(42));
        assert_eq!(result.commits[1].0.pull, Some(43));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_recent_listing_fetched_once() {
        let mut repo = MockRepository::new();
        repo.add_log(
            "v1.2.0",
            "main",
            vec![Commit::new("c1", "One"), Commit::new("c2", "Two")],
        );
        let mut host = MockCodeHost::new();
        host.add_pull(PullRequest::new(1, "One", "a"), vec![]);
        host.add_pull(PullRequest::new(2, "Two", "b"), vec![]);
        host.add_recent(1);
        host.add_recent(2);
        let config = config();
        let result = PrReconciler::new(&repo, &mut host, &config)
            .resolve(&metadata(MergeBases::Since("v1.2.0".into())))
            .unwrap();
        assert_eq!(result.pull_ids, vec![1, 2]);
        assert_eq!(host.call_count("list_recent_merged_pulls"), 1);
    }

    #[test]
    fn test_ambiguous_association_warns_and_uses_first() {
        let mut repo = MockRepository::new();
        repo.add_log("v1.2.0", "main", vec![Commit::new("c1", "Shared")]);
        let mut host = MockCodeHost::new();
        host.associate("c1", 8);
        host.associate("c1", 4);
        let config = config();
        let result = PrReconciler::new(&repo, &mut host, &config)
            .resolve(&metadata(MergeBases::Since("v1.2.0".into())))
            .unwrap();
        assert_eq!(result.pull_ids, vec![8]);
        assert!(matches!(
            result.warnings[0],
            ReconciliationWarning::AmbiguousAssociation { chosen: 8, .. }
        ));
    }

    #[test]
    fn test_range_reconciles_once() {
        let mut repo = MockRepository::new();
        repo.add_log("v1.2.0", "main", vec![Commit::new("c1", "One")]);
        let mut host = MockCodeHost::new();
        host.associate("c1", 1);
        let config = config();

        let mut range = PullRequestRange::new(metadata(MergeBases::Since("v1.2.0".into())));
        assert!(range.pull_ids().is_none());
        range.reconcile(&repo, &mut host, &config, None).unwrap();
        range.reconcile(&repo, &mut host, &config, None).unwrap();
        assert_eq!(range.pull_ids(), Some(&[1u64][..]));
        assert_eq!(host.call_count("get_pull_commit_association"), 1);
    }

    #[test]
    fn test_unknown_ref_is_fatal() {
        let repo = MockRepository::new();
        let mut host = MockCodeHost::new();
        let config = config();
        let err = PrReconciler::new(&repo, &mut host, &config)
            .resolve(&metadata(MergeBases::Since("v0.0.0".into())))
            .unwrap_err();
        assert!(matches!(err, crate::error::ReleaseNotesError::Vcs(_)));
    }
}
