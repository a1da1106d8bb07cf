//! Per-person authoring and reviewing counts over a set of pull requests.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::AttributionConfig;
use crate::error::{ReleaseNotesError, Result};
use crate::github::CodeHost;

/// Handles with counts, highest count first, ties in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ranking(Vec<(String, u32)>);

impl Ranking {
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, u32)>) -> Self {
        Ranking(pairs.into_iter().map(|(h, c)| (h.into(), c)).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(h, c)| (h.as_str(), *c))
    }

    pub fn handles(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(h, _)| h.as_str())
    }

    pub fn get(&self, handle: &str) -> Option<u32> {
        self.0.iter().find(|(h, _)| h == handle).map(|(_, c)| *c)
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.get(handle).is_some()
    }

    pub fn total(&self) -> u32 {
        self.0.iter().map(|(_, c)| c).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ranked authors and reviewers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contributions {
    pub authors: Ranking,
    pub reviewers: Ranking,
}

/// Insertion-ordered counter
#[derive(Debug, Clone, Default)]
struct Tally {
    counts: Vec<(String, u32)>,
    index: HashMap<String, usize>,
}

impl Tally {
    fn bump(&mut self, handle: &str) {
        match self.index.get(handle) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(handle.to_string(), self.counts.len());
                self.counts.push((handle.to_string(), 1));
            }
        }
    }

    fn ranked(&self) -> Ranking {
        let mut counts = self.counts.clone();
        // Stable: equal counts keep first-appearance order
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        Ranking(counts)
    }
}

/// What [ContributionCounter::record] did with a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Counted,
    AlreadyCounted,
    Skipped(String),
}

/// Counts authored and reviewed pull requests per handle
#[derive(Debug, Clone)]
pub struct ContributionCounter {
    policy: AttributionConfig,
    authors: Tally,
    reviewers: Tally,
    processed: HashSet<u64>,
}

impl ContributionCounter {
    pub fn new(policy: AttributionConfig) -> Self {
        ContributionCounter {
            policy,
            authors: Tally::default(),
            reviewers: Tally::default(),
            processed: HashSet::new(),
        }
    }

    fn is_bot(&self, handle: &str, flagged: bool) -> bool {
        flagged || self.policy.bots.iter().any(|b| b == handle)
    }

    /// Count the author and distinct approving reviewers of one pull request.
    ///
    /// A PR the code host cannot return is a [ReleaseNotesError::Lookup]:
    /// attribution must never silently under-count.
    pub fn record<H: CodeHost + ?Sized>(
        &mut self,
        host: &mut H,
        pr_id: u64,
    ) -> Result<RecordOutcome> {
        if self.processed.contains(&pr_id) {
            return Ok(RecordOutcome::AlreadyCounted);
        }
        let pull = host.get_pull(pr_id)?.ok_or_else(|| {
            ReleaseNotesError::lookup(format!("pull request #{} not found", pr_id))
        })?;

        if let Some(label) = self
            .policy
            .skip_labels
            .iter()
            .find(|label| pull.has_label(label))
        {
            debug!("Skipping #{}: labelled {}", pr_id, label);
            return Ok(RecordOutcome::Skipped(format!("label {}", label)));
        }
        let author = pull.author().to_string();
        if self.is_bot(&author, pull.user.is_bot()) {
            debug!("Skipping #{}: bot author {}", pr_id, author);
            return Ok(RecordOutcome::Skipped(format!("bot author {}", author)));
        }

        let reviews = host.get_reviews(pr_id)?;
        let mut reviewers: Vec<String> = Vec::new();
        for review in &reviews {
            let login = &review.user.login;
            if !self.policy.review_states.iter().any(|s| s == &review.state)
                || login == &author
                || self.is_bot(login, review.user.is_bot())
                || reviewers.contains(login)
            {
                continue;
            }
            reviewers.push(login.clone());
        }

        self.processed.insert(pr_id);
        self.authors.bump(&author);
        for reviewer in &reviewers {
            self.reviewers.bump(reviewer);
        }
        Ok(RecordOutcome::Counted)
    }

    /// Record every id in order, calling `progress(done, total, id)` before each.
    pub fn record_all<H, F>(&mut self, host: &mut H, ids: &[u64], mut progress: F) -> Result<()>
    where
        H: CodeHost + ?Sized,
        F: FnMut(usize, usize, u64),
    {
        for (i, id) in ids.iter().enumerate() {
            progress(i + 1, ids.len(), *id);
            self.record(host, *id)?;
        }
        Ok(())
    }

    /// Number of distinct pull requests counted
    pub fn processed(&self) -> usize {
        self.processed.len()
    }

    pub fn sorted(&self) -> Contributions {
        Contributions {
            authors: self.authors.ranked(),
            reviewers: self.reviewers.ranked(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, PullRequest, Review};
    use crate::github::MockCodeHost;

    fn review(login: &str, state: &str) -> Review {
        Review {
            user: Account::new(login),
            state: state.to_string(),
        }
    }

    #[test]
    fn test_self_review_not_counted() {
        let mut host = MockCodeHost::new();
        host.add_pull(
            PullRequest::new(1, "x", "alice"),
            vec![Review::approved("alice"), Review::approved("bob")],
        );
        let mut counter = ContributionCounter::new(AttributionConfig::default());
        counter.record(&mut host, 1).unwrap();
        let sorted = counter.sorted();
        assert_eq!(sorted.authors.get("alice"), Some(1));
        assert_eq!(sorted.reviewers.get("bob"), Some(1));
        assert_eq!(sorted.reviewers.get("alice"), None);
    }

    #[test]
    fn test_repeated_reviews_count_once() {
        let mut host = MockCodeHost::new();
        host.add_pull(
            PullRequest::new(1, "x", "alice"),
            vec![
                review("bob", "COMMENTED"),
                Review::approved("bob"),
                Review::approved("bob"),
                review("carol", "CHANGES_REQUESTED"),
            ],
        );
        let mut counter = ContributionCounter::new(AttributionConfig::default());
        counter.record(&mut host, 1).unwrap();
        let sorted = counter.sorted();
        assert_eq!(sorted.reviewers, Ranking::from_pairs([("bob", 1)]));
    }

    #[test]
    fn test_authored_sum_matches_distinct_pulls() {
        let mut host = MockCodeHost::new();
        for (id, author) in [(1, "a"), (2, "b"), (3, "a"), (4, "c")] {
            host.add_pull(PullRequest::new(id, "x", author), vec![]);
        }
        let mut counter = ContributionCounter::new(AttributionConfig::default());
        counter
            .record_all(&mut host, &[1, 2, 3, 2, 4, 1], |_, _, _| {})
            .unwrap();
        let sorted = counter.sorted();
        assert_eq!(sorted.authors.total() as usize, counter.processed());
        assert_eq!(counter.processed(), 4);
    }

    #[test]
    fn test_ties_keep_first_appearance() {
        let mut host = MockCodeHost::new();
        for (id, author) in [(1, "zed"), (2, "amy"), (3, "bob"), (4, "bob")] {
            host.add_pull(PullRequest::new(id, "x", author), vec![]);
        }
        let mut counter = ContributionCounter::new(AttributionConfig::default());
        counter.record_all(&mut host, &[1, 2, 3, 4], |_, _, _| {}).unwrap();
        let handles: Vec<_> = counter.sorted().authors.handles().map(String::from).collect();
        assert_eq!(handles, vec!["bob", "zed", "amy"]);
    }

    #[test]
    fn test_missing_pull_is_lookup_error() {
        let mut host = MockCodeHost::new();
        let mut counter = ContributionCounter::new(AttributionConfig::default());
        let err = counter.record(&mut host, 99).unwrap_err();
        assert!(matches!(err, ReleaseNotesError::Lookup(_)));
    }

    #[test]
    fn test_bots_and_skip_labels() {
        let mut host = MockCodeHost::new();
        host.add_pull(PullRequest::new(1, "Bump deps", "dependabot[bot]"), vec![]);
        host.add_pull(
            PullRequest::new(2, "Skip me", "alice").with_labels(&["ignore-for-release"]),
            vec![],
        );
        host.add_pull(
            PullRequest::new(3, "Real", "alice"),
            vec![Review::approved("ci-bot"), Review::approved("bob")],
        );
        let policy = AttributionConfig {
            bots: vec!["dependabot[bot]".to_string(), "ci-bot".to_string()],
            skip_labels: vec!["ignore-for-release".to_string()],
            ..AttributionConfig::default()
        };
        let mut counter = ContributionCounter::new(policy);
        assert!(matches!(
            counter.record(&mut host, 1).unwrap(),
            RecordOutcome::Skipped(_)
        ));
        assert!(matches!(
            counter.record(&mut host, 2).unwrap(),
            RecordOutcome::Skipped(_)
        ));
        assert_eq!(counter.record(&mut host, 3).unwrap(), RecordOutcome::Counted);
        let sorted = counter.sorted();
        assert_eq!(sorted.authors, Ranking::from_pairs([("alice", 1)]));
        assert_eq!(sorted.reviewers, Ranking::from_pairs([("bob", 1)]));
    }

    #[test]
    fn test_progress_callback() {
        let mut host = MockCodeHost::new();
        host.add_pull(PullRequest::new(1, "x", "a"), vec![]);
        host.add_pull(PullRequest::new(2, "y", "b"), vec![]);
        let mut seen = Vec::new();
        let mut counter = ContributionCounter::new(AttributionConfig::default());
        counter
            .record_all(&mut host, &[1, 2], |done, total, id| seen.push((done, total, id)))
            .unwrap();
        assert_eq!(seen, vec![(1, 2, 1), (2, 2, 2)]);
    }
}
