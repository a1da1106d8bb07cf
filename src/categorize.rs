//! Bucketing pull requests into release-note categories by label.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::CategoryRule;
use crate::domain::PullRequest;
use crate::error::{CategorizationError, ReleaseNotesError, Result};
use crate::github::CodeHost;

/// The fields of a pull request that appear in release notes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullSummary {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub labels: BTreeSet<String>,
    pub merged_at: Option<DateTime<Utc>>,
    pub sha: Option<String>,
}

impl From<&PullRequest> for PullSummary {
    fn from(pull: &PullRequest) -> Self {
        PullSummary {
            id: pull.id,
            title: pull.title.clone(),
            author: pull.author().to_string(),
            labels: pull.labels.iter().map(|l| l.name.clone()).collect(),
            merged_at: pull.merged_at,
            sha: pull.short_sha().map(str::to_string),
        }
    }
}

/// A pull request tagged with exactly one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedPullRequest {
    pub category: String,
    pub pull: PullSummary,
}

/// One category with its pull requests, ordered by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySection<'a> {
    pub rule: &'a CategoryRule,
    pub pulls: Vec<&'a PullSummary>,
}

/// Pick the category for a pull request.
///
/// The first rule whose label is present wins, unless two or more matching
/// rules are exclusive.
pub fn categorize<'r>(
    rules: &'r [CategoryRule],
    pull: &PullRequest,
) -> std::result::Result<&'r CategoryRule, CategorizationError> {
    let matched: Vec<&CategoryRule> = rules.iter().filter(|r| pull.has_label(&r.label)).collect();

    let exclusive: Vec<String> = matched
        .iter()
        .filter(|r| r.exclusive)
        .map(|r| r.label.clone())
        .collect();
    if exclusive.len() > 1 {
        return Err(CategorizationError::AmbiguousLabels {
            id: pull.id,
            title: pull.title.clone(),
            categories: exclusive,
        });
    }

    matched.first().copied().ok_or_else(|| {
        let labels = pull.label_names();
        CategorizationError::MissingLabel {
            id: pull.id,
            title: pull.title.clone(),
            labels: if labels.is_empty() {
                "(no labels)".to_string()
            } else {
                labels.into_iter().collect::<Vec<_>>().join(", ")
            },
        }
    })
}

/// Accumulates categorized pull requests for one release
#[derive(Debug, Clone)]
pub struct PullSorter {
    rules: Vec<CategoryRule>,
    pulls: HashMap<String, Vec<PullSummary>>,
    rejected: Vec<CategorizationError>,
}

impl PullSorter {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        PullSorter {
            rules,
            pulls: HashMap::new(),
            rejected: Vec::new(),
        }
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Categorize an already-fetched pull request.
    ///
    /// A rejected pull request is remembered in [PullSorter::rejected] and
    /// left out of the sections.
    pub fn insert(
        &mut self,
        pull: &PullRequest,
    ) -> std::result::Result<String, CategorizationError> {
        let label = match categorize(&self.rules, pull) {
            Ok(rule) => rule.label.clone(),
            Err(e) => {
                self.rejected.push(e.clone());
                return Err(e);
            }
        };
        let bucket = self.pulls.entry(label.clone()).or_default();
        if !bucket.iter().any(|p| p.id == pull.id) {
            bucket.push(PullSummary::from(pull));
        }
        Ok(label)
    }

    /// Fetch and categorize one pull request by id.
    pub fn add<H: CodeHost + ?Sized>(&mut self, host: &mut H, pr_id: u64) -> Result<String> {
        let pull = host.get_pull(pr_id)?.ok_or_else(|| {
            ReleaseNotesError::lookup(format!("pull request #{} not found", pr_id))
        })?;
        Ok(self.insert(&pull)?)
    }

    /// Add every id, reporting categorization problems instead of stopping.
    ///
    /// Lookup and remote failures still abort.
    pub fn add_all<H: CodeHost + ?Sized>(
        &mut self,
        host: &mut H,
        ids: &[u64],
    ) -> Result<Vec<CategorizationError>> {
        let mut problems = Vec::new();
        for id in ids {
            match self.add(host, *id) {
                Ok(_) => {}
                Err(ReleaseNotesError::Categorization(e)) => {
                    warn!("{}", e);
                    problems.push(e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(problems)
    }

    pub fn rejected(&self) -> &[CategorizationError] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.pulls.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-empty categories in rule order, pull requests by ascending id
    pub fn sections(&self) -> Vec<CategorySection<'_>> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let bucket = self.pulls.get(&rule.label)?;
                if bucket.is_empty() {
                    return None;
                }
                let mut pulls: Vec<&PullSummary> = bucket.iter().collect();
                pulls.sort_by_key(|p| p.id);
                Some(CategorySection { rule, pulls })
            })
            .collect()
    }

    /// Flattened view, one entry per pull request
    pub fn categorized(&self) -> Vec<CategorizedPullRequest> {
        self.sections()
            .into_iter()
            .flat_map(|section| {
                let category = section.rule.label.clone();
                section.pulls.into_iter().map(move |p| CategorizedPullRequest {
                    category: category.clone(),
                    pull: p.clone(),
                })
            })
            .collect()
    }
}
