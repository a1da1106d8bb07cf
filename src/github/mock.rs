use std::collections::HashMap;

use super::{CodeHost, HostUser, TeamSummary};
use crate::domain::{HostRelease, PullRequest, Review};
use crate::error::{ReleaseNotesError, Result};

/// In-memory code host for tests
#[derive(Debug, Clone, Default)]
pub struct MockCodeHost {
    pulls: HashMap<u64, PullRequest>,
    reviews: HashMap<u64, Vec<Review>>,
    associations: HashMap<String, Vec<u64>>,
    recent: Vec<u64>,
    org_members: Vec<String>,
    teams: Vec<(TeamSummary, Vec<String>)>,
    users: HashMap<String, HostUser>,
    releases: Vec<HostRelease>,
    downloads: HashMap<String, Vec<u8>>,
    /// Number of remote lookups answered, per method name
    pub calls: HashMap<&'static str, usize>,
}

impl MockCodeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pull(&mut self, pull: PullRequest, reviews: Vec<Review>) {
        self.reviews.insert(pull.id, reviews);
        self.pulls.insert(pull.id, pull);
    }

    pub fn associate(&mut self, sha: &str, pull: u64) {
        self.associations
            .entry(sha.to_string())
            .or_default()
            .push(pull);
    }

    /// Mark a registered pull as recently merged (listed newest last)
    pub fn add_recent(&mut self, pull: u64) {
        self.recent.push(pull);
    }

    pub fn add_org_member(&mut self, login: &str) {
        self.org_members.push(login.to_string());
    }

    pub fn add_team(&mut self, slug: &str, description: &str, members: &[&str]) {
        self.teams.push((
            TeamSummary {
                slug: slug.to_string(),
                name: Some(slug.to_string()),
                description: Some(description.to_string()),
            },
            members.iter().map(|m| m.to_string()).collect(),
        ));
    }

    pub fn add_user(&mut self, login: &str, name: Option<&str>) {
        self.users.insert(
            login.to_string(),
            HostUser {
                login: login.to_string(),
                name: name.map(str::to_string),
                email: None,
                kind: Some("User".to_string()),
            },
        );
    }

    pub fn add_release(&mut self, release: HostRelease) {
        self.releases.push(release);
    }

    pub fn add_download(&mut self, url: &str, content: &[u8]) {
        self.downloads.insert(url.to_string(), content.to_vec());
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.get(method).copied().unwrap_or(0)
    }

    fn count(&mut self, method: &'static str) {
        *self.calls.entry(method).or_default() += 1;
    }
}

impl CodeHost for MockCodeHost {
    fn coordinates(&self) -> (&str, &str) {
        ("org", "proj")
    }

    fn get_pull(&mut self, id: u64) -> Result<Option<PullRequest>> {
        self.count("get_pull");
        Ok(self.pulls.get(&id).cloned())
    }

    fn get_reviews(&mut self, id: u64) -> Result<Vec<Review>> {
        self.count("get_reviews");
        Ok(self.reviews.get(&id).cloned().unwrap_or_default())
    }

    fn get_pull_commit_association(&mut self, sha: &str) -> Result<Vec<u64>> {
        self.count("get_pull_commit_association");
        Ok(self.associations.get(sha).cloned().unwrap_or_default())
    }

    fn list_recent_merged_pulls(
        &mut self,
        _base: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PullRequest>> {
        self.count("list_recent_merged_pulls");
        Ok(self
            .recent
            .iter()
            .rev()
            .filter_map(|id| self.pulls.get(id).cloned())
            .take(limit)
            .collect())
    }

    fn list_org_members(&mut self) -> Result<Vec<String>> {
        self.count("list_org_members");
        Ok(self.org_members.clone())
    }

    fn list_teams(&mut self) -> Result<Vec<TeamSummary>> {
        self.count("list_teams");
        Ok(self.teams.iter().map(|(t, _)| t.clone()).collect())
    }

    fn get_team_members(&mut self, slug: &str) -> Result<Vec<String>> {
        self.count("get_team_members");
        Ok(self
            .teams
            .iter()
            .find(|(t, _)| t.slug == slug)
            .map(|(_, members)| members.clone())
            .unwrap_or_default())
    }

    fn get_user(&mut self, login: &str) -> Result<Option<HostUser>> {
        self.count("get_user");
        Ok(self.users.get(login).cloned())
    }

    fn list_releases(&mut self) -> Result<Vec<HostRelease>> {
        self.count("list_releases");
        Ok(self.releases.clone())
    }

    fn download(&mut self, url: &str) -> Result<Vec<u8>> {
        self.count("download");
        self.downloads
            .get(url)
            .cloned()
            .ok_or_else(|| ReleaseNotesError::remote("mock", 404, format!("GET {}", url)))
    }
}
