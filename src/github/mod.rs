//! Code-host query surface
//!
//! [CodeHost] is everything the release engine asks of the code-hosting
//! service. [client::GitHubClient] answers through the REST API with every
//! response routed through a [crate::cache::ResponseCache];
//! [mock::MockCodeHost] answers from in-memory tables for tests.
//!
//! Methods take `&mut self` because a lookup may populate the cache.
//! "Not found" is an answer (`None` or empty), never an error; only transport
//! failures and other non-2xx responses surface as errors.

pub mod client;
pub mod mock;

pub use client::GitHubClient;
pub use mock::MockCodeHost;

use serde::{Deserialize, Serialize};

use crate::domain::{HostRelease, PullRequest, Review};
use crate::error::Result;

/// Identity fields the code host reports for an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl HostUser {
    pub fn is_bot(&self) -> bool {
        self.kind.as_deref() == Some("Bot")
    }
}

/// A team as listed for an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

pub trait CodeHost {
    /// Owner and repository name, for building links
    fn coordinates(&self) -> (&str, &str);

    fn get_pull(&mut self, id: u64) -> Result<Option<PullRequest>>;

    fn get_reviews(&mut self, id: u64) -> Result<Vec<Review>>;

    /// Merged pull requests that introduced `sha`, best match first
    fn get_pull_commit_association(&mut self, sha: &str) -> Result<Vec<u64>>;

    /// Most recently merged pull requests, optionally restricted to a base branch
    fn list_recent_merged_pulls(
        &mut self,
        base: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PullRequest>>;

    fn list_org_members(&mut self) -> Result<Vec<String>>;

    fn list_teams(&mut self) -> Result<Vec<TeamSummary>>;

    fn get_team_members(&mut self, slug: &str) -> Result<Vec<String>>;

    fn get_user(&mut self, login: &str) -> Result<Option<HostUser>>;

    fn list_releases(&mut self) -> Result<Vec<HostRelease>>;

    /// Raw bytes behind a download URL
    fn download(&mut self, url: &str) -> Result<Vec<u8>>;
}
