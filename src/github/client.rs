use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use tracing::{debug, info};

use super::{CodeHost, HostUser, TeamSummary};
use crate::cache::{Flush, ResponseCache};
use crate::domain::{HostRelease, PullRequest, Review};
use crate::error::{ReleaseNotesError, Result};

const PAGE_SIZE: usize = 100;
const SERVICE: &str = "github";

#[derive(Deserialize)]
struct Login {
    login: String,
}

/// Thin blocking HTTP layer; knows nothing about caching
struct Http {
    client: Client,
    api_url: String,
}

impl Http {
    fn new(api_url: &str, token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("git-release-notes"));
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ReleaseNotesError::config(format!("invalid token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder().default_headers(headers).build()?;
        Ok(Http {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.api_url, path)
        }
    }

    /// GET a JSON document; 404 and 422 map to `Null`
    fn get_json(&self, path: &str) -> Result<Value> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Ok(Value::Null);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ReleaseNotesError::remote(
                SERVICE,
                status.as_u16(),
                format!("GET {}: {}", path, body.trim()),
            ));
        }
        Ok(response.json()?)
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        info!("Downloading {}", url);
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReleaseNotesError::remote(
                SERVICE,
                status.as_u16(),
                format!("GET {}", url),
            ));
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// GitHub REST client whose every lookup goes through a [ResponseCache]
pub struct GitHubClient {
    http: Http,
    cache: ResponseCache,
    owner: String,
    repo: String,
}

impl GitHubClient {
    pub fn new(
        api_url: &str,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: Option<&str>,
        cache: ResponseCache,
    ) -> Result<Self> {
        Ok(GitHubClient {
            http: Http::new(api_url, token)?,
            cache,
            owner: owner.into(),
            repo: repo.into(),
        })
    }

    pub fn cache_mut(&mut self) -> &mut ResponseCache {
        &mut self.cache
    }

    /// Persist everything fetched so far
    pub fn flush(&mut self) -> Result<()> {
        self.cache.flush()
    }

    fn cached(&mut self, category: &str, path: &str) -> Result<Value> {
        let http = &self.http;
        self.cache
            .get_or_fetch(category, path, || http.get_json(path))
    }

    fn cached_as<T: DeserializeOwned>(&mut self, category: &str, path: &str) -> Result<Option<T>> {
        let value = self.cached(category, path)?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Walk a paginated listing until a short page or `limit` items
    fn paged<T: DeserializeOwned>(
        &mut self,
        category: &str,
        path: &str,
        limit: usize,
    ) -> Result<Vec<T>> {
        let sep = if path.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        for page in 1.. {
            let page_path = format!("{}{}per_page={}&page={}", path, sep, PAGE_SIZE, page);
            let batch: Vec<T> = self.cached_as(category, &page_path)?.unwrap_or_default();
            let short = batch.len() < PAGE_SIZE;
            items.extend(batch);
            if short || items.len() >= limit {
                break;
            }
        }
        items.truncate(limit);
        Ok(items)
    }

    fn repo_path(&self, rest: &str) -> String {
        format!("/repos/{}/{}{}", self.owner, self.repo, rest)
    }
}

impl Flush for GitHubClient {
    fn flush(&mut self) -> Result<()> {
        GitHubClient::flush(self)
    }
}

impl CodeHost for GitHubClient {
    fn coordinates(&self) -> (&str, &str) {
        (&self.owner, &self.repo)
    }

    fn get_pull(&mut self, id: u64) -> Result<Option<PullRequest>> {
        let path = self.repo_path(&format!("/pulls/{}", id));
        self.cached_as("pull", &path)
    }

    fn get_reviews(&mut self, id: u64) -> Result<Vec<Review>> {
        let path = self.repo_path(&format!("/pulls/{}/reviews", id));
        self.paged("reviews", &path, usize::MAX)
    }

    fn get_pull_commit_association(&mut self, sha: &str) -> Result<Vec<u64>> {
        let path = self.repo_path(&format!("/commits/{}/pulls", sha));
        let pulls: Vec<PullRequest> = self.cached_as("commit_pulls", &path)?.unwrap_or_default();

        let mut merged: Vec<&PullRequest> =
            pulls.iter().filter(|p| p.merged_at.is_some()).collect();
        // The PR whose merge commit is this exact commit explains it best
        merged.sort_by_key(|p| p.merge_commit_sha.as_deref() != Some(sha));
        Ok(merged.into_iter().map(|p| p.id).collect())
    }

    fn list_recent_merged_pulls(
        &mut self,
        base: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PullRequest>> {
        let mut path = self.repo_path("/pulls?state=closed&sort=updated&direction=desc");
        if let Some(base) = base {
            path.push_str(&format!("&base={}", base));
        }
        let pulls: Vec<PullRequest> = self.paged("pulls", &path, limit)?;
        Ok(pulls.into_iter().filter(|p| p.merged_at.is_some()).collect())
    }

    fn list_org_members(&mut self) -> Result<Vec<String>> {
        let path = format!("/orgs/{}/members", self.owner);
        let members: Vec<Login> = self.paged("org_members", &path, usize::MAX)?;
        Ok(members.into_iter().map(|m| m.login).collect())
    }

    fn list_teams(&mut self) -> Result<Vec<TeamSummary>> {
        let path = format!("/orgs/{}/teams", self.owner);
        self.paged("teams", &path, usize::MAX)
    }

    fn get_team_members(&mut self, slug: &str) -> Result<Vec<String>> {
        let path = format!("/orgs/{}/teams/{}/members", self.owner, slug);
        let members: Vec<Login> = self.paged("team", &path, usize::MAX)?;
        Ok(members.into_iter().map(|m| m.login).collect())
    }

    fn get_user(&mut self, login: &str) -> Result<Option<HostUser>> {
        self.cached_as("user", &format!("/users/{}", login))
    }

    fn list_releases(&mut self) -> Result<Vec<HostRelease>> {
        let path = self.repo_path("/releases");
        self.paged("releases", &path, usize::MAX)
    }

    fn download(&mut self, url: &str) -> Result<Vec<u8>> {
        if let Some(content) = self.cache.cached_file(url)? {
            return Ok(content);
        }
        let content = self.http.get_bytes(url)?;
        self.cache.store_file(url, &content, None)?;
        Ok(content)
    }
}
