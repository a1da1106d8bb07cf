use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A code-host account as embedded in other records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl Account {
    pub fn new(login: impl Into<String>) -> Self {
        Account {
            login: login.into(),
            kind: Some("User".to_string()),
        }
    }

    pub fn is_bot(&self) -> bool {
        self.kind.as_deref() == Some("Bot")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

/// Pull request fields the release engine uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    #[serde(rename = "number")]
    pub id: u64,
    pub title: String,
    pub user: Account,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
}

impl PullRequest {
    pub fn new(id: u64, title: impl Into<String>, author: impl Into<String>) -> Self {
        PullRequest {
            id,
            title: title.into(),
            user: Account::new(author),
            labels: Vec::new(),
            merged_at: None,
            merge_commit_sha: None,
        }
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels
            .iter()
            .map(|name| Label {
                name: name.to_string(),
            })
            .collect();
        self
    }

    pub fn author(&self) -> &str {
        &self.user.login
    }

    pub fn label_names(&self) -> BTreeSet<&str> {
        self.labels.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.name == label)
    }

    pub fn short_sha(&self) -> Option<&str> {
        self.merge_commit_sha
            .as_deref()
            .map(|sha| if sha.len() > 8 { &sha[..8] } else { sha })
    }
}

/// A submitted review on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub user: Account,
    pub state: String,
}

impl Review {
    pub fn approved(login: impl Into<String>) -> Self {
        Review {
            user: Account::new(login),
            state: "APPROVED".to_string(),
        }
    }
}

/// A downloadable file attached to a code-host release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// A published (or draft) release on the code host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRelease {
    pub id: u64,
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
    #[serde(default)]
    pub tarball_url: Option<String>,
}

impl HostRelease {
    /// Whether this release is the one for `version` (without the `v` prefix)
    pub fn matches_version(&self, version: &str) -> bool {
        self.tag_name == format!("v{}", version)
            || self.name.as_deref() == Some(format!("Version {}", version).as_str())
    }

    /// Release body with Windows line endings folded
    pub fn body_text(&self) -> String {
        self.body.as_deref().unwrap_or("").replace("\r\n", "\n")
    }
}
