use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReleaseNotesError, Result};

/// File name searched for in the working directory and the user config directory.
pub const CONFIG_FILE_NAME: &str = "release-notes.toml";

/// Represents the complete configuration for a release-notes run.
///
/// Everything the reconciler, sorter and renderers look up by name is injected
/// from here rather than read from ambient state.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryRule>,

    #[serde(default)]
    pub attribution: AttributionConfig,

    #[serde(default = "default_team_roles")]
    pub teams: Vec<TeamRole>,

    #[serde(default)]
    pub archive: ArchiveConfig,

    #[serde(default)]
    pub profiles: ProfileOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            github: GitHubConfig::default(),
            paths: PathsConfig::default(),
            reconcile: ReconcileConfig::default(),
            categories: default_categories(),
            attribution: AttributionConfig::default(),
            teams: default_team_roles(),
            archive: ArchiveConfig::default(),
            profiles: ProfileOverrides::default(),
        }
    }
}

fn default_owner() -> String {
    "celeritas-project".to_string()
}

fn default_repo() -> String {
    "celeritas".to_string()
}

fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

/// Code-host coordinates and credentials.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    #[serde(default = "default_owner")]
    pub owner: String,

    #[serde(default = "default_repo")]
    pub repo: String,

    #[serde(default = "default_github_token_env")]
    pub token_env: String,

    #[serde(default)]
    pub token_file: Option<PathBuf>,

    #[serde(default = "default_github_api_url")]
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            owner: default_owner(),
            repo: default_repo(),
            token_env: default_github_token_env(),
            token_file: None,
            api_url: default_github_api_url(),
        }
    }
}

impl GitHubConfig {
    /// Browsable URL of the repository
    pub fn repo_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

/// Locations of the persisted record files.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PathsConfig {
    #[serde(default)]
    pub cache_file: Option<PathBuf>,

    #[serde(default)]
    pub profiles_file: Option<PathBuf>,
}

impl PathsConfig {
    pub fn cache_file(&self, github: &GitHubConfig) -> PathBuf {
        self.cache_file.clone().unwrap_or_else(|| {
            PathBuf::from(format!("data/ghapicache-{}-{}.json", github.owner, github.repo))
        })
    }

    pub fn profiles_file(&self) -> PathBuf {
        self.profiles_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("data/users.json"))
    }
}

fn default_true() -> bool {
    true
}

fn default_recent_pulls() -> usize {
    300
}

fn default_ignored_subjects() -> Vec<String> {
    vec!["Format code base (clang-format)".to_string()]
}

/// Settings for mapping commits onto pull requests.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReconcileConfig {
    /// Only walk the first parent of merges, like `git log --first-parent`
    #[serde(default = "default_true")]
    pub first_parent: bool,

    /// Commit subjects that are known not to come from a pull request
    #[serde(default = "default_ignored_subjects")]
    pub ignored_subjects: Vec<String>,

    /// Subject to PR id overrides for commits the code host cannot explain
    #[serde(default)]
    pub pinned: HashMap<String, u64>,

    /// Number of recently merged pulls listed for subject matching
    #[serde(default = "default_recent_pulls")]
    pub recent_pulls: usize,

    /// Only list recently merged pulls targeting this branch
    #[serde(default)]
    pub pull_base: Option<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig {
            first_parent: true,
            ignored_subjects: default_ignored_subjects(),
            pinned: HashMap::new(),
            recent_pulls: default_recent_pulls(),
            pull_base: None,
        }
    }
}

/// One label to category rule; rules are tried in order.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub label: String,
    pub title: String,
    #[serde(default)]
    pub exclusive: bool,
}

impl CategoryRule {
    pub fn new(label: &str, title: &str, exclusive: bool) -> Self {
        CategoryRule {
            label: label.to_string(),
            title: title.to_string(),
            exclusive,
        }
    }
}

/// Returns the default ordered label to category rules.
pub fn default_categories() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("enhancement", "New features", true),
        CategoryRule::new("bug", "Bug fixes", true),
        CategoryRule::new("documentation", "Documentation improvements", false),
        CategoryRule::new("minor", "Minor internal changes", false),
        CategoryRule::new("removal", "Deprecation and removal", true),
    ]
}

fn default_review_states() -> Vec<String> {
    vec!["APPROVED".to_string()]
}

/// Inclusion and exclusion policy for contribution counting.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AttributionConfig {
    #[serde(default = "default_review_states")]
    pub review_states: Vec<String>,

    #[serde(default)]
    pub bots: Vec<String>,

    #[serde(default)]
    pub skip_labels: Vec<String>,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        AttributionConfig {
            review_states: default_review_states(),
            bots: Vec::new(),
            skip_labels: Vec::new(),
        }
    }
}

/// Archive role given to members of a code-host team.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TeamRole {
    pub team: String,
    pub role: String,
}

/// Returns the default team to archive-role mapping.
pub fn default_team_roles() -> Vec<TeamRole> {
    [
        ("code-lead", "ProjectManager"),
        ("core-advisor", "ProjectLeader"),
        ("core", "ProjectMember"),
    ]
    .into_iter()
    .map(|(team, role)| TeamRole {
        team: team.to_string(),
        role: role.to_string(),
    })
    .collect()
}

fn default_archive_api_url() -> String {
    "https://sandbox.zenodo.org/api".to_string()
}

fn default_archive_token_env() -> String {
    "ZENODO_TOKEN".to_string()
}

fn default_title() -> String {
    "{repo} {release}".to_string()
}

fn default_license() -> String {
    "apache2.0".to_string()
}

fn default_publisher() -> String {
    "Github".to_string()
}

fn default_languages() -> Vec<ProgrammingLanguage> {
    [("c++", "C++"), ("cuda", "CUDA"), ("python", "Python")]
        .into_iter()
        .map(|(id, title)| ProgrammingLanguage {
            id: id.to_string(),
            title: title.to_string(),
        })
        .collect()
}

/// Entry of the archive's `code:programmingLanguage` vocabulary.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProgrammingLanguage {
    pub id: String,
    pub title: String,
}

/// Archive registry endpoint and the static parts of every deposition.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ArchiveConfig {
    #[serde(default = "default_archive_api_url")]
    pub api_url: String,

    #[serde(default = "default_archive_token_env")]
    pub token_env: String,

    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// Title template; `{repo}` and `{release}` are substituted
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_license")]
    pub license: String,

    #[serde(default = "default_publisher")]
    pub publisher: String,

    /// Community identifier; the code-host owner when unset
    #[serde(default)]
    pub community: Option<String>,

    #[serde(default = "default_languages")]
    pub languages: Vec<ProgrammingLanguage>,

    /// Citation key prefix used by the RST series paragraph; the repo name when unset
    #[serde(default)]
    pub citation_prefix: Option<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        ArchiveConfig {
            api_url: default_archive_api_url(),
            token_env: default_archive_token_env(),
            token_file: None,
            title: default_title(),
            license: default_license(),
            publisher: default_publisher(),
            community: None,
            languages: default_languages(),
            citation_prefix: None,
        }
    }
}

impl ArchiveConfig {
    pub fn title_for(&self, repo: &str, release: &str) -> String {
        self.title
            .replace("{repo}", repo)
            .replace("{release}", release)
    }
}

/// Local identity fixups applied on top of what the code host reports.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProfileOverrides {
    #[serde(default)]
    pub names: HashMap<String, String>,

    #[serde(default)]
    pub affiliations: HashMap<String, String>,

    #[serde(default)]
    pub orcids: HashMap<String, String>,
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `release-notes.toml` in current directory
/// 3. `release-notes.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)?
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        fs::read_to_string(CONFIG_FILE_NAME)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    parse_config(&config_str)
}

/// Parses configuration from TOML text.
pub fn parse_config(text: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(text).map_err(|e| ReleaseNotesError::config(e.to_string()))?;
    Ok(config)
}

/// Resolves an API token from an environment variable, then a token file.
///
/// Returns `None` when neither is available; unauthenticated requests still
/// work against public endpoints, only with a lower rate limit.
pub fn resolve_token(env_var: &str, token_file: Option<&Path>) -> Option<String> {
    if let Ok(token) = std::env::var(env_var) {
        let token = token.trim().to_string();
        if !token.is_empty() {
            return Some(token);
        }
    }
    let path = token_file?;
    match fs::read_to_string(path) {
        Ok(contents) => Some(contents.trim().to_string()).filter(|t| !t.is_empty()),
        Err(e) => {
            tracing::warn!("Failed to load token from {}: {}", path.display(), e);
            None
        }
    }
}
