use regex::Regex;
use std::sync::OnceLock;

fn squash_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\(#(\d+)\)\s*$").expect("valid regex"))
}

fn merge_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Merge pull request #(\d+)").expect("valid regex"))
}

/// One commit from the local log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Full commit hash
    pub hash: String,
    /// First line of the commit message
    pub subject: String,
    /// Pull request that introduced the commit, once resolved
    pub pull: Option<u64>,
}

impl Commit {
    pub fn new(hash: impl Into<String>, subject: impl Into<String>) -> Self {
        Commit {
            hash: hash.into(),
            subject: subject.into(),
            pull: None,
        }
    }

    pub fn short_hash(&self) -> &str {
        if self.hash.len() > 8 {
            &self.hash[..8]
        } else {
            &self.hash
        }
    }

    /// PR number named by the subject itself, without asking the code host.
    ///
    /// Supports formats:
    /// - `Some change (#123)` (squash merge)
    /// - `Merge pull request #123 from user/branch`
    pub fn subject_pull(&self) -> Option<u64> {
        subject_pull(&self.subject)
    }
}

/// PR number named by a commit subject, see [`Commit::subject_pull`]
pub fn subject_pull(subject: &str) -> Option<u64> {
    [squash_suffix(), merge_prefix()]
        .iter()
        .find_map(|re| re.captures(subject))
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Subject with any trailing `(#1234)` removed, for comparing against PR titles
pub fn normalize_subject(subject: &str) -> &str {
    match squash_suffix().find(subject) {
        Some(m) => subject[..m.start()].trim(),
        None => subject.trim(),
    }
}
