use crate::domain::Commit;
use crate::error::{ReleaseNotesError, Result};
use crate::git::Repository;
use std::collections::HashMap;

/// Mock repository for testing without actual git operations
#[derive(Debug, Clone, Default)]
pub struct MockRepository {
    logs: HashMap<(String, String), Vec<Commit>>,
    merge_bases: HashMap<(String, String), String>,
    tags: Vec<String>,
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the commits (oldest first) of the range `from..to`
    pub fn add_log(&mut self, from: &str, to: &str, commits: Vec<Commit>) {
        self.logs.insert((from.to_string(), to.to_string()), commits);
    }

    /// Register the merge base of two refs, in either argument order
    pub fn set_merge_base(&mut self, a: &str, b: &str, base: &str) {
        self.merge_bases
            .insert((a.to_string(), b.to_string()), base.to_string());
        self.merge_bases
            .insert((b.to_string(), a.to_string()), base.to_string());
    }

    pub fn add_tag(&mut self, name: impl Into<String>) {
        self.tags.push(name.into());
    }
}

impl Repository for MockRepository {
    fn log(&self, from_ref: &str, to_ref: &str, _first_parent: bool) -> Result<Vec<u8>> {
        let commits = self
            .logs
            .get(&(from_ref.to_string(), to_ref.to_string()))
            .ok_or_else(|| {
                ReleaseNotesError::vcs(format!("unknown revision range {}..{}", from_ref, to_ref))
            })?;

        let mut raw = Vec::new();
        for commit in commits {
            raw.extend_from_slice(commit.hash.as_bytes());
            raw.push(0);
            raw.extend_from_slice(commit.subject.as_bytes());
            raw.push(0);
        }
        Ok(raw)
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        self.merge_bases
            .get(&(a.to_string(), b.to_string()))
            .cloned()
            .ok_or_else(|| ReleaseNotesError::vcs(format!("no merge base for {} and {}", a, b)))
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        let mut tags = self.tags.clone();
        tags.sort();
        Ok(tags)
    }
}
