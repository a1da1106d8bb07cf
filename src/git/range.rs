use tracing::debug;

use crate::domain::Commit;
use crate::error::{ReleaseNotesError, Result};
use crate::git::Repository;

/// Separator between fields and between records in the raw log
pub const FIELD_SEPARATOR: u8 = 0;

/// Produces the ordered commit list between two refs
pub struct CommitRangeResolver<'a, R: Repository + ?Sized> {
    repo: &'a R,
    first_parent: bool,
}

impl<'a, R: Repository + ?Sized> CommitRangeResolver<'a, R> {
    pub fn new(repo: &'a R, first_parent: bool) -> Self {
        CommitRangeResolver { repo, first_parent }
    }

    /// Commits reachable from `to_ref` but not `from_ref`, oldest first
    pub fn commits_between(&self, from_ref: &str, to_ref: &str) -> Result<Vec<Commit>> {
        let raw = self.repo.log(from_ref, to_ref, self.first_parent)?;
        let commits = parse_log(&raw)?;
        debug!("{}..{}: {} commits", from_ref, to_ref, commits.len());
        Ok(commits)
    }

    pub fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        self.repo.merge_base(a, b)
    }
}

/// Splits a null-separated `<hash>\0<subject>\0...` log into commits.
///
/// A trailing empty field left by the terminating separator is dropped.
pub fn parse_log(raw: &[u8]) -> Result<Vec<Commit>> {
    let mut fields: Vec<&[u8]> = raw.split(|b| *b == FIELD_SEPARATOR).collect();
    if fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    if fields.len() % 2 != 0 {
        return Err(ReleaseNotesError::vcs(format!(
            "malformed log output: {} fields is not a whole number of commits",
            fields.len()
        )));
    }

    fields
        .chunks(2)
        .map(|pair| {
            let hash = String::from_utf8_lossy(pair[0]).trim().to_string();
            if hash.is_empty() {
                return Err(ReleaseNotesError::vcs("malformed log output: empty hash"));
            }
            let subject = String::from_utf8_lossy(pair[1]).to_string();
            Ok(Commit::new(hash, subject))
        })
        .collect()
}
