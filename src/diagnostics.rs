use std::fmt;

/// Non-fatal problems found while mapping commits onto pull requests.
/// The affected commit contributes nothing; the run continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationWarning {
    /// No pull request could be found for a commit subject
    UnmatchedSubject { hash: String, subject: String },
    /// The code host associates several merged pull requests with one commit
    AmbiguousAssociation {
        hash: String,
        pulls: Vec<u64>,
        chosen: u64,
    },
}

impl ReconciliationWarning {
    pub fn hash(&self) -> &str {
        match self {
            ReconciliationWarning::UnmatchedSubject { hash, .. } => hash,
            ReconciliationWarning::AmbiguousAssociation { hash, .. } => hash,
        }
    }
}

fn short(hash: &str) -> &str {
    if hash.len() > 8 {
        &hash[..8]
    } else {
        hash
    }
}

impl fmt::Display for ReconciliationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationWarning::UnmatchedSubject { hash, subject } => {
                write!(
                    f,
                    "Can't match log subject to PR: {} ({})",
                    subject,
                    short(hash)
                )
            }
            ReconciliationWarning::AmbiguousAssociation {
                hash,
                pulls,
                chosen,
            } => {
                let ids: Vec<String> = pulls.iter().map(|p| format!("#{}", p)).collect();
                write!(
                    f,
                    "Commit {} belongs to several pull requests ({}); using #{}",
                    short(hash),
                    ids.join(", "),
                    chosen
                )
            }
        }
    }
}
