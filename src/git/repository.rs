use crate::error::{ReleaseNotesError, Result};
use git2::{Oid, Repository as Git2Repo, Sort};
use std::path::Path;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)
            .map_err(|e| ReleaseNotesError::vcs(format!("not a git repository: {}", e)))?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    fn resolve(&self, refname: &str) -> Result<Oid> {
        let object = self
            .repo
            .revparse_single(refname)
            .map_err(|e| ReleaseNotesError::vcs(format!("unknown revision '{}': {}", refname, e)))?;
        let commit = object
            .peel_to_commit()
            .map_err(|e| ReleaseNotesError::vcs(format!("'{}' is not a commit: {}", refname, e)))?;
        Ok(commit.id())
    }
}

impl super::Repository for Git2Repository {
    fn log(&self, from_ref: &str, to_ref: &str, first_parent: bool) -> Result<Vec<u8>> {
        let from_oid = self.resolve(from_ref)?;
        let to_oid = self.resolve(to_ref)?;

        let walk_err = |e: git2::Error| {
            ReleaseNotesError::vcs(format!("cannot walk {}..{}: {}", from_ref, to_ref, e))
        };
        let mut revwalk = self.repo.revwalk().map_err(walk_err)?;
        revwalk
            .set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)
            .map_err(walk_err)?;
        if first_parent {
            revwalk.simplify_first_parent().map_err(walk_err)?;
        }
        revwalk.push(to_oid).map_err(walk_err)?;
        revwalk.hide(from_oid).map_err(walk_err)?;

        let mut raw = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result.map_err(walk_err)?;
            let commit = self.repo.find_commit(oid).map_err(|e| {
                ReleaseNotesError::vcs(format!("cannot read commit {}: {}", oid, e))
            })?;
            let subject = String::from_utf8_lossy(commit.summary_bytes().unwrap_or_default());

            raw.extend_from_slice(oid.to_string().as_bytes());
            raw.push(0);
            raw.extend_from_slice(subject.as_bytes());
            raw.push(0);
        }
        Ok(raw)
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        let a_oid = self.resolve(a)?;
        let b_oid = self.resolve(b)?;
        let base = self.repo.merge_base(a_oid, b_oid).map_err(|e| {
            ReleaseNotesError::vcs(format!("no merge base for {} and {}: {}", a, b, e))
        })?;
        Ok(base.to_string())
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        let tags = self.repo.tag_names(None)?;

        let mut names: Vec<String> = tags.iter().flatten().map(|s| s.to_string()).collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{parse_log, Repository};
    use git2::Signature;

    fn commit_file(repo: &Git2Repo, message: &str) -> Oid {
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let parents: Vec<git2::Commit> = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => Vec::new(),
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    #[test]
    fn test_log_between_tags() {
        let dir = tempfile::tempdir().unwrap();
        let raw_repo = Git2Repo::init(dir.path()).unwrap();
        let first = commit_file(&raw_repo, "Initial commit");
        let object = raw_repo.find_object(first, None).unwrap();
        raw_repo.tag_lightweight("v1.0.0", &object, false).unwrap();
        drop(object);
        commit_file(&raw_repo, "Add feature (#1)\n\nLong body");
        let head = commit_file(&raw_repo, "Fix bug (#2)");

        let repo = Git2Repository::from_git2(raw_repo);
        let commits = parse_log(&repo.log("v1.0.0", "HEAD", true).unwrap()).unwrap();
        let subjects: Vec<_> = commits.iter().map(|c| c.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Add feature (#1)", "Fix bug (#2)"]);
        assert_eq!(commits[1].hash, head.to_string());

        assert_eq!(repo.list_tags().unwrap(), vec!["v1.0.0"]);
        assert_eq!(repo.merge_base("v1.0.0", "HEAD").unwrap(), first.to_string());
    }

    #[test]
    fn test_non_utf8_subject_is_decoded_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let raw_repo = Git2Repo::init(dir.path()).unwrap();
        let parent = commit_file(&raw_repo, "Initial commit");
        let tree = raw_repo.find_commit(parent).unwrap().tree_id();

        let mut buffer = format!(
            "tree {}\nparent {}\nauthor Test <test@example.com> 0 +0000\n\
             committer Test <test@example.com> 0 +0000\n\n",
            tree, parent
        )
        .into_bytes();
        buffer.extend_from_slice(b"Caf\xe9 fix (#7)\n");
        let oid = raw_repo
            .odb()
            .unwrap()
            .write(git2::ObjectType::Commit, &buffer)
            .unwrap();

        let repo = Git2Repository::from_git2(raw_repo);
        let commits = parse_log(&repo.log(&parent.to_string(), &oid.to_string(), true).unwrap())
            .unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].subject, "Caf\u{fffd} fix (#7)");
        assert_eq!(commits[0].subject_pull(), Some(7));
    }

    #[test]
    fn test_unknown_ref() {
        let dir = tempfile::tempdir().unwrap();
        let raw_repo = Git2Repo::init(dir.path()).unwrap();
        commit_file(&raw_repo, "Initial commit");
        let repo = Git2Repository::from_git2(raw_repo);
        let err = repo.log("v9.9.9", "HEAD", true).unwrap_err();
        assert!(matches!(err, ReleaseNotesError::Vcs(_)));
    }
}
