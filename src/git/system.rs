use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{ReleaseNotesError, Result};
use crate::git::Repository;

/// Repository backend that runs the system `git` executable
pub struct SystemGit {
    repo_path: PathBuf,
}

impl SystemGit {
    /// Open the repository containing `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let git = SystemGit {
            repo_path: path.as_ref().to_path_buf(),
        };
        git.run(&["rev-parse", "--git-dir"])?;
        Ok(git)
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_path)
            .args(args)
            .output()
            .map_err(|e| ReleaseNotesError::vcs(format!("failed to execute git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReleaseNotesError::vcs(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl Repository for SystemGit {
    fn log(&self, from_ref: &str, to_ref: &str, first_parent: bool) -> Result<Vec<u8>> {
        let span = format!("{}..{}", from_ref, to_ref);
        let mut args = vec!["log", "-z", "--reverse", "--format=%H%x00%s"];
        if first_parent {
            args.push("--first-parent");
        }
        args.push(&span);
        self.run(&args)
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        let stdout = self.run(&["merge-base", a, b])?;
        let base = String::from_utf8_lossy(&stdout).trim().to_string();
        if base.is_empty() {
            return Err(ReleaseNotesError::vcs(format!("no merge base for {} and {}", a, b)));
        }
        Ok(base)
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        let stdout = self.run(&["tag", "--list"])?;
        let mut tags: Vec<String> = String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        tags.sort();
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_outside_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        // Either git is missing or the directory is not a repository
        assert!(SystemGit::open(dir.path()).is_err());
    }
}
