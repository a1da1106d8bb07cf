//! Version-control abstraction layer
//!
//! The release engine only needs three things from the local repository:
//! a null-separated commit log between two refs, merge bases, and the tag
//! list. [Repository] captures that surface so the reconciler can be driven
//! by any of:
//!
//! - [system::SystemGit]: shells out to the `git` executable
//! - [repository::Git2Repository]: in-process implementation using `git2`
//! - [mock::MockRepository]: canned answers for tests
//!
//! [range::CommitRangeResolver] turns the raw log into [crate::domain::Commit]s.

pub mod mock;
pub mod range;
pub mod repository;
pub mod system;

pub use mock::MockRepository;
pub use range::{parse_log, CommitRangeResolver, FIELD_SEPARATOR};
pub use repository::Git2Repository;
pub use system::SystemGit;

use crate::error::Result;

/// Common version-control operations used by the release engine
///
/// ## Error Handling
///
/// Every failure of the underlying tool (unknown ref, not a repository) maps to
/// [crate::error::ReleaseNotesError::Vcs] and is fatal to the caller.
pub trait Repository {
    /// Raw log of commits reachable from `to_ref` but not from `from_ref`.
    ///
    /// Each commit is emitted as `<hash>\0<subject>\0`, oldest commit first.
    /// When `first_parent` is set only the first parent of merges is followed.
    ///
    /// # Example
    /// ```rust
    /// # use git_release_notes::git::{MockRepository, Repository};
    /// # use git_release_notes::domain::Commit;
    /// let mut repo = MockRepository::new();
    /// repo.add_log("v1.0.0", "main", vec![Commit::new("abc", "Fix (#2)")]);
    /// let raw = repo.log("v1.0.0", "main", true).unwrap();
    /// assert_eq!(raw, b"abc\0Fix (#2)\0");
    /// ```
    fn log(&self, from_ref: &str, to_ref: &str, first_parent: bool) -> Result<Vec<u8>>;

    /// Best common ancestor of two refs, as a full hash
    fn merge_base(&self, a: &str, b: &str) -> Result<String>;

    /// All tag names, sorted
    fn list_tags(&self) -> Result<Vec<String>>;
}
