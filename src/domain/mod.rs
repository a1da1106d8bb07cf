//! Domain types - plain values independent of git and the remote services

pub mod commit;
pub mod people;
pub mod pull;
pub mod release;

pub use commit::{normalize_subject, subject_pull, Commit};
pub use people::{format_user, sort_by_family_name, Team, UserProfile};
pub use pull::{Account, HostRelease, Label, PullRequest, ReleaseAsset, Review};
pub use release::{MergeBases, ReleaseMetadata};
