//! Release bookkeeping for a git-hosted project.
//!
//! Reconciles the pull requests merged in a commit range, counts who authored
//! and reviewed them, sorts them into labelled categories, renders release
//! notes (Markdown or reStructuredText) and builds archive deposition
//! metadata.

pub mod archive;
pub mod attribution;
pub mod cache;
pub mod categorize;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod git;
pub mod github;
pub mod notes;
pub mod profile;
pub mod reconcile;
pub mod teams;
pub mod ui;
pub mod workflow;

pub use error::{CategorizationError, ReleaseNotesError, Result};
