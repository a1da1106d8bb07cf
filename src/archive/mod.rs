//! Archive registry: deposition metadata and the idempotent publishing step.
//!
//! [ArchiveRegistry] is the surface the publishing step needs from the
//! registry. [zenodo::ZenodoClient] talks to the Zenodo REST API and
//! [mock::MockRegistry] keeps depositions in memory for tests.

pub mod html;
pub mod metadata;
pub mod mock;
pub mod zenodo;

pub use metadata::{ArchiveMetadataBuilder, DepositionMetadata, Person, EDITOR_ROLE};
pub use mock::MockRegistry;
pub use zenodo::ZenodoClient;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use tracing::info;

use crate::error::{ReleaseNotesError, Result};

/// A deposition as returned by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposition {
    pub id: u64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub links: BTreeMap<String, Value>,
    #[serde(default)]
    pub files: Vec<DepositionFile>,
}

impl Deposition {
    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").and_then(Value::as_str)
    }

    pub fn link(&self, name: &str) -> Option<&str> {
        self.links.get(name).and_then(Value::as_str)
    }

    /// The named link, or a [ReleaseNotesError::Schema] naming what is missing
    pub fn require_link(&self, name: &str) -> Result<&str> {
        self.link(name).ok_or_else(|| {
            ReleaseNotesError::schema(format!("deposition {} has no '{}' link", self.id, name))
        })
    }

    pub fn is_draft(&self) -> bool {
        self.state == "unsubmitted" || self.state == "draft" || self.state == "inprogress"
    }

    pub fn html_url(&self) -> &str {
        self.link("html").unwrap_or("")
    }
}

/// A file attached to a deposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositionFile {
    #[serde(alias = "key")]
    pub filename: String,
    #[serde(default)]
    pub links: BTreeMap<String, Value>,
}

impl DepositionFile {
    pub fn link(&self, name: &str) -> Option<&str> {
        self.links.get(name).and_then(Value::as_str)
    }
}

pub trait ArchiveRegistry {
    /// Exact title match among search results
    fn find_deposition(&mut self, title: &str) -> Result<Option<Deposition>>;

    fn create_deposition(&mut self, metadata: &DepositionMetadata) -> Result<Deposition>;

    fn get_deposition(&mut self, id: u64) -> Result<Deposition>;

    /// Draft of a new version; `None` if `deposition` is itself still a draft
    fn create_new_version(&mut self, deposition: &Deposition) -> Result<Option<Deposition>>;

    fn update(&mut self, deposition: &Deposition, metadata: &DepositionMetadata)
        -> Result<Deposition>;

    fn upload(&mut self, deposition: &Deposition, content: &[u8], name: &str) -> Result<Value>;

    fn get_files(&mut self, deposition: &Deposition) -> Result<Vec<DepositionFile>>;

    fn delete_file(&mut self, file: &DepositionFile) -> Result<()>;
}

/// How [publish_deposition] obtained the deposition it updated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishAction {
    Created,
    NewVersion,
    UpdatedDraft,
    /// A published deposition with this title exists; nothing was changed
    AlreadyPublished,
}

#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub action: PublishAction,
    pub deposition: Deposition,
    pub uploaded: Option<String>,
}

/// A release artifact to attach
#[derive(Debug, Clone, Copy)]
pub struct Artifact<'a> {
    pub name: &'a str,
    pub content: &'a [u8],
}

/// Bring the deposition for `metadata.title` up to date.
///
/// Reuses an existing draft, otherwise starts a new version of the
/// `previous_title` deposition, otherwise creates a fresh one. Metadata is
/// overwritten and an artifact with the same file name is replaced, so
/// re-running after a partial failure converges on the same result.
pub fn publish_deposition<A: ArchiveRegistry + ?Sized>(
    registry: &mut A,
    metadata: &DepositionMetadata,
    previous_title: Option<&str>,
    artifact: Option<Artifact<'_>>,
) -> Result<PublishOutcome> {
    let (action, deposition) = match registry.find_deposition(&metadata.title)? {
        Some(existing) if !existing.is_draft() => {
            info!(
                "Deposition {} is already published: {}",
                existing.id,
                existing.html_url()
            );
            return Ok(PublishOutcome {
                action: PublishAction::AlreadyPublished,
                deposition: existing,
                uploaded: None,
            });
        }
        Some(draft) => (PublishAction::UpdatedDraft, draft),
        None => match previous_title {
            Some(previous) => match registry.find_deposition(previous)? {
                Some(prior) => {
                    let draft = registry.create_new_version(&prior)?.ok_or_else(|| {
                        ReleaseNotesError::lookup(format!(
                            "previous deposition {} ({}) is an unpublished draft",
                            prior.id, previous
                        ))
                    })?;
                    (PublishAction::NewVersion, draft)
                }
                None => (
                    PublishAction::Created,
                    registry.create_deposition(metadata)?,
                ),
            },
            None => (
                PublishAction::Created,
                registry.create_deposition(metadata)?,
            ),
        },
    };

    let deposition = registry.update(&deposition, metadata)?;
    info!("Updated deposition {}: {}", deposition.id, metadata.title);

    let mut uploaded = None;
    if let Some(artifact) = artifact {
        for file in registry.get_files(&deposition)? {
            if file.filename == artifact.name {
                info!("Replacing {} on deposition {}", file.filename, deposition.id);
                registry.delete_file(&file)?;
            }
        }
        registry.upload(&deposition, artifact.content, artifact.name)?;
        uploaded = Some(artifact.name.to_string());
    }

    Ok(PublishOutcome {
        action,
        deposition,
        uploaded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::metadata::{Community, CustomFields};

    fn metadata(title: &str) -> DepositionMetadata {
        DepositionMetadata {
            title: title.to_string(),
            upload_type: "software".to_string(),
            description: "<p>d</p>".to_string(),
            creators: vec![],
            contributors: vec![],
            version: Some("0.6.1".to_string()),
            imprint_publisher: "Github".to_string(),
            license: "apache2.0".to_string(),
            communities: vec![Community {
                identifier: "org".to_string(),
            }],
            custom: CustomFields {
                code_repository: "https://github.com/org/proj".to_string(),
                programming_language: vec![],
            },
            publication_date: None,
        }
    }

    #[test]
    fn test_creates_when_nothing_exists() {
        let mut registry = MockRegistry::new();
        let artifact = Artifact {
            name: "proj-0.6.1.tar.gz",
            content: b"tarball",
        };
        let outcome =
            publish_deposition(&mut registry, &metadata("proj 0.6.1"), None, Some(artifact))
                .unwrap();
        assert_eq!(outcome.action, PublishAction::Created);
        assert_eq!(outcome.deposition.title(), Some("proj 0.6.1"));
        assert_eq!(registry.files(outcome.deposition.id), vec!["proj-0.6.1.tar.gz"]);
    }

    #[test]
    fn test_rerun_reuses_draft_and_replaces_file() {
        let mut registry = MockRegistry::new();
        let md = metadata("proj 0.6.1");
        let artifact = Artifact {
            name: "proj-0.6.1.tar.gz",
            content: b"tarball",
        };
        let first = publish_deposition(&mut registry, &md, None, Some(artifact)).unwrap();
        let second = publish_deposition(&mut registry, &md, None, Some(artifact)).unwrap();
        assert_eq!(second.action, PublishAction::UpdatedDraft);
        assert_eq!(first.deposition.id, second.deposition.id);
        assert_eq!(registry.files(second.deposition.id).len(), 1);
        assert_eq!(registry.deposition_count(), 1);
    }

    #[test]
    fn test_new_version_of_previous_release() {
        let mut registry = MockRegistry::new();
        let prior = registry.insert_published(&metadata("proj 0.6.0"));
        let outcome = publish_deposition(
            &mut registry,
            &metadata("proj 0.6.1"),
            Some("proj 0.6.0"),
            None,
        )
        .unwrap();
        assert_eq!(outcome.action, PublishAction::NewVersion);
        assert_ne!(outcome.deposition.id, prior);
        assert_eq!(outcome.deposition.title(), Some("proj 0.6.1"));
    }

    #[test]
    fn test_published_release_is_left_alone() {
        let mut registry = MockRegistry::new();
        registry.insert_published(&metadata("proj 0.6.1"));
        let outcome =
            publish_deposition(&mut registry, &metadata("proj 0.6.1"), None, None).unwrap();
        assert_eq!(outcome.action, PublishAction::AlreadyPublished);
        assert_eq!(registry.call_count("update"), 0);
    }

    #[test]
    fn test_server_error_surfaces() {
        let mut registry = MockRegistry::new();
        registry.fail_next("create_deposition", 502);
        let err = publish_deposition(&mut registry, &metadata("proj 0.6.1"), None, None)
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_deposition_links() {
        let deposition: Deposition = serde_json::from_value(serde_json::json!({
            "id": 5,
            "state": "unsubmitted",
            "metadata": {"title": "t"},
            "links": {"bucket": "https://b/1", "html": "https://h/5"}
        }))
        .unwrap();
        assert!(deposition.is_draft());
        assert_eq!(deposition.require_link("bucket").unwrap(), "https://b/1");
        assert!(deposition.require_link("newversion").is_err());
    }
}
