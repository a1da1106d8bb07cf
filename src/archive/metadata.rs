use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::html::markdown_to_html;
use crate::attribution::Contributions;
use crate::config::{ArchiveConfig, TeamRole};
use crate::domain::{HostRelease, ReleaseMetadata, UserProfile};
use crate::error::{ReleaseNotesError, Result};
use crate::profile::ProfileLookup;
use crate::teams::TeamDirectory;

/// Contributor role for people who reviewed code in this release
pub const EDITOR_ROLE: &str = "Editor";

/// A creator or contributor entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Code-host handle; not part of the registry schema
    #[serde(skip)]
    pub handle: String,
}

impl Person {
    /// Fails with [ReleaseNotesError::Schema] when the profile has no display name.
    pub fn from_profile(profile: &UserProfile, role: Option<&str>) -> Result<Self> {
        let name = profile
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                ReleaseNotesError::schema(format!("no display name for @{}", profile.handle))
            })?;
        Ok(Person {
            name: name.to_string(),
            affiliation: profile.affiliation.clone(),
            orcid: profile.orcid.clone(),
            role: role.map(str::to_string),
            handle: profile.handle.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedTitle {
    pub en: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub id: String,
    pub title: LocalizedTitle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFields {
    #[serde(rename = "code:codeRepository")]
    pub code_repository: String,
    #[serde(rename = "code:programmingLanguage")]
    pub programming_language: Vec<LanguageEntry>,
}

/// Deposition metadata in the archive registry's schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositionMetadata {
    pub title: String,
    pub upload_type: String,
    pub description: String,
    pub creators: Vec<Person>,
    pub contributors: Vec<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub imprint_publisher: String,
    pub license: String,
    pub communities: Vec<Community>,
    pub custom: CustomFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
}

/// Assembles [DepositionMetadata] from contribution rankings and team roles
pub struct ArchiveMetadataBuilder<'a> {
    config: &'a ArchiveConfig,
    team_roles: &'a [TeamRole],
    teams: &'a TeamDirectory,
    owner: String,
    repo: String,
}

impl<'a> ArchiveMetadataBuilder<'a> {
    pub fn new(
        config: &'a ArchiveConfig,
        team_roles: &'a [TeamRole],
        teams: &'a TeamDirectory,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        ArchiveMetadataBuilder {
            config,
            team_roles,
            teams,
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Build the deposition record for one release.
    ///
    /// The description is `body` followed by `notes` (both Markdown); when
    /// both are empty the code-host release body is used instead.
    pub fn build(
        &self,
        contributions: &Contributions,
        release: &ReleaseMetadata,
        remote_release: Option<&HostRelease>,
        body: &str,
        notes: &str,
        profiles: &mut dyn ProfileLookup,
    ) -> Result<DepositionMetadata> {
        let version = release.require_release()?;

        // Authors are listed once, as creators; contributors skip them
        let mut seen = HashSet::new();
        let mut creators = Vec::with_capacity(contributions.authors.len());
        for handle in contributions.authors.handles() {
            seen.insert(handle.to_string());
            creators.push(Person::from_profile(&profiles.profile(handle)?, None)?);
        }

        let mut contributors = Vec::new();
        for handle in contributions.reviewers.handles() {
            if seen.insert(handle.to_string()) {
                contributors.push(Person::from_profile(
                    &profiles.profile(handle)?,
                    Some(EDITOR_ROLE),
                )?);
            }
        }
        for (handle, role) in self.teams.members_with_roles(self.team_roles) {
            if seen.insert(handle.clone()) {
                contributors.push(Person::from_profile(
                    &profiles.profile(&handle)?,
                    Some(&role),
                )?);
            }
        }

        let mut text: Vec<&str> = [body, notes]
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect();
        let release_body = remote_release.map(HostRelease::body_text).unwrap_or_default();
        if text.is_empty() && !release_body.trim().is_empty() {
            text.push(&release_body);
        }
        if text.is_empty() {
            return Err(ReleaseNotesError::schema(format!(
                "no description available for {}",
                version
            )));
        }

        let community = self
            .config
            .community
            .clone()
            .unwrap_or_else(|| self.owner.clone());

        Ok(DepositionMetadata {
            title: self.config.title_for(&self.repo, version),
            upload_type: "software".to_string(),
            description: markdown_to_html(&text.join("\n\n")),
            creators,
            contributors,
            version: Some(version.to_string()),
            imprint_publisher: self.config.publisher.clone(),
            license: self.config.license.clone(),
            communities: vec![Community {
                identifier: community,
            }],
            custom: CustomFields {
                code_repository: format!("https://github.com/{}/{}", self.owner, self.repo),
                programming_language: self
                    .config
                    .languages
                    .iter()
                    .map(|lang| LanguageEntry {
                        id: lang.id.clone(),
                        title: LocalizedTitle {
                            en: lang.title.clone(),
                        },
                    })
                    .collect(),
            },
            publication_date: remote_release
                .and_then(|r| r.published_at)
                .map(|date| date.date_naive().format("%Y-%m-%d").to_string()),
        })
    }
}
