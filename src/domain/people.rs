use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Denormalized identity record for one code-host handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub handle: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
    #[serde(default)]
    pub orcid: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl UserProfile {
    pub fn new(handle: impl Into<String>, name: impl Into<String>) -> Self {
        UserProfile {
            handle: handle.into(),
            name: Some(name.into()),
            affiliation: None,
            orcid: None,
            email: None,
            bot: false,
        }
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn with_orcid(mut self, orcid: impl Into<String>) -> Self {
        self.orcid = Some(orcid.into());
        self
    }

    /// Display name, falling back to the handle
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.handle)
    }

    /// Last whitespace-separated word of the display name
    pub fn family_name(&self) -> &str {
        self.display_name()
            .split_whitespace()
            .last()
            .unwrap_or(&self.handle)
    }
}

/// "Given Family *(Affiliation)*"; a missing affiliation prints as `None`.
pub fn format_user(profile: &UserProfile) -> String {
    format!(
        "{} *({})*",
        profile.display_name(),
        profile.affiliation.as_deref().unwrap_or("None")
    )
}

/// Sorts profiles by family name, case-insensitively, keeping input order on ties.
pub fn sort_by_family_name(profiles: &mut [UserProfile]) {
    profiles.sort_by_key(|p| p.family_name().to_lowercase());
}

/// A named group of handles on the code host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub description: String,
    pub members: BTreeSet<String>,
}

impl Team {
    pub fn new<I, S>(description: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Team {
            description: description.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.members.contains(handle)
    }
}
