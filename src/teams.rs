//! Organization teams as listed by the code host.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::config::TeamRole;
use crate::domain::Team;
use crate::error::Result;
use crate::github::CodeHost;

/// Slug of the pseudo-team of organization members outside every named team
pub const AFFILIATES: &str = "affiliates";

/// Named teams keyed by slug, plus [AFFILIATES]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamDirectory {
    teams: BTreeMap<String, Team>,
}

impl TeamDirectory {
    pub fn from_teams(teams: impl IntoIterator<Item = (String, Team)>) -> Self {
        TeamDirectory {
            teams: teams.into_iter().collect(),
        }
    }

    /// Load every team and its members, then derive the affiliates.
    pub fn load<H: CodeHost + ?Sized>(host: &mut H) -> Result<Self> {
        let mut teams = BTreeMap::new();
        for summary in host.list_teams()? {
            let members = host.get_team_members(&summary.slug)?;
            debug!("Team {}: {} members", summary.slug, members.len());
            let description = summary
                .description
                .filter(|d| !d.is_empty())
                .or(summary.name)
                .unwrap_or_else(|| summary.slug.clone());
            teams.insert(summary.slug, Team::new(description, members));
        }

        let in_team: HashSet<&String> = teams.values().flat_map(|t| t.members.iter()).collect();
        let affiliates: Vec<String> = host
            .list_org_members()?
            .into_iter()
            .filter(|login| !in_team.contains(login))
            .collect();
        teams.insert(
            AFFILIATES.to_string(),
            Team::new("Organization members outside the named teams", affiliates),
        );
        Ok(TeamDirectory { teams })
    }

    pub fn get(&self, slug: &str) -> Option<&Team> {
        self.teams.get(slug)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Team)> {
        self.teams.iter().map(|(slug, team)| (slug.as_str(), team))
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Handles with their archive role, following the order of `roles`.
    ///
    /// A handle in several mapped teams keeps the first role; teams that do
    /// not exist are skipped.
    pub fn members_with_roles(&self, roles: &[TeamRole]) -> Vec<(String, String)> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for mapping in roles {
            let Some(team) = self.teams.get(&mapping.team) else {
                debug!("No team named {}", mapping.team);
                continue;
            };
            for member in &team.members {
                if seen.insert(member.clone()) {
                    result.push((member.clone(), mapping.role.clone()));
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_team_roles;
    use crate::github::MockCodeHost;

    fn host() -> MockCodeHost {
        let mut host = MockCodeHost::new();
        host.add_team("code-lead", "Code leads", &["sam"]);
        host.add_team("core", "Core developers", &["sam", "alice", "bob"]);
        for login in ["sam", "alice", "bob", "carol", "dan"] {
            host.add_org_member(login);
        }
        host
    }

    #[test]
    fn test_affiliates_are_members_outside_teams() {
        let directory = TeamDirectory::load(&mut host()).unwrap();
        let affiliates = directory.get(AFFILIATES).unwrap();
        let members: Vec<&str> = affiliates.members.iter().map(String::as_str).collect();
        assert_eq!(members, vec!["carol", "dan"]);
        assert_eq!(directory.len(), 3);
        assert_eq!(directory.get("core").unwrap().description, "Core developers");
    }

    #[test]
    fn test_first_role_wins() {
        let directory = TeamDirectory::load(&mut host()).unwrap();
        let roles = directory.members_with_roles(&default_team_roles());
        assert_eq!(
            roles,
            vec![
                ("sam".to_string(), "ProjectManager".to_string()),
                ("alice".to_string(), "ProjectMember".to_string()),
                ("bob".to_string(), "ProjectMember".to_string()),
            ]
        );
    }
}
