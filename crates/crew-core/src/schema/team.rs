//! Team configuration schema

use super::member::{Member, TeammateMember};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Team document, stored at `teams/{team_name}/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamConfig {
    /// Team name (matches directory name)
    pub name: String,

    /// Human-readable team purpose
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Unix timestamp in milliseconds when the team was created
    pub created_at: u64,

    /// Lead agent ID (format: "team-lead@{team_name}")
    pub lead_agent_id: String,

    /// Session that created the team
    pub lead_session_id: String,

    /// Project root the team works in. Absent in documents written before
    /// this field existed; must deserialize to None, not an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_dir: Option<String>,

    /// Roster: the lead first, then teammates in join order
    pub members: Vec<Member>,

    /// Unknown fields for forward compatibility
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

impl TeamConfig {
    /// Iterate over teammate entries only.
    pub fn teammates(&self) -> impl Iterator<Item = &TeammateMember> {
        self.members.iter().filter_map(Member::as_teammate)
    }

    pub fn teammate_count(&self) -> usize {
        self.teammates().count()
    }

    pub fn find_teammate(&self, name: &str) -> Option<&TeammateMember> {
        self.teammates().find(|m| m.name == name)
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m.name() == name)
    }
}
