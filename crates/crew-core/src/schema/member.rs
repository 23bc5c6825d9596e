//! Team member schema: lead and teammate variants

use serde::{Deserialize, Serialize};

/// Reserved name of the coordinating member. Cannot be added or removed
/// as a teammate.
pub const TEAM_LEAD_NAME: &str = "team-lead";

/// Fixed palette cycled through when assigning teammate colors.
pub const COLOR_PALETTE: &[&str] = &[
    "blue", "green", "yellow", "purple", "orange", "pink", "cyan", "red",
];

/// Backend a teammate process runs under, with its liveness handle.
///
/// Terminal backends carry a pane id; the desktop backend carries an OS
/// process id. Tagged on the wire by `backendType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backendType")]
pub enum Backend {
    #[serde(rename = "tmux", rename_all = "camelCase")]
    Tmux { pane_id: String },

    #[serde(rename = "windows-terminal", rename_all = "camelCase")]
    WindowsTerminal { pane_id: String },

    #[serde(rename = "desktop", rename_all = "camelCase")]
    Desktop { process_id: u32 },
}

impl Backend {
    /// Stable tag string, as written to `backendType`.
    pub fn kind(&self) -> &'static str {
        match self {
            Backend::Tmux { .. } => "tmux",
            Backend::WindowsTerminal { .. } => "windows-terminal",
            Backend::Desktop { .. } => "desktop",
        }
    }

    /// The liveness handle rendered as a string (pane id or pid), used in
    /// health reports.
    pub fn handle(&self) -> String {
        match self {
            Backend::Tmux { pane_id } | Backend::WindowsTerminal { pane_id } => pane_id.clone(),
            Backend::Desktop { process_id } => process_id.to_string(),
        }
    }
}

/// The coordinating member. Exactly one per team, fixed identity
/// `team-lead@<team>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadMember {
    /// "team-lead@{team_name}"
    pub agent_id: String,

    /// Always "team-lead"
    pub name: String,

    /// Unix timestamp in milliseconds when the team was created
    pub joined_at: u64,
}

/// A spawned worker member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeammateMember {
    /// "{name}@{team_name}"
    pub agent_id: String,

    /// Unique within the team
    pub name: String,

    /// Capability type (e.g. "general-purpose")
    pub agent_type: String,

    /// Model identifier the worker was launched with
    pub model: String,

    /// Initial prompt delivered on spawn
    pub prompt: String,

    /// UI color, assigned round-robin from [`COLOR_PALETTE`]
    pub color: String,

    #[serde(default)]
    pub plan_mode_required: bool,

    /// Unix timestamp in milliseconds when the member joined
    pub joined_at: u64,

    /// Working directory of the worker process
    pub cwd: String,

    #[serde(default)]
    pub is_active: bool,

    /// Backend tag plus its liveness handle, flattened onto the member
    #[serde(flatten)]
    pub backend: Backend,
}

/// A roster entry: the lead or a teammate. Discriminated on the wire by
/// the `role` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum Member {
    #[serde(rename = "lead")]
    Lead(LeadMember),

    #[serde(rename = "teammate")]
    Teammate(TeammateMember),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Lead(m) => &m.name,
            Member::Teammate(m) => &m.name,
        }
    }

    pub fn agent_id(&self) -> &str {
        match self {
            Member::Lead(m) => &m.agent_id,
            Member::Teammate(m) => &m.agent_id,
        }
    }

    pub fn as_teammate(&self) -> Option<&TeammateMember> {
        match self {
            Member::Teammate(m) => Some(m),
            Member::Lead(_) => None,
        }
    }
}
