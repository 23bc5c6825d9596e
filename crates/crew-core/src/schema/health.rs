//! Health status schema and the persisted health side-table

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classified health of a spawned agent process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Process is running and (for terminal backends) producing output
    /// or within its startup grace period
    Alive,
    /// Pane or process no longer exists
    Dead,
    /// Alive but output unchanged past the hung threshold
    Hung,
    /// Instrumentation failure; the process may still be fine
    Unknown,
}

/// Result of one health check for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentHealthStatus {
    pub agent_name: String,

    /// Liveness handle that was probed (pane id or pid)
    pub pane_id: String,

    pub status: HealthStatus,

    /// Hash of the captured pane content, when one was captured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_content_hash: Option<String>,

    /// Human-readable explanation of the classification
    pub detail: String,
}

/// Per-agent record persisted between polls for hung detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentHealthRecord {
    /// Last observed content hash
    pub hash: String,

    /// Unix timestamp in milliseconds when the hash last changed
    pub last_change_time: u64,
}

/// The side-table at `teams/{team_name}/health.json`: agent name to record.
///
/// Purely derived cache data. Losing it is safe; the next poll rebuilds it.
/// Never authoritative for membership.
pub type HealthState = BTreeMap<String, AgentHealthRecord>;
