//! Task schema and status transition rules

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Task status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task created but not started
    Pending,
    /// Task currently being worked on
    InProgress,
    /// Task finished successfully
    Completed,
    /// Task removed (the on-disk document is deleted)
    Deleted,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Deleted => "deleted",
        }
    }

    /// Whether a direct transition to `to` is legal.
    ///
    /// Identity transitions are always allowed (idempotent updates).
    /// Completed tasks may be reopened to in_progress but never revert
    /// straight to pending; deleted is terminal.
    pub fn can_transition_to(self, to: TaskStatus) -> bool {
        if self == to {
            return true;
        }
        match self {
            TaskStatus::Pending => true,
            TaskStatus::InProgress => {
                matches!(to, TaskStatus::Completed | TaskStatus::Deleted)
            }
            TaskStatus::Completed => {
                matches!(to, TaskStatus::InProgress | TaskStatus::Deleted)
            }
            TaskStatus::Deleted => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task document, stored at `tasks/{team_name}/{id}.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    /// Sequential string ID ("1", "2", "3", ...), unique per team
    pub id: String,

    /// Brief imperative title
    pub subject: String,

    /// Detailed requirements and acceptance criteria
    pub description: String,

    /// Present-continuous form shown while in_progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_form: Option<String>,

    pub status: TaskStatus,

    /// Agent name assigned to this task (absent if unassigned)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Task IDs that depend on this task completing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<String>,

    /// Task IDs that must complete before this task can start
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_by: Vec<String>,

    /// Flat key-value pairs, merged on update
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// Unknown fields for forward compatibility
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}
