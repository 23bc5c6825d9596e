//! Inbox message schema and structured protocol payloads

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Message in an agent's inbox.
///
/// Stored as an element of the JSON array at
/// `teams/{team_name}/inboxes/{agent_name}.json`. Messages are append-only;
/// the only in-place mutation is flipping `read` from false to true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxMessage {
    /// Sender agent name or "team-lead"
    pub from: String,

    /// Message content; structured payloads are serialized JSON carrying a
    /// `type` discriminator (see [`MessagePayload`])
    pub text: String,

    /// ISO 8601 UTC timestamp
    pub timestamp: String,

    /// Whether the recipient has read the message
    pub read: bool,

    /// Brief summary (5-10 words)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Sender's UI color, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Unknown fields for forward compatibility
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

/// Structured protocol payload carried in a message `text` field.
///
/// Serialized with a `type` discriminator so recipients can distinguish
/// protocol traffic from plain markdown messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePayload {
    #[serde(rename_all = "camelCase")]
    TaskAssignment {
        task_id: String,
        subject: String,
        assigned_by: String,
    },

    #[serde(rename_all = "camelCase")]
    ShutdownRequest {
        request_id: String,
        from: String,
        timestamp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    ShutdownApproved {
        request_id: String,
        from: String,
        timestamp: String,
        pane_id: String,
        backend_type: String,
    },

    #[serde(rename_all = "camelCase")]
    PlanApproval { approved: bool },
}

impl MessagePayload {
    /// Render the payload as message text.
    pub fn to_text(&self) -> String {
        // Payload variants contain no non-string keys; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Try to parse message text as a structured payload. Plain messages
    /// return None.
    pub fn parse(text: &str) -> Option<MessagePayload> {
        serde_json::from_str(text).ok()
    }
}
