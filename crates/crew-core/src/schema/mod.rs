//! Schema types for the crew file-based coordination API
//!
//! These structures map one-to-one onto the JSON documents under the store
//! root. Wire casing is camelCase; optional fields are omitted when absent
//! and deserialize to their default when missing (old documents stay
//! readable after new fields are added).

mod health;
mod member;
mod message;
mod task;
mod team;

pub use health::{AgentHealthRecord, AgentHealthStatus, HealthState, HealthStatus};
pub use member::{Backend, LeadMember, Member, TeammateMember, COLOR_PALETTE, TEAM_LEAD_NAME};
pub use message::{InboxMessage, MessagePayload};
pub use task::{TaskItem, TaskStatus};
pub use team::TeamConfig;
