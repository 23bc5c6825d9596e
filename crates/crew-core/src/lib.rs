//! Core engine for file-based agent crew coordination
//!
//! Autonomous coding agents coordinate through plain JSON documents under
//! `~/.crew` (override with `CREW_HOME`): a team roster, per-agent message
//! inboxes, a task board, and a derived health cache. Any process that can
//! read and write the directory participates; there is no server.
//!
//! All schema types are designed to:
//! - Preserve unknown fields for forward compatibility
//! - Use proper serde configuration for camelCase ↔ snake_case
//! - Support round-trip serialization without data loss
//!
//! Cross-process safety comes from two mechanisms in [`store`]: atomic
//! temp-file-plus-rename writes, and per-team advisory locks around every
//! read-modify-write sequence.

pub mod clock;
pub mod error;
pub mod health;
pub mod home;
pub mod inbox;
pub mod logging;
pub mod schema;
pub mod store;
pub mod tasks;
pub mod teams;

pub use error::{CrewError, Result};
pub use schema::{
    AgentHealthStatus, Backend, HealthStatus, InboxMessage, Member, MessagePayload, TaskItem,
    TaskStatus, TeamConfig, TeammateMember,
};
pub use store::DocumentStore;
pub use tasks::{TaskEvent, TaskUpdate, TaskUpdateOutcome};
