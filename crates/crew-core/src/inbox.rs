//! Per-agent inboxes: append-only JSON message arrays
//!
//! Each agent has one file at `teams/<team>/inboxes/<agent>.json` holding a
//! JSON array of messages. Appends and read-mark sweeps are serialized under
//! the team lock so concurrent senders never clobber each other.

use crate::clock::now_iso;
use crate::error::{CrewError, Result};
use crate::schema::{InboxMessage, MessagePayload, TeamConfig};
use crate::store::DocumentStore;
use crate::teams;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// Interval between polls in [`poll_inbox`].
const POLL_INTERVAL: Duration = Duration::from_millis(500);

fn load_config(store: &DocumentStore, team: &str) -> Result<TeamConfig> {
    teams::read_config(store, team)
}

fn sender_color(config: &TeamConfig, from: &str) -> Option<String> {
    config.find_teammate(from).map(|t| t.color.clone())
}

fn read_messages(store: &DocumentStore, team: &str, agent: &str) -> Result<Vec<InboxMessage>> {
    Ok(store
        .read_document(&store.inbox_path(team, agent))?
        .unwrap_or_default())
}

/// Create an empty inbox file for `agent` if none exists yet.
pub fn ensure_inbox(store: &DocumentStore, team: &str, agent: &str) -> Result<()> {
    store.with_team_lock(team, || {
        let path = store.inbox_path(team, agent);
        if !path.is_file() {
            store.write_document(&path, &Vec::<InboxMessage>::new())?;
        }
        Ok(())
    })
}

/// Append one message to an agent's inbox. The inbox file is created on
/// first delivery.
pub fn append_message(
    store: &DocumentStore,
    team: &str,
    agent: &str,
    message: InboxMessage,
) -> Result<()> {
    store.with_team_lock(team, || {
        let path = store.inbox_path(team, agent);
        let mut messages = read_messages(store, team, agent)?;
        messages.push(message);
        store.write_document(&path, &messages)
    })
}

/// Read an agent's inbox.
///
/// With `unread_only` set, only messages not yet marked read are returned.
/// With `mark_as_read` set, the returned messages are flipped to read in the
/// same locked operation, so two concurrent pollers never both see a message
/// as unread.
pub fn read_inbox(
    store: &DocumentStore,
    team: &str,
    agent: &str,
    unread_only: bool,
    mark_as_read: bool,
) -> Result<Vec<InboxMessage>> {
    store.with_team_lock(team, || {
        let mut messages = read_messages(store, team, agent)?;
        let selected: Vec<InboxMessage> = messages
            .iter()
            .filter(|m| !unread_only || !m.read)
            .cloned()
            .collect();

        if mark_as_read && messages.iter().any(|m| !m.read) {
            for message in &mut messages {
                if !unread_only || !message.read {
                    message.read = true;
                }
            }
            store.write_document(&store.inbox_path(team, agent), &messages)?;
        }

        Ok(selected)
    })
}

/// Send a plain text message from one team member to another.
///
/// The recipient must be on the roster. The sender's UI color is attached
/// when the sender is a teammate.
pub fn send_message(
    store: &DocumentStore,
    team: &str,
    from: &str,
    to: &str,
    text: &str,
    summary: Option<&str>,
) -> Result<()> {
    let config = load_config(store, team)?;
    if !config.has_member(to) {
        return Err(CrewError::agent_not_found(to));
    }

    let message = InboxMessage {
        from: from.to_string(),
        text: text.to_string(),
        timestamp: now_iso(),
        read: false,
        summary: summary.map(|s| s.to_string()),
        color: sender_color(&config, from),
        unknown_fields: Default::default(),
    };
    append_message(store, team, to, message)?;
    debug!(team, from, to, "delivered message");
    Ok(())
}

/// Send a structured protocol payload, serialized into the message text.
pub fn send_payload(
    store: &DocumentStore,
    team: &str,
    from: &str,
    to: &str,
    payload: &MessagePayload,
    summary: Option<&str>,
) -> Result<()> {
    send_message(store, team, from, to, &payload.to_text(), summary)
}

/// Notify an agent that a task was assigned to them.
pub fn send_task_assignment(
    store: &DocumentStore,
    team: &str,
    to: &str,
    task_id: &str,
    subject: &str,
    assigned_by: &str,
) -> Result<()> {
    let payload = MessagePayload::TaskAssignment {
        task_id: task_id.to_string(),
        subject: subject.to_string(),
        assigned_by: assigned_by.to_string(),
    };
    send_payload(
        store,
        team,
        assigned_by,
        to,
        &payload,
        Some(&format!("Assigned task {task_id}")),
    )
}

/// Ask `to` to approve shutting down. Returns the generated request ID so
/// the caller can match the eventual approval.
pub fn send_shutdown_request(
    store: &DocumentStore,
    team: &str,
    from: &str,
    to: &str,
    reason: Option<&str>,
) -> Result<String> {
    let request_id = Uuid::new_v4().to_string();
    let payload = MessagePayload::ShutdownRequest {
        request_id: request_id.clone(),
        from: from.to_string(),
        timestamp: now_iso(),
        reason: reason.map(|r| r.to_string()),
    };
    send_payload(
        store,
        team,
        from,
        to,
        &payload,
        Some("Shutdown approval requested"),
    )?;
    Ok(request_id)
}

/// Deliver a message to every member except the sender. Returns the number
/// of recipients.
pub fn broadcast(
    store: &DocumentStore,
    team: &str,
    from: &str,
    text: &str,
    summary: Option<&str>,
) -> Result<usize> {
    let config = load_config(store, team)?;
    let color = sender_color(&config, from);

    let mut delivered = 0;
    for member in &config.members {
        let name = member.name();
        if name == from {
            continue;
        }
        let message = InboxMessage {
            from: from.to_string(),
            text: text.to_string(),
            timestamp: now_iso(),
            read: false,
            summary: summary.map(|s| s.to_string()),
            color: color.clone(),
            unknown_fields: Default::default(),
        };
        append_message(store, team, name, message)?;
        delivered += 1;
    }
    debug!(team, from, delivered, "broadcast message");
    Ok(delivered)
}

/// Block until the agent has unread messages or the deadline passes.
///
/// Polls every 500ms, re-acquiring the team lock on each pass so senders
/// are never starved. Returned messages are marked read. An empty vec
/// means the deadline expired.
pub fn poll_inbox(
    store: &DocumentStore,
    team: &str,
    agent: &str,
    timeout: Duration,
) -> Result<Vec<InboxMessage>> {
    let deadline = Instant::now() + timeout;
    loop {
        let unread = read_inbox(store, team, agent, true, true)?;
        if !unread.is_empty() {
            return Ok(unread);
        }
        if Instant::now() >= deadline {
            return Ok(Vec::new());
        }
        thread::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())));
    }
}
