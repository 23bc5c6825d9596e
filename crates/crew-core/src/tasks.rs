//! Task board: one JSON document per task under `tasks/<team>/`
//!
//! Task IDs are sequential decimal strings assigned under the per-team task
//! lock, so two concurrent creates can never mint the same ID. Updates are
//! read-modify-write under the same lock; deleting a task removes its file
//! rather than leaving a tombstone.

use crate::error::{CrewError, Result};
use crate::schema::{TaskItem, TaskStatus};
use crate::store::DocumentStore;
use std::fs;
use tracing::debug;

/// Partial update applied to a task. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub active_form: Option<String>,
    pub status: Option<TaskStatus>,
    pub owner: Option<String>,

    /// Task IDs to union into `blocks`
    pub add_blocks: Vec<String>,

    /// Task IDs to union into `blocked_by`
    pub add_blocked_by: Vec<String>,

    /// Keys merged into the task's metadata; a JSON null deletes the key
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Domain event produced by [`update_task`].
///
/// The board records what happened; delivering notifications (for example
/// an inbox message to the new owner) is the caller's concern.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// The task gained a new owner.
    OwnerAssigned { task_id: String, subject: String, owner: String },
}

/// Result of an update: the task's final state plus any events raised.
#[derive(Debug, Clone)]
pub struct TaskUpdateOutcome {
    pub task: TaskItem,
    pub events: Vec<TaskEvent>,
}

fn ensure_team(store: &DocumentStore, team: &str) -> Result<()> {
    if store.config_path(team).is_file() {
        Ok(())
    } else {
        Err(CrewError::team_not_found(team))
    }
}

/// Highest numeric task ID currently on disk, or 0 when the board is empty.
///
/// Callers must hold the task lock when using this to mint a new ID.
fn max_task_id(store: &DocumentStore, team: &str) -> Result<u64> {
    let dir = store.team_tasks_dir(team);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(CrewError::io(&dir, e)),
    };

    let mut max = 0u64;
    for entry in entries {
        let entry = entry.map_err(|e| CrewError::io(&dir, e))?;
        let name = entry.file_name();
        let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
            continue;
        };
        if let Ok(id) = stem.parse::<u64>() {
            max = max.max(id);
        }
    }
    Ok(max)
}

/// Create a task in `pending` state with the next sequential ID.
pub fn create_task(
    store: &DocumentStore,
    team: &str,
    subject: &str,
    description: &str,
    active_form: Option<&str>,
    metadata: serde_json::Map<String, serde_json::Value>,
) -> Result<TaskItem> {
    ensure_team(store, team)?;
    if subject.trim().is_empty() {
        return Err(CrewError::invalid_argument("task subject must not be empty"));
    }

    store.with_task_lock(team, || {
        let id = (max_task_id(store, team)? + 1).to_string();
        let task = TaskItem {
            id: id.clone(),
            subject: subject.to_string(),
            description: description.to_string(),
            active_form: active_form.map(|s| s.to_string()),
            status: TaskStatus::Pending,
            owner: None,
            blocks: Vec::new(),
            blocked_by: Vec::new(),
            metadata,
            unknown_fields: Default::default(),
        };
        store.write_document(&store.task_path(team, &id), &task)?;
        debug!(team, task_id = %id, "created task");
        Ok(task)
    })
}

/// Read a single task.
pub fn get_task(store: &DocumentStore, team: &str, task_id: &str) -> Result<TaskItem> {
    ensure_team(store, team)?;
    store
        .read_document(&store.task_path(team, task_id))?
        .ok_or_else(|| CrewError::task_not_found(task_id))
}

/// All of a team's tasks, sorted by numeric ID.
pub fn list_tasks(store: &DocumentStore, team: &str) -> Result<Vec<TaskItem>> {
    ensure_team(store, team)?;

    let dir = store.team_tasks_dir(team);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CrewError::io(&dir, e)),
    };

    let mut tasks = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CrewError::io(&dir, e))?;
        let path = entry.path();
        let is_task = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".json"))
            .is_some_and(|stem| stem.parse::<u64>().is_ok());
        if !is_task {
            continue;
        }
        if let Some(task) = store.read_document::<TaskItem>(&path)? {
            tasks.push(task);
        }
    }

    tasks.sort_by_key(|t| t.id.parse::<u64>().unwrap_or(u64::MAX));
    Ok(tasks)
}

/// Union `extra` into `target`, preserving first-seen order.
fn union_ids(target: &mut Vec<String>, extra: &[String]) {
    for id in extra {
        if !target.contains(id) {
            target.push(id.clone());
        }
    }
}

/// Apply a partial update to a task.
///
/// Status changes are checked against the transition table. Setting status
/// to `deleted` removes the task's file; the returned task reflects the
/// final (deleted) state. Assigning a new owner raises
/// [`TaskEvent::OwnerAssigned`], unless the same update also deletes the
/// task.
pub fn update_task(
    store: &DocumentStore,
    team: &str,
    task_id: &str,
    update: TaskUpdate,
) -> Result<TaskUpdateOutcome> {
    ensure_team(store, team)?;

    store.with_task_lock(team, || {
        let path = store.task_path(team, task_id);
        let mut task: TaskItem = store
            .read_document(&path)?
            .ok_or_else(|| CrewError::task_not_found(task_id))?;

        if let Some(new_status) = update.status {
            if !task.status.can_transition_to(new_status) {
                return Err(CrewError::InvalidTransition {
                    from: task.status.as_str().to_string(),
                    to: new_status.as_str().to_string(),
                });
            }
        }

        if let Some(subject) = update.subject {
            task.subject = subject;
        }
        if let Some(description) = update.description {
            task.description = description;
        }
        if let Some(active_form) = update.active_form {
            task.active_form = Some(active_form);
        }

        let mut events = Vec::new();
        if let Some(owner) = update.owner {
            if task.owner.as_deref() != Some(owner.as_str()) {
                events.push(TaskEvent::OwnerAssigned {
                    task_id: task.id.clone(),
                    subject: task.subject.clone(),
                    owner: owner.clone(),
                });
            }
            task.owner = Some(owner);
        }

        union_ids(&mut task.blocks, &update.add_blocks);
        union_ids(&mut task.blocked_by, &update.add_blocked_by);

        for (key, value) in update.metadata {
            if value.is_null() {
                task.metadata.remove(&key);
            } else {
                task.metadata.insert(key, value);
            }
        }

        if let Some(new_status) = update.status {
            task.status = new_status;
        }

        if task.status == TaskStatus::Deleted {
            fs::remove_file(&path).map_err(|e| CrewError::io(&path, e))?;
            debug!(team, task_id, "deleted task");
            // A deletion swallows any assignment raised by the same update.
            events.clear();
        } else {
            store.write_document(&path, &task)?;
        }

        Ok(TaskUpdateOutcome { task, events })
    })
}

/// Release every task owned by `agent`, returning the IDs that were
/// reset.
///
/// Used when a teammate leaves: each of their tasks reverts to pending
/// with the owner cleared, so work is never left stuck with a dead owner.
/// This is an administrative reset and ignores the transition table.
pub fn reset_owner_tasks(store: &DocumentStore, team: &str, agent: &str) -> Result<Vec<String>> {
    ensure_team(store, team)?;

    store.with_task_lock(team, || {
        let mut reset = Vec::new();
        let dir = store.team_tasks_dir(team);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(reset),
            Err(e) => return Err(CrewError::io(&dir, e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| CrewError::io(&dir, e))?;
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(mut task) = store.read_document::<TaskItem>(&path)? else {
                continue;
            };
            if task.owner.as_deref() != Some(agent) {
                continue;
            }
            task.owner = None;
            task.status = TaskStatus::Pending;
            store.write_document(&path, &task)?;
            reset.push(task.id);
        }

        reset.sort_by_key(|id| id.parse::<u64>().unwrap_or(u64::MAX));
        debug!(team, agent, count = reset.len(), "reset owned tasks");
        Ok(reset)
    })
}
