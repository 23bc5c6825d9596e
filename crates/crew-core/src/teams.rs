//! Team registry: CRUD over team configuration documents
//!
//! A team lives in two parallel namespaces: `teams/<name>/` for the config,
//! inboxes, and health cache, and `tasks/<name>/` for task documents. Both
//! are created together and deleted together.

use crate::clock::now_ms;
use crate::error::{CrewError, Result};
use crate::schema::{
    COLOR_PALETTE, LeadMember, Member, TEAM_LEAD_NAME, TeamConfig, TeammateMember,
};
use crate::store::DocumentStore;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const MAX_NAME_LEN: usize = 64;

/// Validate a team or agent name: letters, digits, hyphens, underscores,
/// at most 64 characters.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CrewError::invalid_argument("name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CrewError::invalid_argument(format!(
            "name too long ({} chars, max {MAX_NAME_LEN})",
            name.len()
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CrewError::invalid_argument(format!(
            "invalid name {name:?}: use only letters, numbers, hyphens, underscores"
        )));
    }
    Ok(())
}

/// Create a team and its task-storage namespace, with the lead as the only
/// member.
///
/// The team directory itself is the uniqueness arbiter: if it already
/// exists the call fails with `Conflict` and nothing is written.
pub fn create_team(
    store: &DocumentStore,
    name: &str,
    lead_session_id: &str,
    description: Option<&str>,
    project_dir: Option<&Path>,
) -> Result<TeamConfig> {
    validate_name(name)?;

    let team_dir = store.team_dir(name);
    if let Some(parent) = team_dir.parent() {
        fs::create_dir_all(parent).map_err(|e| CrewError::io(parent, e))?;
    }
    match fs::create_dir(&team_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(CrewError::Conflict {
                kind: "team",
                name: name.to_string(),
            });
        }
        Err(e) => return Err(CrewError::io(&team_dir, e)),
    }

    let tasks_dir = store.team_tasks_dir(name);
    fs::create_dir_all(&tasks_dir).map_err(|e| CrewError::io(&tasks_dir, e))?;
    let lock_marker = tasks_dir.join(".lock");
    fs::File::create(&lock_marker).map_err(|e| CrewError::io(&lock_marker, e))?;

    let created_at = now_ms();
    let config = TeamConfig {
        name: name.to_string(),
        description: description
            .filter(|d| !d.is_empty())
            .map(|d| d.to_string()),
        created_at,
        lead_agent_id: format!("{TEAM_LEAD_NAME}@{name}"),
        lead_session_id: lead_session_id.to_string(),
        project_dir: project_dir.map(|p| p.display().to_string()),
        members: vec![Member::Lead(LeadMember {
            agent_id: format!("{TEAM_LEAD_NAME}@{name}"),
            name: TEAM_LEAD_NAME.to_string(),
            joined_at: created_at,
        })],
        unknown_fields: Default::default(),
    };

    store.write_document(&store.config_path(name), &config)?;
    debug!(team = name, "created team");
    Ok(config)
}

/// Non-throwing existence probe.
pub fn team_exists(store: &DocumentStore, name: &str) -> bool {
    store.config_path(name).is_file()
}

/// Read a team's config. Documents written before optional fields existed
/// deserialize with those fields absent.
pub fn read_config(store: &DocumentStore, name: &str) -> Result<TeamConfig> {
    store
        .read_document(&store.config_path(name))?
        .ok_or_else(|| CrewError::team_not_found(name))
}

/// Full-document replace, serialized against other writers of this team.
pub fn write_config(store: &DocumentStore, name: &str, config: &TeamConfig) -> Result<()> {
    store.with_team_lock(name, || {
        store.write_document(&store.config_path(name), config)
    })
}

/// Append a teammate to the roster.
///
/// Fails `Conflict` if a member with that name already exists
/// (case-sensitive), `InvalidArgument` for the reserved lead name.
pub fn add_member(store: &DocumentStore, team: &str, member: TeammateMember) -> Result<()> {
    validate_name(&member.name)?;
    if member.name == TEAM_LEAD_NAME {
        return Err(CrewError::invalid_argument(format!(
            "agent name {TEAM_LEAD_NAME:?} is reserved"
        )));
    }

    store.with_team_lock(team, || {
        let mut config = read_config(store, team)?;
        if config.has_member(&member.name) {
            return Err(CrewError::Conflict {
                kind: "member",
                name: member.name.clone(),
            });
        }
        config.members.push(Member::Teammate(member));
        store.write_document(&store.config_path(team), &config)
    })
}

/// Remove a teammate from the roster.
///
/// Removing `team-lead` is always `InvalidArgument`. Task reset and
/// external-artifact cleanup are the caller's responsibility (see
/// [`crate::tasks::reset_owner_tasks`]).
pub fn remove_member(store: &DocumentStore, team: &str, agent_name: &str) -> Result<()> {
    if agent_name == TEAM_LEAD_NAME {
        return Err(CrewError::invalid_argument(format!(
            "cannot remove {TEAM_LEAD_NAME:?}"
        )));
    }

    store.with_team_lock(team, || {
        let mut config = read_config(store, team)?;
        if !config.has_member(agent_name) {
            return Err(CrewError::agent_not_found(agent_name));
        }
        config.members.retain(|m| m.name() != agent_name);
        store.write_document(&store.config_path(team), &config)
    })
}

/// Delete a team and both of its storage namespaces.
///
/// Fails `PreconditionFailed` while any teammate remains; only the lead
/// may still be on the roster.
pub fn delete_team(store: &DocumentStore, name: &str) -> Result<()> {
    let config = read_config(store, name)?;
    let remaining = config.teammate_count();
    if remaining > 0 {
        return Err(CrewError::PreconditionFailed {
            message: format!("team {name:?} still has {remaining} teammate(s); remove them first"),
        });
    }

    let team_dir = store.team_dir(name);
    fs::remove_dir_all(&team_dir).map_err(|e| CrewError::io(&team_dir, e))?;
    let tasks_dir = store.team_tasks_dir(name);
    if tasks_dir.exists() {
        fs::remove_dir_all(&tasks_dir).map_err(|e| CrewError::io(&tasks_dir, e))?;
    }
    debug!(team = name, "deleted team");
    Ok(())
}

/// The project directory recorded on the team, falling back to the current
/// working directory for teams created before the field existed.
pub fn get_project_dir(store: &DocumentStore, team: &str) -> Result<PathBuf> {
    let config = read_config(store, team)?;
    match config.project_dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => env::current_dir().map_err(|e| CrewError::io(Path::new("."), e)),
    }
}

/// Pick the next teammate color, round-robin over the palette by current
/// teammate count.
pub fn assign_color(store: &DocumentStore, team: &str) -> Result<String> {
    let config = read_config(store, team)?;
    let count = config.teammate_count();
    Ok(COLOR_PALETTE[count % COLOR_PALETTE.len()].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Backend;
    use tempfile::TempDir;

    fn make_teammate(name: &str, team: &str) -> TeammateMember {
        TeammateMember {
            agent_id: format!("{name}@{team}"),
            name: name.to_string(),
            agent_type: "general-purpose".to_string(),
            model: "default".to_string(),
            prompt: format!("You are {name}"),
            color: "blue".to_string(),
            plan_mode_required: false,
            joined_at: now_ms(),
            cwd: "/tmp".to_string(),
            is_active: true,
            backend: Backend::Tmux {
                pane_id: "%1".to_string(),
            },
        }
    }

    fn store() -> (TempDir, DocumentStore) {
        let temp = TempDir::new().unwrap();
        let store = DocumentStore::new(temp.path());
        (temp, store)
    }

    #[test]
    fn create_team_produces_both_namespaces() {
        let (temp, store) = store();
        create_team(&store, "alpha", "sess-1", None, None).unwrap();

        assert!(temp.path().join("teams/alpha/config.json").is_file());
        assert!(temp.path().join("tasks/alpha").is_dir());
        assert!(temp.path().join("tasks/alpha/.lock").exists());
        // Inboxes are created lazily.
        assert!(!temp.path().join("teams/alpha/inboxes").exists());
    }

    #[test]
    fn create_team_then_read_has_exactly_the_lead() {
        let (_temp, store) = store();
        create_team(&store, "beta", "sess-42", Some("test team"), None).unwrap();

        let config = read_config(&store, "beta").unwrap();
        assert_eq!(config.name, "beta");
        assert_eq!(config.description.as_deref(), Some("test team"));
        assert_eq!(config.lead_session_id, "sess-42");
        assert_eq!(config.lead_agent_id, "team-lead@beta");
        assert_eq!(config.members.len(), 1);
        assert_eq!(config.members[0].name(), "team-lead");
        assert_eq!(config.teammate_count(), 0);
    }

    #[test]
    fn create_team_twice_is_conflict_and_leaves_original_intact() {
        let (_temp, store) = store();
        create_team(&store, "dup", "sess-1", Some("original"), None).unwrap();

        let err = create_team(&store, "dup", "sess-2", Some("usurper"), None).unwrap_err();
        assert!(matches!(err, CrewError::Conflict { .. }));

        let config = read_config(&store, "dup").unwrap();
        assert_eq!(config.description.as_deref(), Some("original"));
        assert_eq!(config.lead_session_id, "sess-1");
    }

    #[test]
    fn create_team_rejects_invalid_names() {
        let (_temp, store) = store();
        for bad in ["has space", "has.dot", "has/slash", "has\\back", ""] {
            let err = create_team(&store, bad, "sess-x", None, None).unwrap_err();
            assert!(matches!(err, CrewError::InvalidArgument { .. }), "{bad:?}");
        }
    }

    #[test]
    fn name_length_boundary() {
        let (_temp, store) = store();
        let long = "a".repeat(65);
        let err = create_team(&store, &long, "sess-x", None, None).unwrap_err();
        assert!(err.to_string().contains("too long"));

        let max = "a".repeat(64);
        let config = create_team(&store, &max, "sess-x", None, None).unwrap();
        assert_eq!(config.name, max);
    }

    #[test]
    fn read_config_missing_team_is_not_found() {
        let (_temp, store) = store();
        let err = read_config(&store, "ghost").unwrap_err();
        assert!(matches!(err, CrewError::NotFound { .. }));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn read_config_tolerates_missing_project_dir() {
        let (temp, store) = store();
        let project = temp.path().join("proj");
        create_team(&store, "old-team", "sess-1", None, Some(&project)).unwrap();

        // Strip projectDir to simulate a document written before the field existed.
        let path = store.config_path("old-team");
        let mut raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        raw.as_object_mut().unwrap().remove("projectDir");
        fs::write(&path, serde_json::to_string(&raw).unwrap()).unwrap();

        let config = read_config(&store, "old-team").unwrap();
        assert!(config.project_dir.is_none());
    }

    #[test]
    fn project_dir_serialized_as_camel_case() {
        let (temp, store) = store();
        let project = temp.path().join("proj");
        create_team(&store, "pd", "sess-1", None, Some(&project)).unwrap();

        let raw: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(store.config_path("pd")).unwrap(),
        )
        .unwrap();
        assert_eq!(raw["projectDir"], project.display().to_string());
    }

    #[test]
    fn add_member_appends() {
        let (_temp, store) = store();
        create_team(&store, "squad", "sess-1", None, None).unwrap();
        add_member(&store, "squad", make_teammate("coder", "squad")).unwrap();

        let config = read_config(&store, "squad").unwrap();
        assert_eq!(config.members.len(), 2);
        assert_eq!(config.members[1].name(), "coder");
    }

    #[test]
    fn add_member_rejects_duplicate_name() {
        let (_temp, store) = store();
        create_team(&store, "dup", "sess-1", None, None).unwrap();
        add_member(&store, "dup", make_teammate("worker", "dup")).unwrap();

        let err = add_member(&store, "dup", make_teammate("worker", "dup")).unwrap_err();
        assert!(matches!(err, CrewError::Conflict { .. }));
        assert!(err.to_string().contains("worker"));
    }

    #[test]
    fn add_member_rejects_reserved_name() {
        let (_temp, store) = store();
        create_team(&store, "guarded", "sess-1", None, None).unwrap();
        let err = add_member(&store, "guarded", make_teammate("team-lead", "guarded")).unwrap_err();
        assert!(matches!(err, CrewError::InvalidArgument { .. }));
    }

    #[test]
    fn member_can_rejoin_after_removal() {
        let (_temp, store) = store();
        create_team(&store, "reuse", "sess-1", None, None).unwrap();
        add_member(&store, "reuse", make_teammate("worker", "reuse")).unwrap();
        remove_member(&store, "reuse", "worker").unwrap();
        add_member(&store, "reuse", make_teammate("worker", "reuse")).unwrap();

        let config = read_config(&store, "reuse").unwrap();
        assert!(config.has_member("worker"));
    }

    #[test]
    fn remove_member_filters_from_roster() {
        let (_temp, store) = store();
        create_team(&store, "squad2", "sess-1", None, None).unwrap();
        add_member(&store, "squad2", make_teammate("temp", "squad2")).unwrap();
        remove_member(&store, "squad2", "temp").unwrap();

        let config = read_config(&store, "squad2").unwrap();
        assert_eq!(config.members.len(), 1);
        assert_eq!(config.members[0].name(), "team-lead");
    }

    #[test]
    fn remove_team_lead_always_fails() {
        let (_temp, store) = store();
        create_team(&store, "guarded", "sess-1", None, None).unwrap();
        let err = remove_member(&store, "guarded", "team-lead").unwrap_err();
        assert!(matches!(err, CrewError::InvalidArgument { .. }));

        // Same answer even for a team that does not exist; the guard comes first.
        let err = remove_member(&store, "ghost", "team-lead").unwrap_err();
        assert!(matches!(err, CrewError::InvalidArgument { .. }));
    }

    #[test]
    fn remove_unknown_member_is_not_found() {
        let (_temp, store) = store();
        create_team(&store, "squad3", "sess-1", None, None).unwrap();
        let err = remove_member(&store, "squad3", "ghost").unwrap_err();
        assert!(matches!(err, CrewError::NotFound { .. }));
    }

    #[test]
    fn delete_team_removes_both_namespaces() {
        let (temp, store) = store();
        create_team(&store, "doomed", "sess-1", None, None).unwrap();
        delete_team(&store, "doomed").unwrap();

        assert!(!temp.path().join("teams/doomed").exists());
        assert!(!temp.path().join("tasks/doomed").exists());
    }

    #[test]
    fn delete_team_fails_with_teammates_present() {
        let (_temp, store) = store();
        create_team(&store, "busy", "sess-1", None, None).unwrap();
        add_member(&store, "busy", make_teammate("worker", "busy")).unwrap();

        let err = delete_team(&store, "busy").unwrap_err();
        assert!(matches!(err, CrewError::PreconditionFailed { .. }));
        assert!(team_exists(&store, "busy"));
    }

    #[test]
    fn team_exists_probe() {
        let (_temp, store) = store();
        assert!(!team_exists(&store, "ghost"));
        create_team(&store, "real", "sess-1", None, None).unwrap();
        assert!(team_exists(&store, "real"));
    }

    #[test]
    fn get_project_dir_returns_stored_value() {
        let (temp, store) = store();
        let project = temp.path().join("stored");
        create_team(&store, "gp", "sess-1", None, Some(&project)).unwrap();
        assert_eq!(get_project_dir(&store, "gp").unwrap(), project);
    }

    #[test]
    fn assign_color_cycles_through_palette() {
        let (_temp, store) = store();
        create_team(&store, "rainbow", "sess-1", None, None).unwrap();

        assert_eq!(assign_color(&store, "rainbow").unwrap(), COLOR_PALETTE[0]);

        for i in 0..COLOR_PALETTE.len() {
            let mut teammate = make_teammate(&format!("agent-{i}"), "rainbow");
            teammate.color = COLOR_PALETTE[i % COLOR_PALETTE.len()].to_string();
            add_member(&store, "rainbow", teammate).unwrap();
        }
        // Full cycle wraps back to the first color.
        assert_eq!(assign_color(&store, "rainbow").unwrap(), COLOR_PALETTE[0]);
    }

    #[test]
    fn concurrent_add_member_distinct_names_both_land() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let (_temp, store) = store();
        create_team(&store, "race", "sess-1", None, None).unwrap();

        let store = Arc::new(store);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = ["alice", "bob"]
            .into_iter()
            .map(|name| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    add_member(&store, "race", make_teammate(name, "race"))
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let config = read_config(&store, "race").unwrap();
        assert!(config.has_member("alice"));
        assert!(config.has_member("bob"));
        assert_eq!(config.members.len(), 3);
    }

    #[test]
    fn concurrent_add_member_same_name_one_wins() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let (_temp, store) = store();
        create_team(&store, "race2", "sess-1", None, None).unwrap();

        let store = Arc::new(store);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    add_member(&store, "race2", make_teammate("clone", "race2"))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(CrewError::Conflict { .. })))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);

        let config = read_config(&store, "race2").unwrap();
        assert_eq!(config.members.len(), 2);
    }
}
