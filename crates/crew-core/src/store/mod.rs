//! Filesystem-backed document store for crew coordination state
//!
//! The store is the only component that touches disk. All shared state is
//! plain JSON documents under a single root:
//!
//! ```text
//! <root>/teams/<team>/config.json         team document
//! <root>/teams/<team>/inboxes/<agent>.json per-agent message array
//! <root>/teams/<team>/health.json         derived health cache
//! <root>/tasks/<team>/<id>.json           one file per task
//! <root>/tasks/<team>/.lock               task lock marker
//! ```
//!
//! Writes go through a temp-file-plus-rename protocol so a reader never
//! observes a partial document, and read-modify-write sequences are
//! serialized through per-team advisory locks ([`DocumentStore::with_team_lock`]
//! and [`DocumentStore::with_task_lock`]). Locks are scoped to one team's
//! namespace; operations on different teams never contend.

pub mod lock;

use crate::error::{CrewError, Result};
use crate::home;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use lock::acquire_lock;

/// Lock acquisition retries (exponential backoff, see [`lock::acquire_lock`]).
const LOCK_MAX_RETRIES: u32 = 5;

/// Name of the lock marker file inside each locked namespace.
const LOCK_FILE_NAME: &str = ".lock";

/// Handle to the on-disk document set.
///
/// Cheap to clone conceptually (it only holds the root path); in-memory
/// values returned from reads are snapshots with no back-references.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Open a store rooted at an explicit directory (used by tests).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DocumentStore { root: root.into() }
    }

    /// Open the default store at `~/.crew` (honours `CREW_HOME`).
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(DocumentStore {
            root: home::default_store_root()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ── Path layout ───────────────────────────────────────────────────────

    pub fn teams_dir(&self) -> PathBuf {
        self.root.join("teams")
    }

    pub fn team_dir(&self, team: &str) -> PathBuf {
        self.teams_dir().join(team)
    }

    pub fn config_path(&self, team: &str) -> PathBuf {
        self.team_dir(team).join("config.json")
    }

    pub fn inboxes_dir(&self, team: &str) -> PathBuf {
        self.team_dir(team).join("inboxes")
    }

    pub fn inbox_path(&self, team: &str, agent: &str) -> PathBuf {
        self.inboxes_dir(team).join(format!("{agent}.json"))
    }

    pub fn health_path(&self, team: &str) -> PathBuf {
        self.team_dir(team).join("health.json")
    }

    pub fn tasks_root(&self) -> PathBuf {
        self.root.join("tasks")
    }

    pub fn team_tasks_dir(&self, team: &str) -> PathBuf {
        self.tasks_root().join(team)
    }

    pub fn task_path(&self, team: &str, task_id: &str) -> PathBuf {
        self.team_tasks_dir(team).join(format!("{task_id}.json"))
    }

    fn team_lock_path(&self, team: &str) -> PathBuf {
        self.team_dir(team).join(LOCK_FILE_NAME)
    }

    fn task_lock_path(&self, team: &str) -> PathBuf {
        self.team_tasks_dir(team).join(LOCK_FILE_NAME)
    }

    // ── Documents ─────────────────────────────────────────────────────────

    /// Read a JSON document, returning `None` when the file does not exist.
    pub fn read_document<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        let content = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CrewError::io(path, e)),
        };
        let value = serde_json::from_slice(&content).map_err(|e| CrewError::json(path, e))?;
        Ok(Some(value))
    }

    /// Atomically replace a JSON document.
    ///
    /// Serializes to `<file>.tmp` in the same directory, fsyncs, then
    /// renames over the target. If anything fails after the temp file was
    /// created, the temp file is removed before the error propagates.
    pub fn write_document<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CrewError::io(parent, e))?;
        }

        let content = serde_json::to_vec_pretty(value).map_err(|e| CrewError::json(path, e))?;
        let tmp_path = path.with_extension("tmp");

        let write_result = (|| -> Result<()> {
            let mut tmp_file =
                fs::File::create(&tmp_path).map_err(|e| CrewError::io(&tmp_path, e))?;
            tmp_file
                .write_all(&content)
                .map_err(|e| CrewError::io(&tmp_path, e))?;
            tmp_file
                .sync_all()
                .map_err(|e| CrewError::io(&tmp_path, e))?;
            fs::rename(&tmp_path, path).map_err(|e| CrewError::io(path, e))?;
            Ok(())
        })();

        if write_result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        write_result
    }

    // ── Transactions ──────────────────────────────────────────────────────

    /// Run `f` while holding the exclusive lock for one team's config and
    /// inbox namespace. The lock is held for exactly one logical operation.
    pub fn with_team_lock<R>(&self, team: &str, f: impl FnOnce() -> Result<R>) -> Result<R> {
        let lock_path = self.team_lock_path(team);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| CrewError::io(parent, e))?;
        }
        let _lock = acquire_lock(&lock_path, LOCK_MAX_RETRIES)?;
        f()
    }

    /// Run `f` while holding the exclusive lock for one team's task
    /// directory. Task ID assignment relies on this to stay race-free.
    pub fn with_task_lock<R>(&self, team: &str, f: impl FnOnce() -> Result<R>) -> Result<R> {
        let lock_path = self.task_lock_path(team);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| CrewError::io(parent, e))?;
        }
        let _lock = acquire_lock(&lock_path, LOCK_MAX_RETRIES)?;
        f()
    }
}
