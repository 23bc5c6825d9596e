//! Agent health monitoring
//!
//! A health check has three layers: a [`LivenessProbe`] observes the
//! backend and yields a raw [`ProbeSignal`]; [`classify`] turns that signal
//! plus the previous poll's record into a [`HealthStatus`]; the
//! [`HealthMonitor`] wires both to the persisted side-table at
//! `teams/<team>/health.json` so hung detection survives across polls.
//!
//! Probe failures degrade to `dead` or `unknown` statuses. Nothing in this
//! module returns an error for a sick agent; errors are reserved for the
//! store itself.

pub mod process;
pub mod tmux;

use crate::clock::now_ms;
use crate::error::{CrewError, Result};
use crate::schema::{
    AgentHealthRecord, AgentHealthStatus, Backend, HealthState, HealthStatus, TeammateMember,
};
use crate::store::DocumentStore;
use crate::teams;
use std::time::Duration;
use tracing::{debug, warn};

pub use process::ProcessProbe;
pub use tmux::TmuxProbe;

/// Raw observation of one agent's backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeSignal {
    /// Process backend: the pid exists.
    ProcessAlive,
    /// Process backend: the pid is gone.
    ProcessGone,
    /// Terminal backend: the pane is missing or marked dead.
    PaneGone,
    /// Terminal backend: the pane exists but its content could not be read.
    CaptureFailed,
    /// Terminal backend: content captured, hashed.
    Content { hash: String },
}

/// Capability interface over backend liveness observation.
///
/// Production code uses [`SystemProbe`]; tests substitute deterministic
/// probes.
pub trait LivenessProbe {
    fn probe(&self, backend: &Backend) -> ProbeSignal;
}

/// Thresholds for the classifier.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Unchanged-output window after which a live agent counts as hung.
    pub hung_timeout: Duration,

    /// Window after joining during which an agent is always alive; agents
    /// need time to produce their first output.
    pub grace_period: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            hung_timeout: Duration::from_secs(120),
            grace_period: Duration::from_secs(60),
        }
    }
}

/// Classify one probe signal into a health status.
///
/// Pure function of its inputs; `now` and the previous record are explicit
/// so the state machine is testable without real time. Returns the status,
/// the content hash when one was observed, and a human-readable detail.
///
/// Hung requires all of: a previous record exists, its hash equals the
/// current one, and the recorded change time is at least `hung_timeout`
/// in the past. A first-ever capture can therefore never be hung, and
/// repeated capture failures stay `unknown` rather than escalating.
pub fn classify(
    signal: &ProbeSignal,
    joined_at: u64,
    prev: Option<&AgentHealthRecord>,
    now: u64,
    config: &HealthConfig,
) -> (HealthStatus, Option<String>, String) {
    match signal {
        ProbeSignal::ProcessAlive => {
            (HealthStatus::Alive, None, "Process is running".to_string())
        }
        ProbeSignal::ProcessGone => {
            (HealthStatus::Dead, None, "Process is not running".to_string())
        }
        ProbeSignal::PaneGone => (
            HealthStatus::Dead,
            None,
            "Pane is missing or dead".to_string(),
        ),
        ProbeSignal::CaptureFailed => (
            HealthStatus::Unknown,
            None,
            "Could not capture pane content".to_string(),
        ),
        ProbeSignal::Content { hash } => {
            let age = now.saturating_sub(joined_at);
            if age < config.grace_period.as_millis() as u64 {
                return (
                    HealthStatus::Alive,
                    Some(hash.clone()),
                    "Within startup grace period".to_string(),
                );
            }

            if let Some(record) = prev {
                let stalled = now.saturating_sub(record.last_change_time);
                if record.hash == *hash && stalled >= config.hung_timeout.as_millis() as u64 {
                    return (
                        HealthStatus::Hung,
                        Some(hash.clone()),
                        format!("No output change for {}s", stalled / 1000),
                    );
                }
            }

            (
                HealthStatus::Alive,
                Some(hash.clone()),
                "Pane content is changing".to_string(),
            )
        }
    }
}

/// Update the persisted record for one agent after a poll.
///
/// A changed hash (or the first hash ever seen) resets `lastChangeTime` to
/// now; an unchanged hash keeps the old change time so the stalled window
/// accumulates. Polls that produced no hash leave the record alone.
fn update_record(state: &mut HealthState, agent: &str, hash: Option<&str>, now: u64) {
    let Some(hash) = hash else { return };
    let changed = state.get(agent).is_none_or(|r| r.hash != hash);
    if changed {
        state.insert(
            agent.to_string(),
            AgentHealthRecord {
                hash: hash.to_string(),
                last_change_time: now,
            },
        );
    }
}

/// Polls teammates and maintains the health side-table.
pub struct HealthMonitor<P: LivenessProbe> {
    store: DocumentStore,
    probe: P,
    config: HealthConfig,
}

/// Monitor backed by the real system probes.
pub type SystemMonitor = HealthMonitor<SystemProbe>;

impl SystemMonitor {
    pub fn new(store: DocumentStore) -> Self {
        HealthMonitor::with_probe(store, SystemProbe::default(), HealthConfig::default())
    }
}

impl<P: LivenessProbe> HealthMonitor<P> {
    pub fn with_probe(store: DocumentStore, probe: P, config: HealthConfig) -> Self {
        HealthMonitor {
            store,
            probe,
            config,
        }
    }

    fn load_state(&self, team: &str) -> Result<HealthState> {
        Ok(self
            .store
            .read_document(&self.store.health_path(team))?
            .unwrap_or_default())
    }

    fn check_one(
        &self,
        teammate: &TeammateMember,
        signal: &ProbeSignal,
        state: &mut HealthState,
    ) -> AgentHealthStatus {
        let now = now_ms();
        let prev = state.get(&teammate.name).cloned();
        let (status, hash, detail) =
            classify(signal, teammate.joined_at, prev.as_ref(), now, &self.config);
        update_record(state, &teammate.name, hash.as_deref(), now);

        if status != HealthStatus::Alive {
            warn!(agent = %teammate.name, status = ?status, detail, "agent not healthy");
        }
        AgentHealthStatus {
            agent_name: teammate.name.clone(),
            pane_id: teammate.backend.handle(),
            status,
            last_content_hash: hash,
            detail,
        }
    }

    /// Check a single teammate by name.
    ///
    /// The probe runs before the team lock is taken; only the side-table
    /// read-classify-write is inside the critical section, so a slow
    /// external probe never stalls other writers.
    pub fn check_agent(&self, team: &str, agent: &str) -> Result<AgentHealthStatus> {
        let config = teams::read_config(&self.store, team)?;
        let teammate = config
            .find_teammate(agent)
            .ok_or_else(|| CrewError::agent_not_found(agent))?;

        let signal = self.probe.probe(&teammate.backend);
        self.store.with_team_lock(team, || {
            let mut state = self.load_state(team)?;
            let report = self.check_one(teammate, &signal, &mut state);
            self.store
                .write_document(&self.store.health_path(team), &state)?;
            Ok(report)
        })
    }

    /// Check every teammate on the roster, in roster order. All probes run
    /// first; the side-table is then updated and written once under the
    /// team lock.
    pub fn check_all_agents(&self, team: &str) -> Result<Vec<AgentHealthStatus>> {
        let config = teams::read_config(&self.store, team)?;
        let signals: Vec<(&TeammateMember, ProbeSignal)> = config
            .teammates()
            .map(|t| (t, self.probe.probe(&t.backend)))
            .collect();

        self.store.with_team_lock(team, || {
            let mut state = self.load_state(team)?;
            let reports: Vec<AgentHealthStatus> = signals
                .iter()
                .map(|(t, signal)| self.check_one(t, signal, &mut state))
                .collect();

            self.store
                .write_document(&self.store.health_path(team), &state)?;
            debug!(team, agents = reports.len(), "health sweep complete");
            Ok(reports)
        })
    }
}

/// Default probe: tmux for terminal panes, pid existence for desktop
/// processes.
#[derive(Debug, Default)]
pub struct SystemProbe {
    tmux: TmuxProbe,
    process: ProcessProbe,
}

impl LivenessProbe for SystemProbe {
    fn probe(&self, backend: &Backend) -> ProbeSignal {
        match backend {
            Backend::Tmux { pane_id } | Backend::WindowsTerminal { pane_id } => {
                self.tmux.probe_pane(pane_id)
            }
            Backend::Desktop { process_id } => self.process.probe_pid(*process_id),
        }
    }
}
