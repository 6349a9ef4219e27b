//! Component liveness registry.
//!
//! Tracks every known component, enforces the status state machine, and
//! runs the discovery and heartbeat sweeps as periodic background tasks.
//! Entries leave the registry only through explicit administrative removal
//! so a failed component stays visible for audit.

use crate::error::CoordinationError;
use crate::events::{StatusBus, StatusChange};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use shared_types::{ComponentId, ComponentInfo, ComponentStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Sweep configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Seconds between discovery scans of the socket directory.
    pub discovery_interval_seconds: u64,
    /// A live component with no heartbeat for this long is marked failed.
    pub heartbeat_timeout_seconds: u64,
    /// Directory scanned for per-component socket files.
    pub socket_dir: PathBuf,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            discovery_interval_seconds: 10,
            heartbeat_timeout_seconds: 30,
            socket_dir: PathBuf::from("/tmp/meshflow"),
        }
    }
}

impl RegistrySettings {
    /// Sweep cadence: half the timeout, at least one second, so a dead
    /// component is flagged within 1.5x the timeout.
    pub fn heartbeat_sweep_interval(&self) -> Duration {
        Duration::from_secs((self.heartbeat_timeout_seconds / 2).max(1))
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_seconds)
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_secs(self.discovery_interval_seconds.max(1))
    }
}

/// Whether the state machine allows `from -> to`.
///
/// `Stopped` and `Failed` components may re-enter `Starting` when they come
/// back (process restart); everything else follows
/// `Unknown -> Starting -> Running -> {Stopping -> Stopped, Failed}`.
fn transition_allowed(from: ComponentStatus, to: ComponentStatus) -> bool {
    use ComponentStatus::*;
    matches!(
        (from, to),
        (Unknown, Starting)
            | (Starting, Running)
            | (Starting, Failed)
            | (Running, Stopping)
            | (Running, Failed)
            | (Stopping, Stopped)
            | (Stopping, Failed)
            | (Stopped, Starting)
            | (Failed, Starting)
    )
}

/// Registry of known components and their liveness.
#[derive(Debug)]
pub struct ComponentRegistry {
    components: DashMap<ComponentId, ComponentInfo>,
    events: StatusBus,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            components: DashMap::new(),
            events: StatusBus::new(),
        }
    }

    /// The status event bus.
    pub fn events(&self) -> &StatusBus {
        &self.events
    }

    /// Admit a component (explicit registration or discovery) in
    /// `Starting` state, or restart one that had stopped or failed.
    ///
    /// Admitting an already-live component just refreshes its socket path
    /// and pid.
    pub fn register_component(
        &self,
        component_id: ComponentId,
        socket_path: PathBuf,
        pid: Option<u32>,
    ) -> Result<(), CoordinationError> {
        let mut fired = None;
        match self.components.entry(component_id) {
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(ComponentInfo::starting(component_id, socket_path, pid));
                fired = Some((ComponentStatus::Unknown, ComponentStatus::Starting));
            }
            dashmap::mapref::entry::Entry::Occupied(mut slot) => {
                let info = slot.get_mut();
                info.socket_path = socket_path;
                if pid.is_some() {
                    info.pid = pid;
                }
                if !info.status.is_live() {
                    let old = info.status;
                    if !transition_allowed(old, ComponentStatus::Starting) {
                        return Err(CoordinationError::InvalidTransition {
                            component: component_id,
                            from: old,
                            to: ComponentStatus::Starting,
                        });
                    }
                    info.status = ComponentStatus::Starting;
                    info.last_heartbeat = SystemTime::now();
                    fired = Some((old, ComponentStatus::Starting));
                }
            }
        }
        if let Some((old, new)) = fired {
            info!(component = %component_id, %old, %new, "component admitted");
            self.publish(component_id, old, new);
        }
        Ok(())
    }

    /// Move a component to `to`, firing exactly one event per transition.
    ///
    /// A no-op when the component is already in `to`.
    pub fn transition(
        &self,
        component_id: ComponentId,
        to: ComponentStatus,
    ) -> Result<(), CoordinationError> {
        let mut fired = None;
        {
            let mut entry = self
                .components
                .get_mut(&component_id)
                .ok_or(CoordinationError::PeerUnreachable(component_id))?;
            let old = entry.status;
            if old == to {
                return Ok(());
            }
            if !transition_allowed(old, to) {
                return Err(CoordinationError::InvalidTransition {
                    component: component_id,
                    from: old,
                    to,
                });
            }
            entry.status = to;
            fired = Some(old);
        }
        if let Some(old) = fired {
            debug!(component = %component_id, %old, new = %to, "status transition");
            self.publish(component_id, old, to);
        }
        Ok(())
    }

    /// Record a heartbeat: refresh the timestamp and promote a `Starting`
    /// component to `Running`.
    ///
    /// Returns `false` for a component the registry does not know.
    pub fn heartbeat(&self, component_id: ComponentId) -> bool {
        let promote = {
            let Some(mut entry) = self.components.get_mut(&component_id) else {
                return false;
            };
            entry.last_heartbeat = SystemTime::now();
            entry.status == ComponentStatus::Starting
        };
        if promote {
            // Promotion races are harmless: transition() is a no-op if
            // another heartbeat won.
            let _ = self.transition(component_id, ComponentStatus::Running);
        }
        true
    }

    /// Administratively forget a component. The only removal path.
    pub fn remove_component(&self, component_id: ComponentId) -> Option<ComponentInfo> {
        let removed = self.components.remove(&component_id).map(|(_, info)| info);
        if let Some(info) = &removed {
            info!(component = %component_id, status = %info.status, "component removed");
        }
        removed
    }

    /// Snapshot of every known component, ordered by role.
    pub fn components(&self) -> Vec<ComponentInfo> {
        let mut all: Vec<ComponentInfo> =
            self.components.iter().map(|entry| entry.value().clone()).collect();
        all.sort_by_key(|info| info.component_id);
        all
    }

    /// Snapshot truncated to `max` entries, plus the true total.
    pub fn components_capped(&self, max: usize) -> (Vec<ComponentInfo>, usize) {
        let mut all = self.components();
        let total = all.len();
        all.truncate(max);
        (all, total)
    }

    /// Look up one component.
    pub fn get(&self, component_id: ComponentId) -> Option<ComponentInfo> {
        self.components.get(&component_id).map(|entry| entry.clone())
    }

    /// Number of known components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of components currently in `Failed`.
    pub fn failed_count(&self) -> usize {
        self.components
            .iter()
            .filter(|entry| entry.status == ComponentStatus::Failed)
            .count()
    }

    fn publish(&self, component_id: ComponentId, old: ComponentStatus, new: ComponentStatus) {
        self.events.publish(StatusChange {
            component_id,
            old,
            new,
            at: SystemTime::now(),
        });
    }

    /// One heartbeat sweep: every live component whose heartbeat is older
    /// than `timeout` moves to `Failed` exactly once.
    pub fn heartbeat_sweep(&self, timeout: Duration) {
        let now = SystemTime::now();
        let stale: Vec<ComponentId> = self
            .components
            .iter()
            .filter(|entry| {
                entry.status.is_live()
                    && now
                        .duration_since(entry.last_heartbeat)
                        .map_or(false, |age| age >= timeout)
            })
            .map(|entry| entry.component_id)
            .collect();

        for component_id in stale {
            warn!(component = %component_id, "heartbeat timeout");
            // is_live() filtering plus the transition guard make the
            // Failed event fire at most once per incident.
            let _ = self.transition(component_id, ComponentStatus::Failed);
        }
    }

    /// One discovery sweep: admit every `<role>.sock` file in `socket_dir`
    /// belonging to a component the registry has not seen.
    pub fn discovery_sweep(&self, socket_dir: &Path, own_socket: Option<&Path>) {
        let entries = match std::fs::read_dir(socket_dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = %socket_dir.display(), %err, "discovery scan skipped");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if own_socket.is_some_and(|own| own == path) {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some("sock") {
                continue;
            }
            let Some(role) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(ComponentId::from_name)
            else {
                continue;
            };
            if !self.components.contains_key(&role) {
                debug!(component = %role, path = %path.display(), "discovered socket");
                let _ = self.register_component(role, path, None);
            }
        }
    }

    /// Spawn the discovery and heartbeat sweeps; both stop when `shutdown`
    /// flips to true.
    pub fn spawn_sweeps(
        self: &Arc<Self>,
        settings: RegistrySettings,
        shutdown: watch::Receiver<bool>,
        own_socket: PathBuf,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        {
            let registry = Arc::clone(self);
            let settings = settings.clone();
            let mut shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                let mut tick = tokio::time::interval(settings.discovery_interval());
                loop {
                    tokio::select! {
                        _ = tick.tick() => {
                            registry.discovery_sweep(&settings.socket_dir, Some(&own_socket));
                        }
                        _ = shutdown.changed() => {
                            debug!("discovery sweep stopping");
                            break;
                        }
                    }
                }
            }));
        }

        {
            let registry = Arc::clone(self);
            let timeout = settings.heartbeat_timeout();
            let mut shutdown = shutdown;
            handles.push(tokio::spawn(async move {
                let mut tick = tokio::time::interval(settings.heartbeat_sweep_interval());
                loop {
                    tokio::select! {
                        _ = tick.tick() => registry.heartbeat_sweep(timeout),
                        _ = shutdown.changed() => {
                            debug!("heartbeat sweep stopping");
                            break;
                        }
                    }
                }
            }));
        }

        handles
    }
}
