//! # MeshFlow Runtime
//!
//! The owned hub handle tying the registry, coordination, and telemetry
//! crates together behind one lifecycle.
//!
//! ## Lifecycle
//!
//! ```ignore
//! let hub = MeshHub::new()?;                  // construct (owns everything)
//! hub.start().await?;                         // bind socket, spawn sweeps
//! hub.register_flow(b"k1", ComponentId::Transport, FlowType::DataTransfer, 128, 5)?;
//! assert!(hub.lookup(b"k1")?.is_some());
//! hub.stop().await?;                          // bounded cooperative shutdown
//! ```
//!
//! Dropping a running hub performs best-effort teardown; `stop()` is the
//! explicit, awaited path.

pub mod config;
pub mod error;

pub use config::HubConfig;
pub use error::HubError;

use meshflow_coordination::{
    CallbackSubscription, ComponentRegistry, CoordinationServer, StatusChange, StatusSubscription,
};
use meshflow_registry::LookupEngine;
use meshflow_telemetry::MetricsCollector;
use serde::Serialize;
use shared_types::{ComponentId, ComponentInfo, FlowRecord, FlowType, PerformanceStats};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Aggregate health signal. Reports, never remediates.
#[derive(Clone, Debug, Serialize)]
pub struct HealthReport {
    /// Overall pass/fail.
    pub healthy: bool,
    /// The exact matcher is reachable.
    pub matcher_ok: bool,
    /// The coordination socket is accepting connections.
    pub server_listening: bool,
    /// Components known to the registry.
    pub components_total: usize,
    /// Components currently in `Failed`.
    pub components_failed: usize,
}

/// The coordination hub: an owned handle over the whole subsystem stack.
pub struct MeshHub {
    config: HubConfig,
    metrics: Arc<MetricsCollector>,
    engine: Arc<LookupEngine>,
    registry: Arc<ComponentRegistry>,
    server: Arc<CoordinationServer>,
    running: AtomicBool,
    sweep_shutdown: watch::Sender<bool>,
    sweep_handles: Mutex<Vec<JoinHandle<()>>>,
    last_error: Mutex<Option<String>>,
}

impl MeshHub {
    /// Construct a hub with default configuration.
    pub fn new() -> Result<Self, HubError> {
        Self::with_config(HubConfig::default())
    }

    /// Construct a hub from `config`, validating every bound up front.
    pub fn with_config(config: HubConfig) -> Result<Self, HubError> {
        let metrics = Arc::new(MetricsCollector::new());
        let engine = Arc::new(LookupEngine::new(&config.registry, Arc::clone(&metrics))?);
        let registry = Arc::new(ComponentRegistry::new());
        let server = Arc::new(CoordinationServer::new(
            config.server.clone(),
            Arc::clone(&engine),
            Arc::clone(&registry),
            Arc::clone(&metrics),
        ));
        let (sweep_shutdown, _) = watch::channel(false);

        Ok(Self {
            config,
            metrics,
            engine,
            registry,
            server,
            running: AtomicBool::new(false),
            sweep_shutdown,
            sweep_handles: Mutex::new(Vec::new()),
            last_error: Mutex::new(None),
        })
    }

    /// Record a failure for `last_error()` and pass it through.
    fn remember<T>(&self, result: Result<T, HubError>) -> Result<T, HubError> {
        if let Err(err) = &result {
            *self
                .last_error
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(err.to_string());
        }
        result
    }

    /// Bind the coordination socket and start the background sweeps.
    pub async fn start(&self) -> Result<(), HubError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return self.remember(Err(HubError::AlreadyRunning));
        }

        if let Err(err) = self.server.start().await {
            self.running.store(false, Ordering::Release);
            return self.remember(Err(err.into()));
        }

        let _ = self.sweep_shutdown.send(false);
        let handles = self.registry.spawn_sweeps(
            self.config.liveness.clone(),
            self.sweep_shutdown.subscribe(),
            self.config.server.socket_path.clone(),
        );
        *self
            .sweep_handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = handles;

        info!(
            socket = %self.config.server.socket_path.display(),
            component = %self.config.component_id,
            "hub started"
        );
        Ok(())
    }

    /// Cooperative bounded shutdown: stop sweeps, drain connections, unlink
    /// the socket. Idempotent.
    pub async fn stop(&self) -> Result<(), HubError> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let _ = self.sweep_shutdown.send(true);
        let handles = std::mem::take(
            &mut *self
                .sweep_handles
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for handle in handles {
            if tokio::time::timeout(Duration::from_secs(1), handle).await.is_err() {
                warn!("sweep task did not stop in time");
            }
        }

        let result = self.server.stop().await.map_err(HubError::from);
        self.remember(result)?;
        info!("hub stopped");
        Ok(())
    }

    /// Look up a flow by raw key.
    pub fn lookup(&self, key: &[u8]) -> Result<Option<FlowRecord>, HubError> {
        let result = self
            .engine
            .lookup(key)
            .map(|found| found.map(|record| (*record).clone()))
            .map_err(HubError::from);
        self.remember(result)
    }

    /// Register (or replace) a flow.
    pub fn register_flow(
        &self,
        key: &[u8],
        component_id: ComponentId,
        flow_type: FlowType,
        size_bytes: u64,
        priority: u8,
    ) -> Result<(), HubError> {
        let result = self
            .engine
            .register_flow(key, component_id, flow_type, size_bytes, priority)
            .map_err(HubError::from);
        self.remember(result)
    }

    /// Remove a flow. Returns whether it was registered.
    pub fn remove_flow(&self, key: &[u8]) -> Result<bool, HubError> {
        let result = self.engine.remove_flow(key).map_err(HubError::from);
        self.remember(result)
    }

    /// Relay an opaque payload to `target`, speaking as the configured
    /// local component. Fails fast if the target is not connected.
    pub fn coordinate_local(&self, target: ComponentId, payload: &[u8]) -> Result<(), HubError> {
        if !self.running.load(Ordering::Acquire) {
            return self.remember(Err(HubError::NotRunning));
        }
        let result = self
            .server
            .coordinate_local(self.config.component_id, target, payload.to_vec())
            .map_err(HubError::from);
        self.remember(result)
    }

    /// Aggregate pass/fail health: matcher reachable, socket listening,
    /// and no component stuck in `Failed`.
    pub fn health_check(&self) -> HealthReport {
        let matcher_ok = self.engine.active_flows() <= self.engine.matcher_capacity();
        let server_listening = self.server.is_listening();
        let components_total = self.registry.len();
        let components_failed = self.registry.failed_count();
        HealthReport {
            healthy: matcher_ok && server_listening && components_failed == 0,
            matcher_ok,
            server_listening,
            components_total,
            components_failed,
        }
    }

    /// Current performance snapshot.
    pub fn performance_stats(&self) -> PerformanceStats {
        self.metrics.snapshot()
    }

    /// Render the metrics snapshot as JSON into `buffer`.
    pub fn export_metrics(&self, buffer: &mut String) -> Result<(), HubError> {
        let result = self.metrics.export_json(buffer).map_err(HubError::from);
        self.remember(result)
    }

    /// Known components, truncated to `max`, plus the true total.
    pub fn components(&self, max: usize) -> (Vec<ComponentInfo>, usize) {
        self.registry.components_capped(max)
    }

    /// Subscribe to component status transitions.
    pub fn subscribe_status(&self) -> StatusSubscription {
        self.registry.events().subscribe()
    }

    /// Drive `handler` for every status transition until the returned
    /// subscription is cancelled or dropped.
    pub fn on_status_change<F>(&self, handler: F) -> CallbackSubscription
    where
        F: FnMut(StatusChange) + Send + 'static,
    {
        self.registry.events().on_status_change(handler)
    }

    /// The component liveness registry.
    pub fn component_registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// The active configuration.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Most recent failure diagnostic, overwritten on each new failure.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Crate version.
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Version plus build flavor, for diagnostics.
    pub fn build_info() -> String {
        let profile = if cfg!(debug_assertions) { "debug" } else { "release" };
        format!("meshflow {} ({profile})", Self::version())
    }
}

impl Drop for MeshHub {
    fn drop(&mut self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        // Best-effort teardown: signal the sweeps and detach the server
        // stop onto the runtime if one is still alive.
        let _ = self.sweep_shutdown.send(true);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let server = Arc::clone(&self.server);
            handle.spawn(async move {
                let _ = server.stop().await;
            });
        }
    }
}
