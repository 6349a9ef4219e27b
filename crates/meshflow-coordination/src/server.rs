//! The local coordination socket server.
//!
//! Each accepted connection gets its own task (bulkhead isolation) and its
//! own bounded outbound queue drained by a writer task. Relaying to a peer
//! uses `try_send` and fails fast — a stalled receiver drops messages with
//! an error to the sender instead of blocking anyone else. Flow operations
//! are delegated to the shared lookup engine and answered synchronously on
//! the requesting connection.

use crate::error::CoordinationError;
use crate::registry::ComponentRegistry;
use crate::wire::{read_frame, write_frame};
use dashmap::DashMap;
use meshflow_registry::LookupEngine;
use meshflow_telemetry::MetricsCollector;
use serde::{Deserialize, Serialize};
use shared_types::{ComponentId, RequestFrame, ResultCode, WireRequest, WireResponse};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Well-known default socket location.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/meshflow/coordination.sock";

/// Outbound frames buffered per connection before relays are refused.
const RESPONSE_QUEUE_CAPACITY: usize = 64;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Socket path to listen on.
    pub socket_path: PathBuf,
    /// Accepted connections beyond this are refused.
    pub max_connections: usize,
    /// Maximum frame size in bytes.
    pub buffer_size: usize,
    /// Grace period for cooperative shutdown, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            max_connections: 64,
            buffer_size: 64 * 1024,
            timeout_ms: 5_000,
        }
    }
}

struct PeerHandle {
    connection_id: Uuid,
    sender: mpsc::Sender<WireResponse>,
}

struct ServerShared {
    settings: ServerSettings,
    engine: Arc<LookupEngine>,
    registry: Arc<ComponentRegistry>,
    metrics: Arc<MetricsCollector>,
    peers: DashMap<ComponentId, PeerHandle>,
    connections: AtomicUsize,
    listening: AtomicBool,
}

impl ServerShared {
    /// Hand a coordination payload to the target's connection, failing
    /// fast when the target is absent or backpressured.
    fn relay(
        &self,
        from: ComponentId,
        target: ComponentId,
        payload: Vec<u8>,
    ) -> Result<(), CoordinationError> {
        let started = Instant::now();
        let outcome = self.relay_inner(from, target, payload);
        self.metrics
            .record_coordination(started.elapsed(), outcome.is_ok());
        outcome
    }

    fn relay_inner(
        &self,
        from: ComponentId,
        target: ComponentId,
        payload: Vec<u8>,
    ) -> Result<(), CoordinationError> {
        // Clone the handle out of the map so no shard lock is held across
        // the send or a removal.
        let (connection_id, sender) = match self.peers.get(&target) {
            Some(handle) => (handle.connection_id, handle.sender.clone()),
            None => return Err(CoordinationError::PeerUnreachable(target)),
        };

        match sender.try_send(WireResponse::Relayed { from, payload }) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(CoordinationError::Backpressured(target))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.peers
                    .remove_if(&target, |_, handle| handle.connection_id == connection_id);
                Err(CoordinationError::PeerUnreachable(target))
            }
        }
    }
}

/// The coordination endpoint: accept loop plus per-connection tasks.
pub struct CoordinationServer {
    shared: Arc<ServerShared>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl CoordinationServer {
    pub fn new(
        settings: ServerSettings,
        engine: Arc<LookupEngine>,
        registry: Arc<ComponentRegistry>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shared: Arc::new(ServerShared {
                settings,
                engine,
                registry,
                metrics,
                peers: DashMap::new(),
                connections: AtomicUsize::new(0),
                listening: AtomicBool::new(false),
            }),
            shutdown_tx,
            shutdown_rx,
            accept_task: Mutex::new(None),
        }
    }

    /// Bind the socket and start accepting connections.
    ///
    /// # Errors
    /// I/O errors from socket setup; starting an already-running server is
    /// an error.
    pub async fn start(&self) -> Result<(), CoordinationError> {
        if self.shared.listening.swap(true, Ordering::AcqRel) {
            return Err(CoordinationError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                "server already started",
            )));
        }

        let path = &self.shared.settings.socket_path;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // A previous run may have left its socket file behind.
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                self.shared.listening.store(false, Ordering::Release);
                return Err(err.into());
            }
        }

        let listener = match UnixListener::bind(path) {
            Ok(listener) => listener,
            Err(err) => {
                self.shared.listening.store(false, Ordering::Release);
                return Err(err.into());
            }
        };
        info!(path = %path.display(), "coordination server listening");

        // Reset the shutdown flag so a stopped server can start again.
        let _ = self.shutdown_tx.send(false);

        let shared = Arc::clone(&self.shared);
        let shutdown = self.shutdown_rx.clone();
        let handle = tokio::spawn(Self::accept_loop(listener, shared, shutdown));
        *self.accept_task.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
        Ok(())
    }

    async fn accept_loop(
        listener: UnixListener,
        shared: Arc<ServerShared>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let active = shared.connections.load(Ordering::Acquire);
                            if active >= shared.settings.max_connections {
                                Self::refuse(stream, &shared);
                                continue;
                            }
                            shared.connections.fetch_add(1, Ordering::AcqRel);
                            shared
                                .metrics
                                .set_active_connections(shared.connections.load(Ordering::Acquire) as u64);
                            connections.spawn(Self::handle_connection(
                                stream,
                                Arc::clone(&shared),
                                shutdown.clone(),
                            ));
                        }
                        Err(err) => {
                            warn!(%err, "accept failed");
                        }
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        // Stop accepting, then give in-flight connections a bounded grace
        // period before aborting the stragglers.
        drop(listener);
        let grace = Duration::from_millis(shared.settings.timeout_ms);
        let drained = tokio::time::timeout(grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("shutdown grace expired; aborting remaining connections");
            connections.shutdown().await;
        }
        debug!("accept loop stopped");
    }

    /// Refuse a connection over the limit with a final error frame.
    fn refuse(stream: UnixStream, shared: &Arc<ServerShared>) {
        let max = shared.settings.max_connections;
        let buffer_size = shared.settings.buffer_size;
        warn!(max, "connection refused: limit reached");
        tokio::spawn(async move {
            let mut stream = stream;
            let reply = WireResponse::error(
                ResultCode::CapacityExceeded,
                format!("connection limit of {max} reached"),
            );
            let _ = write_frame(&mut stream, &reply, buffer_size).await;
        });
    }

    async fn handle_connection(
        stream: UnixStream,
        shared: Arc<ServerShared>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let connection_id = Uuid::new_v4();
        let max_frame = shared.settings.buffer_size;
        let (mut reader, mut writer) = stream.into_split();

        let (tx, mut rx) = mpsc::channel::<WireResponse>(RESPONSE_QUEUE_CAPACITY);
        let mut writer_shutdown = shutdown.clone();
        let writer_task = tokio::spawn(async move {
            loop {
                let response = tokio::select! {
                    received = rx.recv() => match received {
                        Some(response) => response,
                        None => break,
                    },
                    // A stalled peer must not pin this task past shutdown.
                    _ = writer_shutdown.changed() => break,
                };
                let written = tokio::select! {
                    written = write_frame(&mut writer, &response, max_frame) => written,
                    _ = writer_shutdown.changed() => break,
                };
                if let Err(err) = written {
                    if !err.is_disconnect() {
                        debug!(%err, "write failed");
                    }
                    break;
                }
            }
        });

        let mut registered: Option<ComponentId> = None;
        loop {
            tokio::select! {
                frame = read_frame::<_, RequestFrame>(&mut reader, max_frame) => {
                    match frame {
                        Ok(frame) => {
                            let reply = Self::handle_request(
                                &shared,
                                connection_id,
                                &tx,
                                &mut registered,
                                frame,
                            );
                            if tx.send(reply).await.is_err() {
                                break;
                            }
                        }
                        Err(err) if err.is_disconnect() => break,
                        Err(err) => {
                            // Framing is unrecoverable once out of sync.
                            warn!(%err, "dropping connection after protocol error");
                            let _ = tx
                                .send(WireResponse::error(err.result_code(), err.to_string()))
                                .await;
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    debug!(%connection_id, "connection draining for shutdown");
                    break;
                }
            }
        }

        if let Some(component) = registered {
            shared
                .peers
                .remove_if(&component, |_, handle| handle.connection_id == connection_id);
        }
        shared.connections.fetch_sub(1, Ordering::AcqRel);
        shared
            .metrics
            .set_active_connections(shared.connections.load(Ordering::Acquire) as u64);
        drop(tx);
        let _ = writer_task.await;
    }

    fn handle_request(
        shared: &Arc<ServerShared>,
        connection_id: Uuid,
        tx: &mpsc::Sender<WireResponse>,
        registered: &mut Option<ComponentId>,
        frame: RequestFrame,
    ) -> WireResponse {
        let source = frame.source;

        if registered.is_none() && !matches!(frame.request, WireRequest::Hello { .. }) {
            let err = CoordinationError::HandshakeExpected;
            return WireResponse::error(err.result_code(), err.to_string());
        }

        match frame.request {
            WireRequest::Hello { pid } => {
                if let Err(err) = shared.registry.register_component(
                    source,
                    shared.settings.socket_path.clone(),
                    pid,
                ) {
                    return WireResponse::error(err.result_code(), err.to_string());
                }
                shared.peers.insert(
                    source,
                    PeerHandle {
                        connection_id,
                        sender: tx.clone(),
                    },
                );
                *registered = Some(source);
                debug!(component = %source, %connection_id, "component connected");
                WireResponse::Ack
            }
            WireRequest::Heartbeat => {
                shared.registry.heartbeat(source);
                WireResponse::Ack
            }
            WireRequest::Coordinate { target, payload } => {
                match shared.relay(source, target, payload) {
                    Ok(()) => WireResponse::Delivered,
                    Err(err) => WireResponse::error(err.result_code(), err.to_string()),
                }
            }
            WireRequest::RegisterFlow {
                key,
                flow_type,
                size_bytes,
                priority,
            } => match shared
                .engine
                .register_flow(&key, source, flow_type, size_bytes, priority)
            {
                Ok(()) => WireResponse::Ack,
                Err(err) => WireResponse::error(err.result_code(), err.to_string()),
            },
            WireRequest::Lookup { key } => match shared.engine.lookup(&key) {
                Ok(Some(record)) => WireResponse::Found {
                    record: (*record).clone(),
                },
                Ok(None) => WireResponse::NotFound,
                Err(err) => WireResponse::error(err.result_code(), err.to_string()),
            },
            WireRequest::RemoveFlow { key } => match shared.engine.remove_flow(&key) {
                Ok(true) => WireResponse::Ack,
                Ok(false) => WireResponse::NotFound,
                Err(err) => WireResponse::error(err.result_code(), err.to_string()),
            },
            WireRequest::Stats => WireResponse::Stats {
                stats: Box::new(shared.metrics.snapshot()),
            },
        }
    }

    /// Relay a payload on behalf of an in-process caller.
    pub fn coordinate_local(
        &self,
        source: ComponentId,
        target: ComponentId,
        payload: Vec<u8>,
    ) -> Result<(), CoordinationError> {
        self.shared.relay(source, target, payload)
    }

    /// Whether the accept loop is up.
    pub fn is_listening(&self) -> bool {
        self.shared.listening.load(Ordering::Acquire)
    }

    /// Active connection count.
    pub fn connection_count(&self) -> usize {
        self.shared.connections.load(Ordering::Acquire)
    }

    /// Signal shutdown, wait out the grace period, then force-stop.
    ///
    /// Idempotent: stopping a stopped server is a no-op.
    pub async fn stop(&self) -> Result<(), CoordinationError> {
        if !self.shared.listening.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let _ = self.shutdown_tx.send(true);

        let handle = self
            .accept_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            let grace = Duration::from_millis(self.shared.settings.timeout_ms.saturating_add(500));
            if tokio::time::timeout(grace, handle).await.is_err() {
                warn!("accept loop did not drain in time");
            }
        }

        self.shared.peers.clear();
        match tokio::fs::remove_file(&self.shared.settings.socket_path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(%err, "socket cleanup failed"),
        }
        info!("coordination server stopped");
        Ok(())
    }
}
