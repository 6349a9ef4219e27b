//! # MeshFlow Coordination
//!
//! The local coordination layer of the hub: a component liveness registry
//! with discovery and heartbeat sweeps, a status-change event bus, and the
//! unix-socket server that relays coordination messages and serves flow
//! operations.
//!
//! ## Architecture
//!
//! - `registry`: `ComponentRegistry` — status state machine, sweeps
//! - `events`: `StatusBus` — broadcast status-change subscriptions
//! - `server`: `CoordinationServer` — accept loop, bulkheaded connections
//! - `client`: `CoordinationClient` — component-side connector
//! - `wire`: length-prefixed bincode frame codec
//!
//! ## Isolation guarantees
//!
//! Every connection runs in its own task with its own bounded outbound
//! queue. A stalled peer fills its queue and starts losing relays with an
//! error reported to the sender; it never blocks another connection or the
//! accept loop.

pub mod client;
pub mod error;
pub mod events;
pub mod registry;
pub mod server;
pub mod wire;

pub use client::CoordinationClient;
pub use error::CoordinationError;
pub use events::{CallbackSubscription, StatusBus, StatusChange, StatusStream, StatusSubscription};
pub use registry::{ComponentRegistry, RegistrySettings};
pub use server::{CoordinationServer, ServerSettings, DEFAULT_SOCKET_PATH};
