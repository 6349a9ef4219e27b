//! Wire message types for the local coordination socket.
//!
//! Frames on the socket are a 4-byte big-endian length prefix followed by a
//! bincode-encoded message. Every request frame carries the sender's
//! component id; coordination payloads are opaque bytes the hub relays
//! without inspection.

use crate::entities::{ComponentId, FlowRecord, FlowType};
use crate::result_code::ResultCode;
use crate::stats::PerformanceStats;
use serde::{Deserialize, Serialize};

/// Operations a connected component may request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WireRequest {
    /// Introduce the connection; must be the first frame sent.
    Hello { pid: Option<u32> },
    /// Liveness signal.
    Heartbeat,
    /// Relay an opaque payload to another component, if connected.
    Coordinate { target: ComponentId, payload: Vec<u8> },
    /// Register (or replace) a flow under `key`.
    RegisterFlow {
        key: Vec<u8>,
        flow_type: FlowType,
        size_bytes: u64,
        priority: u8,
    },
    /// Look up a flow by key.
    Lookup { key: Vec<u8> },
    /// Remove a flow by key.
    RemoveFlow { key: Vec<u8> },
    /// Request a performance snapshot.
    Stats,
}

/// A request frame: sender identity plus the request body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub source: ComponentId,
    pub request: WireRequest,
}

/// Replies and pushed frames from the hub to a component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WireResponse {
    /// Generic success.
    Ack,
    /// A coordination payload was handed to the target's connection.
    Delivered,
    /// Lookup hit.
    Found { record: FlowRecord },
    /// Lookup miss (or remove of an absent key).
    NotFound,
    /// Performance snapshot.
    Stats { stats: Box<PerformanceStats> },
    /// Pushed to the target of a `Coordinate` request.
    Relayed { from: ComponentId, payload: Vec<u8> },
    /// Any failure; `code` classifies, `message` carries the diagnostic.
    Error { code: ResultCode, message: String },
}

impl WireResponse {
    /// Build an error reply.
    pub fn error(code: ResultCode, message: impl Into<String>) -> Self {
        WireResponse::Error {
            code,
            message: message.into(),
        }
    }
}
