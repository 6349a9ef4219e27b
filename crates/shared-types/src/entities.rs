//! Core domain entities for the flow registry and component mesh.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;

/// The seven fixed component roles of the mesh.
///
/// The numeric values are part of the wire contract and must not be
/// reordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ComponentId {
    Transport = 0,
    Consensus = 1,
    Container = 2,
    Security = 3,
    Orchestration = 4,
    Networking = 5,
    Scheduler = 6,
}

impl ComponentId {
    /// All roles, in wire order.
    pub const ALL: [ComponentId; 7] = [
        ComponentId::Transport,
        ComponentId::Consensus,
        ComponentId::Container,
        ComponentId::Security,
        ComponentId::Orchestration,
        ComponentId::Networking,
        ComponentId::Scheduler,
    ];

    /// Stable lowercase name, used for socket file names and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentId::Transport => "transport",
            ComponentId::Consensus => "consensus",
            ComponentId::Container => "container",
            ComponentId::Security => "security",
            ComponentId::Orchestration => "orchestration",
            ComponentId::Networking => "networking",
            ComponentId::Scheduler => "scheduler",
        }
    }

    /// Parse a role from its lowercase name.
    pub fn from_name(name: &str) -> Option<ComponentId> {
        ComponentId::ALL.iter().copied().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a numeric component id is out of range.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("unknown component id: {0}")]
pub struct UnknownComponentId(pub u8);

impl TryFrom<u8> for ComponentId {
    type Error = UnknownComponentId;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ComponentId::ALL
            .get(value as usize)
            .copied()
            .ok_or(UnknownComponentId(value))
    }
}

/// Classification of a registered flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowType {
    ComponentCommand,
    DataTransfer,
    EventNotification,
    MetricsCollection,
    SecurityEvent,
    HealthCheck,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::ComponentCommand => "component-command",
            FlowType::DataTransfer => "data-transfer",
            FlowType::EventNotification => "event-notification",
            FlowType::MetricsCollection => "metrics-collection",
            FlowType::SecurityEvent => "security-event",
            FlowType::HealthCheck => "health-check",
        }
    }
}

/// Highest priority a flow may carry.
pub const MAX_FLOW_PRIORITY: u8 = 7;

/// Metadata describing one in-flight flow.
///
/// Records are immutable once created; re-registering the same key replaces
/// the whole record atomically (last write wins).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    /// Component that registered the flow.
    pub component_id: ComponentId,
    /// Traffic classification.
    pub flow_type: FlowType,
    /// Payload size in bytes.
    pub size_bytes: u64,
    /// Urgency, 0..=7, higher is more urgent.
    pub priority: u8,
    /// Wall-clock registration time.
    pub registered_at: SystemTime,
}

impl FlowRecord {
    /// Create a record stamped with the current wall clock.
    pub fn new(
        component_id: ComponentId,
        flow_type: FlowType,
        size_bytes: u64,
        priority: u8,
    ) -> Self {
        Self {
            component_id,
            flow_type,
            size_bytes,
            priority,
            registered_at: SystemTime::now(),
        }
    }
}

/// Digest algorithm used to canonicalize flow keys longer than 32 bytes.
///
/// The three algorithms are functionally interchangeable; they trade hashing
/// speed against collision spread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256: collision-resistant, slowest.
    #[default]
    Sha256,
    /// MurmurHash3 x64 128-bit: fast, non-cryptographic.
    Murmur3,
    /// SipHash-2-4: fastest, 64-bit output widened by a second keyed pass.
    SipHash24,
}

/// Lifecycle status of a mesh component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentStatus {
    Unknown,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Unknown => "unknown",
            ComponentStatus::Starting => "starting",
            ComponentStatus::Running => "running",
            ComponentStatus::Stopping => "stopping",
            ComponentStatus::Stopped => "stopped",
            ComponentStatus::Failed => "failed",
        }
    }

    /// Whether a component in this status is expected to send heartbeats.
    pub fn is_live(&self) -> bool {
        matches!(self, ComponentStatus::Starting | ComponentStatus::Running)
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the hub knows about one component.
///
/// Entries are removed only by explicit administrative action so that a
/// "known but failed" component stays visible for audit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Fixed role of the component.
    pub component_id: ComponentId,
    /// Socket path the component is reachable at.
    pub socket_path: PathBuf,
    /// OS process id, if known.
    pub pid: Option<u32>,
    /// Current lifecycle status.
    pub status: ComponentStatus,
    /// Timestamp of the most recent heartbeat.
    pub last_heartbeat: SystemTime,
    /// When the component was first discovered or registered.
    pub registered_at: SystemTime,
}

impl ComponentInfo {
    /// Create a freshly discovered component in `Starting` state.
    pub fn starting(component_id: ComponentId, socket_path: PathBuf, pid: Option<u32>) -> Self {
        let now = SystemTime::now();
        Self {
            component_id,
            socket_path,
            pid,
            status: ComponentStatus::Starting,
            last_heartbeat: now,
            registered_at: now,
        }
    }
}
