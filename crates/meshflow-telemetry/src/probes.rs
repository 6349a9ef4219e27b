//! Event schemas for kernel-level telemetry producers.
//!
//! The tracers themselves live outside the hub; they publish execution and
//! network events through shared ring buffers plus auxiliary counter maps.
//! The collector treats all of it as optional metric sources: events merge
//! into the aggregates below and surface in the JSON export, nothing more.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// A process-execution trace event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecEvent {
    pub pid: u32,
    pub uid: u32,
    /// Command name, truncated by the tracer to the kernel comm width.
    pub comm: String,
}

/// Kind of socket activity observed by the network tracer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetEventKind {
    Connect,
    Accept,
    Send,
    Receive,
    Close,
}

impl NetEventKind {
    pub const ALL: [NetEventKind; 5] = [
        NetEventKind::Connect,
        NetEventKind::Accept,
        NetEventKind::Send,
        NetEventKind::Receive,
        NetEventKind::Close,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetEventKind::Connect => "connect",
            NetEventKind::Accept => "accept",
            NetEventKind::Send => "send",
            NetEventKind::Receive => "receive",
            NetEventKind::Close => "close",
        }
    }
}

/// A network trace event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetTraceEvent {
    pub pid: u32,
    pub kind: NetEventKind,
    pub bytes: u64,
    pub at: SystemTime,
}

/// Snapshot of the tracer-side counter maps.
///
/// Totals are absolute values read from the maps, not deltas; ingesting a
/// snapshot replaces the previous one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Executions observed per uid.
    pub exec_per_uid: HashMap<u32, u64>,
    /// Packet totals per event kind name.
    pub packets_per_kind: HashMap<String, u64>,
    /// Byte totals per protocol name (tcp, udp, ...).
    pub bytes_per_protocol: HashMap<String, u64>,
}

/// Aggregates maintained from ingested probe events.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ProbeStats {
    /// Execution events ingested.
    pub exec_events: u64,
    /// Execution events per uid (from the event stream, not the map).
    pub exec_per_uid: HashMap<u32, u64>,
    /// Network events ingested, per kind name.
    pub net_events: HashMap<String, u64>,
    /// Bytes observed per kind name.
    pub net_bytes: HashMap<String, u64>,
    /// Most recent tracer counter-map snapshot, if any.
    pub counters: Option<CounterSnapshot>,
}

impl ProbeStats {
    pub(crate) fn ingest_exec(&mut self, event: &ExecEvent) {
        self.exec_events += 1;
        *self.exec_per_uid.entry(event.uid).or_insert(0) += 1;
    }

    pub(crate) fn ingest_net(&mut self, event: &NetTraceEvent) {
        let kind = event.kind.as_str().to_string();
        *self.net_events.entry(kind.clone()).or_insert(0) += 1;
        *self.net_bytes.entry(kind).or_insert(0) += event.bytes;
    }

    pub(crate) fn ingest_counters(&mut self, snapshot: &CounterSnapshot) {
        self.counters = Some(snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_ingestion_counts_per_uid() {
        let mut stats = ProbeStats::default();
        stats.ingest_exec(&ExecEvent { pid: 100, uid: 0, comm: "init".into() });
        stats.ingest_exec(&ExecEvent { pid: 101, uid: 1000, comm: "bash".into() });
        stats.ingest_exec(&ExecEvent { pid: 102, uid: 1000, comm: "ls".into() });

        assert_eq!(stats.exec_events, 3);
        assert_eq!(stats.exec_per_uid.get(&1000), Some(&2));
        assert_eq!(stats.exec_per_uid.get(&0), Some(&1));
    }

    #[test]
    fn test_net_ingestion_sums_bytes() {
        let mut stats = ProbeStats::default();
        let now = SystemTime::now();
        stats.ingest_net(&NetTraceEvent { pid: 1, kind: NetEventKind::Send, bytes: 100, at: now });
        stats.ingest_net(&NetTraceEvent { pid: 1, kind: NetEventKind::Send, bytes: 50, at: now });
        stats.ingest_net(&NetTraceEvent { pid: 1, kind: NetEventKind::Close, bytes: 0, at: now });

        assert_eq!(stats.net_events.get("send"), Some(&2));
        assert_eq!(stats.net_bytes.get("send"), Some(&150));
        assert_eq!(stats.net_events.get("close"), Some(&1));
    }

    #[test]
    fn test_counter_snapshot_replaces() {
        let mut stats = ProbeStats::default();
        let mut first = CounterSnapshot::default();
        first.packets_per_kind.insert("send".into(), 10);
        stats.ingest_counters(&first);

        let mut second = CounterSnapshot::default();
        second.packets_per_kind.insert("send".into(), 25);
        stats.ingest_counters(&second);

        let current = stats.counters.expect("snapshot present");
        assert_eq!(current.packets_per_kind.get("send"), Some(&25));
    }
}
