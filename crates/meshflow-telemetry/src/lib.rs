//! # MeshFlow Telemetry
//!
//! Passive performance accounting for every hub path.
//!
//! The collector is a bag of atomic counters and bucketed latency
//! histograms; the hot paths pay one `fetch_add` per event and percentiles
//! are derived at snapshot time, never stored per-sample. Kernel-level
//! probe events (process executions, socket traffic) can be ingested as
//! optional gauges; no core path depends on their presence.

pub mod histogram;
pub mod metrics;
pub mod probes;

pub use histogram::LatencyHistogram;
pub use metrics::{LookupOutcome, MetricsCollector};
pub use probes::{CounterSnapshot, ExecEvent, NetEventKind, NetTraceEvent};

use thiserror::Error;

/// Errors from telemetry operations.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("metric export failed: {0}")]
    ExportFailed(#[from] serde_json::Error),
}
