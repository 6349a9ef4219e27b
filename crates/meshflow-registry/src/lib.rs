//! # MeshFlow Registry
//!
//! Exact-match flow registry with probabilistic and cached acceleration.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): pure data structures, no I/O
//!   - `ExactMatcher`: sharded authoritative key→record store
//!   - `GenerationalBloom`: negative-lookup filter with generation rotation
//!   - `FlowCache`: bounded cache with pluggable eviction policies
//!   - `FlowKey` + digest strategies: key canonicalization
//! - **Engine Layer** (`engine`): `LookupEngine` composes the three
//!   structures into one lookup/registration path and feeds the metrics
//!   collector.
//!
//! ## Invariants
//!
//! - The exact matcher is the single source of truth; filter and cache may
//!   only accelerate, never change, its answers.
//! - A registered key always passes the filter (no false negatives).
//! - `active_flows` equals successful registrations minus removals.
//!
//! ## Usage
//!
//! ```ignore
//! use meshflow_registry::{LookupEngine, RegistryConfig};
//! use meshflow_telemetry::MetricsCollector;
//! use shared_types::{ComponentId, FlowType};
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(MetricsCollector::new());
//! let engine = LookupEngine::new(&RegistryConfig::default(), metrics)?;
//!
//! engine.register_flow(b"k1", ComponentId::Transport, FlowType::DataTransfer, 128, 5)?;
//! assert!(engine.lookup(b"k1")?.is_some());
//! ```

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;

pub use config::{BloomSettings, CacheSettings, EvictionPolicy, MatcherSettings, RegistryConfig};
pub use domain::{ExactMatcher, FlowCache, FlowKey, GenerationalBloom};
pub use engine::LookupEngine;
pub use error::RegistryError;
