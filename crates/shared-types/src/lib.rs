//! # Shared Types Crate
//!
//! This crate contains the domain entities, wire message types, and the
//! result-code taxonomy shared across the MeshFlow crates.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: all cross-crate types are defined here.
//! - **No behavior**: entities carry data and trivial conversions only;
//!   the registry, coordination, and runtime crates own the logic.

pub mod entities;
pub mod result_code;
pub mod stats;
pub mod wire;

pub use entities::*;
pub use result_code::ResultCode;
pub use stats::{LatencySummary, PerformanceStats};
pub use wire::{RequestFrame, WireRequest, WireResponse};
