//! Error types for the flow registry.

use shared_types::ResultCode;
use thiserror::Error;

/// Errors that can occur in the registry subsystem.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("flow key must not be empty")]
    EmptyKey,

    #[error("priority {priority} out of range (max {max})")]
    PriorityOutOfRange { priority: u8, max: u8 },

    #[error("matcher capacity exceeded: {capacity} entries")]
    CapacityExceeded { capacity: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RegistryError {
    /// Map onto the shared result-code taxonomy.
    pub fn result_code(&self) -> ResultCode {
        match self {
            RegistryError::EmptyKey => ResultCode::InvalidKey,
            RegistryError::PriorityOutOfRange { .. } => ResultCode::InvalidParameter,
            RegistryError::CapacityExceeded { .. } => ResultCode::CapacityExceeded,
            RegistryError::InvalidConfig(_) => ResultCode::InvalidParameter,
        }
    }
}
