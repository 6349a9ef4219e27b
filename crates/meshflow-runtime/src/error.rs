//! Hub-level error type.

use meshflow_coordination::CoordinationError;
use meshflow_registry::RegistryError;
use meshflow_telemetry::TelemetryError;
use shared_types::ResultCode;
use thiserror::Error;

/// Errors surfaced by the public hub operations.
#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("hub is already running")]
    AlreadyRunning,

    #[error("hub is not running")]
    NotRunning,
}

impl HubError {
    /// Map onto the shared result-code taxonomy.
    pub fn result_code(&self) -> ResultCode {
        match self {
            HubError::Registry(err) => err.result_code(),
            HubError::Coordination(err) => err.result_code(),
            HubError::Telemetry(_) => ResultCode::CoordinationFailed,
            HubError::AlreadyRunning => ResultCode::StartFailed,
            HubError::NotRunning => ResultCode::NullHandle,
        }
    }
}
