//! Result-code taxonomy shared by every public operation.
//!
//! Each crate's error type maps onto one of these codes so that wire
//! errors, hub errors, and diagnostics speak the same vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse outcome classification for public operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    Ok,
    NullHandle,
    InitFailed,
    StartFailed,
    StopFailed,
    LookupFailed,
    RegistrationFailed,
    CapacityExceeded,
    InvalidKey,
    CoordinationFailed,
    PeerUnreachable,
    Timeout,
    InvalidParameter,
    Unhealthy,
}

impl ResultCode {
    /// Human-readable description of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::Ok => "ok",
            ResultCode::NullHandle => "null or destroyed handle",
            ResultCode::InitFailed => "initialization failed",
            ResultCode::StartFailed => "service start failed",
            ResultCode::StopFailed => "service stop failed",
            ResultCode::LookupFailed => "lookup failed",
            ResultCode::RegistrationFailed => "flow registration failed",
            ResultCode::CapacityExceeded => "capacity exceeded",
            ResultCode::InvalidKey => "invalid flow key",
            ResultCode::CoordinationFailed => "coordination failed",
            ResultCode::PeerUnreachable => "peer not connected",
            ResultCode::Timeout => "operation timed out",
            ResultCode::InvalidParameter => "invalid parameter",
            ResultCode::Unhealthy => "system unhealthy",
        }
    }

    /// Whether the code represents success.
    pub fn is_ok(&self) -> bool {
        matches!(self, ResultCode::Ok)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_is_ok() {
        assert!(ResultCode::Ok.is_ok());
        assert!(!ResultCode::Timeout.is_ok());
    }

    #[test]
    fn test_descriptions_are_distinct() {
        let codes = [
            ResultCode::Ok,
            ResultCode::NullHandle,
            ResultCode::InitFailed,
            ResultCode::StartFailed,
            ResultCode::StopFailed,
            ResultCode::LookupFailed,
            ResultCode::RegistrationFailed,
            ResultCode::CapacityExceeded,
            ResultCode::InvalidKey,
            ResultCode::CoordinationFailed,
            ResultCode::PeerUnreachable,
            ResultCode::Timeout,
            ResultCode::InvalidParameter,
            ResultCode::Unhealthy,
        ];
        let unique: std::collections::HashSet<_> = codes.iter().map(|c| c.as_str()).collect();
        assert_eq!(unique.len(), codes.len(), "every code has a distinct text");
    }
}
