//! Error types for the coordination subsystem.

use shared_types::{ComponentId, ComponentStatus, ResultCode};
use thiserror::Error;

/// Errors that can occur in the coordination server, client, or registry.
#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame encode failed: {0}")]
    Encode(String),

    #[error("frame decode failed: {0}")]
    Decode(String),

    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge { size: usize, max: usize },

    #[error("peer {0} is not connected")]
    PeerUnreachable(ComponentId),

    #[error("peer {0} is backpressured; message dropped")]
    Backpressured(ComponentId),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("connection limit of {max} reached")]
    ConnectionLimit { max: usize },

    #[error("component {component} cannot move {from} -> {to}")]
    InvalidTransition {
        component: ComponentId,
        from: ComponentStatus,
        to: ComponentStatus,
    },

    #[error("expected a hello frame first")]
    HandshakeExpected,

    #[error("unexpected response frame")]
    UnexpectedResponse,

    #[error("operation timed out")]
    Timeout,

    #[error("remote error ({code}): {message}")]
    Remote { code: ResultCode, message: String },
}

impl CoordinationError {
    /// Map onto the shared result-code taxonomy.
    pub fn result_code(&self) -> ResultCode {
        match self {
            CoordinationError::Io(_) | CoordinationError::ConnectionClosed => {
                ResultCode::CoordinationFailed
            }
            CoordinationError::Encode(_)
            | CoordinationError::Decode(_)
            | CoordinationError::FrameTooLarge { .. }
            | CoordinationError::UnexpectedResponse
            | CoordinationError::HandshakeExpected => ResultCode::CoordinationFailed,
            CoordinationError::PeerUnreachable(_) | CoordinationError::Backpressured(_) => {
                ResultCode::PeerUnreachable
            }
            CoordinationError::ConnectionLimit { .. } => ResultCode::CapacityExceeded,
            CoordinationError::InvalidTransition { .. } => ResultCode::InvalidParameter,
            CoordinationError::Timeout => ResultCode::Timeout,
            CoordinationError::Remote { code, .. } => *code,
        }
    }

    /// Whether this error just means the peer hung up.
    pub fn is_disconnect(&self) -> bool {
        match self {
            CoordinationError::ConnectionClosed => true,
            CoordinationError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
            ),
            _ => false,
        }
    }
}
