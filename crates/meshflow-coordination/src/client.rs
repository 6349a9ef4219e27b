//! Component-side connector for the coordination socket.
//!
//! One stream carries both request/response pairs and asynchronously
//! pushed `Relayed` frames; pushes that arrive while a response is awaited
//! are buffered and handed out by [`CoordinationClient::recv_relayed`].

use crate::error::CoordinationError;
use crate::wire::{read_frame, write_frame};
use shared_types::{
    ComponentId, FlowRecord, FlowType, PerformanceStats, RequestFrame, WireRequest, WireResponse,
};
use std::collections::VecDeque;
use std::path::Path;
use tokio::net::UnixStream;
use tracing::debug;

/// A connected coordination client.
pub struct CoordinationClient {
    component: ComponentId,
    stream: UnixStream,
    max_frame_bytes: usize,
    pending_relays: VecDeque<(ComponentId, Vec<u8>)>,
}

impl CoordinationClient {
    /// Connect to the hub and introduce this component.
    pub async fn connect(
        socket_path: impl AsRef<Path>,
        component: ComponentId,
        pid: Option<u32>,
        max_frame_bytes: usize,
    ) -> Result<Self, CoordinationError> {
        let stream = UnixStream::connect(socket_path.as_ref()).await?;
        let mut client = Self {
            component,
            stream,
            max_frame_bytes,
            pending_relays: VecDeque::new(),
        };
        match client.request(WireRequest::Hello { pid }).await? {
            WireResponse::Ack => {
                debug!(component = %component, "connected to coordination hub");
                Ok(client)
            }
            WireResponse::Error { code, message } => {
                Err(CoordinationError::Remote { code, message })
            }
            _ => Err(CoordinationError::UnexpectedResponse),
        }
    }

    /// The component this client speaks for.
    pub fn component(&self) -> ComponentId {
        self.component
    }

    /// Send a liveness heartbeat.
    pub async fn heartbeat(&mut self) -> Result<(), CoordinationError> {
        match self.request(WireRequest::Heartbeat).await? {
            WireResponse::Ack => Ok(()),
            WireResponse::Error { code, message } => {
                Err(CoordinationError::Remote { code, message })
            }
            _ => Err(CoordinationError::UnexpectedResponse),
        }
    }

    /// Relay an opaque payload to another component.
    ///
    /// Fails fast when the target is not connected; retrying is the
    /// caller's decision.
    pub async fn coordinate(
        &mut self,
        target: ComponentId,
        payload: Vec<u8>,
    ) -> Result<(), CoordinationError> {
        match self
            .request(WireRequest::Coordinate { target, payload })
            .await?
        {
            WireResponse::Delivered => Ok(()),
            WireResponse::Error { code, message } => {
                Err(CoordinationError::Remote { code, message })
            }
            _ => Err(CoordinationError::UnexpectedResponse),
        }
    }

    /// Register (or replace) a flow under `key`.
    pub async fn register_flow(
        &mut self,
        key: &[u8],
        flow_type: FlowType,
        size_bytes: u64,
        priority: u8,
    ) -> Result<(), CoordinationError> {
        let request = WireRequest::RegisterFlow {
            key: key.to_vec(),
            flow_type,
            size_bytes,
            priority,
        };
        match self.request(request).await? {
            WireResponse::Ack => Ok(()),
            WireResponse::Error { code, message } => {
                Err(CoordinationError::Remote { code, message })
            }
            _ => Err(CoordinationError::UnexpectedResponse),
        }
    }

    /// Look up a flow by key.
    pub async fn lookup(&mut self, key: &[u8]) -> Result<Option<FlowRecord>, CoordinationError> {
        match self.request(WireRequest::Lookup { key: key.to_vec() }).await? {
            WireResponse::Found { record } => Ok(Some(record)),
            WireResponse::NotFound => Ok(None),
            WireResponse::Error { code, message } => {
                Err(CoordinationError::Remote { code, message })
            }
            _ => Err(CoordinationError::UnexpectedResponse),
        }
    }

    /// Remove a flow by key. Returns whether it existed.
    pub async fn remove_flow(&mut self, key: &[u8]) -> Result<bool, CoordinationError> {
        match self
            .request(WireRequest::RemoveFlow { key: key.to_vec() })
            .await?
        {
            WireResponse::Ack => Ok(true),
            WireResponse::NotFound => Ok(false),
            WireResponse::Error { code, message } => {
                Err(CoordinationError::Remote { code, message })
            }
            _ => Err(CoordinationError::UnexpectedResponse),
        }
    }

    /// Fetch the hub's performance snapshot.
    pub async fn stats(&mut self) -> Result<PerformanceStats, CoordinationError> {
        match self.request(WireRequest::Stats).await? {
            WireResponse::Stats { stats } => Ok(*stats),
            WireResponse::Error { code, message } => {
                Err(CoordinationError::Remote { code, message })
            }
            _ => Err(CoordinationError::UnexpectedResponse),
        }
    }

    /// Receive the next payload relayed to this component, waiting if none
    /// is buffered.
    pub async fn recv_relayed(&mut self) -> Result<(ComponentId, Vec<u8>), CoordinationError> {
        if let Some(relayed) = self.pending_relays.pop_front() {
            return Ok(relayed);
        }
        let response: WireResponse = read_frame(&mut self.stream, self.max_frame_bytes).await?;
        match response {
            WireResponse::Relayed { from, payload } => Ok((from, payload)),
            other => {
                // A response without an outstanding request; protocol
                // confusion on this stream is unrecoverable.
                debug!(?other, "unexpected frame while awaiting relay");
                Err(CoordinationError::UnexpectedResponse)
            }
        }
    }

    async fn request(&mut self, request: WireRequest) -> Result<WireResponse, CoordinationError> {
        let frame = RequestFrame {
            source: self.component,
            request,
        };
        write_frame(&mut self.stream, &frame, self.max_frame_bytes).await?;

        loop {
            let response: WireResponse =
                read_frame(&mut self.stream, self.max_frame_bytes).await?;
            if let WireResponse::Relayed { from, payload } = response {
                // A push raced our response; keep it for recv_relayed.
                self.pending_relays.push_back((from, payload));
                continue;
            }
            return Ok(response);
        }
    }
}
