//! Status-change event bus.
//!
//! Component status transitions are published on a broadcast channel.
//! Interested listeners either poll a [`StatusSubscription`] or hand a
//! closure to [`StatusBus::on_status_change`], which drives it from a
//! spawned task and returns a cancellable handle. Both replace the raw
//! callback-pointer registration surface with owned, droppable values.

use shared_types::{ComponentId, ComponentStatus};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

/// Events to buffer per subscriber before older ones are dropped.
pub const STATUS_CHANNEL_CAPACITY: usize = 256;

/// One observed status transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusChange {
    pub component_id: ComponentId,
    pub old: ComponentStatus,
    pub new: ComponentStatus,
    pub at: SystemTime,
}

/// Broadcast bus for status transitions.
#[derive(Debug)]
pub struct StatusBus {
    sender: broadcast::Sender<StatusChange>,
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBus {
    /// Create a bus with the default per-subscriber buffer.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish a transition. Returns the number of subscribers reached.
    pub fn publish(&self, event: StatusChange) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(err) => {
                // No receivers; the event is dropped.
                debug!(component = %err.0.component_id, "status event dropped (no subscribers)");
                0
            }
        }
    }

    /// Subscribe to future transitions.
    pub fn subscribe(&self) -> StatusSubscription {
        StatusSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Drive `handler` from a spawned task for every future transition.
    ///
    /// The returned handle detaches the handler when cancelled or dropped.
    /// Must be called within a tokio runtime.
    pub fn on_status_change<F>(&self, mut handler: F) -> CallbackSubscription
    where
        F: FnMut(StatusChange) + Send + 'static,
    {
        let mut subscription = self.subscribe();
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                handler(event);
            }
        });
        CallbackSubscription {
            id: Uuid::new_v4(),
            task,
        }
    }

    /// Current subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A subscription handle for receiving status transitions.
#[derive(Debug)]
pub struct StatusSubscription {
    receiver: broadcast::Receiver<StatusChange>,
}

impl StatusSubscription {
    /// Receive the next transition.
    ///
    /// Returns `None` once the bus is gone. A lagged subscriber skips the
    /// overwritten events and keeps receiving.
    pub async fn recv(&mut self) -> Option<StatusChange> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "status subscriber lagged");
                }
            }
        }
    }

    /// Receive without waiting; `Ok(None)` when nothing is pending.
    pub fn try_recv(&mut self) -> Result<Option<StatusChange>, StatusBusClosed> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Ok(Some(event)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(StatusBusClosed),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
            }
        }
    }
}

/// The status bus was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("status bus closed")]
pub struct StatusBusClosed;

/// A stream wrapper for subscriptions, for use with stream combinators.
pub struct StatusStream {
    subscription: StatusSubscription,
}

impl StatusStream {
    pub fn new(subscription: StatusSubscription) -> Self {
        Self { subscription }
    }
}

impl tokio_stream::Stream for StatusStream {
    type Item = StatusChange;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        match self.subscription.try_recv() {
            Ok(Some(event)) => std::task::Poll::Ready(Some(event)),
            Ok(None) => {
                cx.waker().wake_by_ref();
                std::task::Poll::Pending
            }
            Err(StatusBusClosed) => std::task::Poll::Ready(None),
        }
    }
}

/// Handle for a closure-based listener; aborts the driving task on cancel
/// or drop.
#[derive(Debug)]
pub struct CallbackSubscription {
    id: Uuid,
    task: JoinHandle<()>,
}

impl CallbackSubscription {
    /// Correlation id for logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Detach the handler.
    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for CallbackSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
