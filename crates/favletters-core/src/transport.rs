//! Broadcast transport seam and the in-process bus.
//!
//! A [`Transport`] fans a message out to every other live tab. Delivery is
//! asynchronous, unordered across senders, at-most-once, and never loops
//! back to the sender.
//!
//! [`LocalBus`] implements the contract inside one process on top of a
//! `tokio::sync::broadcast` channel. A subscriber that falls behind loses
//! the oldest messages, which is exactly the at-most-once contract.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{trace, warn};

use crate::error::Result;
use crate::message::Message;

/// Default buffer of the in-process bus, per subscriber.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Publish side of a broadcast bus.
pub trait Transport: Send + Sync {
    /// The receive side handed out by [`subscribe`](Self::subscribe).
    type Inbox: Inbox;

    /// Send to every other tab. Best-effort: "nobody listening" is success.
    fn publish(&self, message: &Message) -> Result<()>;

    /// Start receiving messages published by other tabs from now on.
    fn subscribe(&self) -> Result<Self::Inbox>;
}

/// Receive side of a broadcast bus.
pub trait Inbox: Send {
    /// Next already-delivered message, without waiting.
    fn try_next(&mut self) -> Option<Message>;

    /// Wait for the next message. `None` once the bus is gone.
    fn next(&mut self) -> impl Future<Output = Option<Message>> + Send;
}

#[derive(Debug, Clone)]
struct Envelope {
    origin: u64,
    message: Message,
}

/// In-process broadcast bus shared by several engines.
#[derive(Debug, Clone)]
pub struct LocalBus {
    tx: broadcast::Sender<Envelope>,
    next_origin: Arc<AtomicU64>,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBus {
    /// Create a bus with the default per-subscriber buffer.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    /// Create a bus buffering at most `capacity` messages per subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            next_origin: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Attach a new tab to the bus.
    pub fn join(&self) -> LocalEndpoint {
        LocalEndpoint {
            origin: self.next_origin.fetch_add(1, Ordering::Relaxed),
            tx: self.tx.clone(),
        }
    }
}

/// One tab's attachment to a [`LocalBus`].
#[derive(Debug, Clone)]
pub struct LocalEndpoint {
    origin: u64,
    tx: broadcast::Sender<Envelope>,
}

impl Transport for LocalEndpoint {
    type Inbox = LocalInbox;

    fn publish(&self, message: &Message) -> Result<()> {
        let envelope = Envelope {
            origin: self.origin,
            message: message.clone(),
        };
        // Err only means there are no subscribers right now.
        if self.tx.send(envelope).is_err() {
            trace!(kind = message.kind(), "no subscribers on local bus");
        }
        Ok(())
    }

    fn subscribe(&self) -> Result<LocalInbox> {
        Ok(LocalInbox {
            origin: self.origin,
            rx: self.tx.subscribe(),
        })
    }
}

/// Messages from other tabs on a [`LocalBus`].
#[derive(Debug)]
pub struct LocalInbox {
    origin: u64,
    rx: broadcast::Receiver<Envelope>,
}

impl Inbox for LocalInbox {
    fn try_next(&mut self) -> Option<Message> {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) if envelope.origin == self.origin => continue,
                Ok(envelope) => return Some(envelope.message),
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(missed, "local bus subscriber lagged, messages dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    async fn next(&mut self) -> Option<Message> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if envelope.origin == self.origin => continue,
                Ok(envelope) => return Some(envelope.message),
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "local bus subscriber lagged, messages dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
