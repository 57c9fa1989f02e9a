//! Broker transport seam under the edge link.
//!
//! The broker client delivers messages from its own task; they are parked
//! in an [`InboundMailbox`] and drained by the control loop, so commands
//! are always handled on the loop's thread.

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::error::CommsError;

pub const MAILBOX_DEPTH: usize = 8;
pub const MAX_PAYLOAD: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: heapless::String<64>,
    pub payload: heapless::Vec<u8, MAX_PAYLOAD>,
}

impl InboundMessage {
    /// `None` when the topic or payload does not fit.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let mut t = heapless::String::new();
        t.push_str(topic).ok()?;
        let payload = heapless::Vec::from_slice(payload).ok()?;
        Some(Self { topic: t, payload })
    }
}

/// Publish/subscribe session with the edge broker.
pub trait BrokerTransport {
    /// Start a session.  May return before the session is up; poll
    /// [`is_connected`](Self::is_connected) to find out.
    fn connect(&mut self, client_id: &str, host: &str, port: u16) -> Result<(), CommsError>;

    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError>;

    fn disconnect(&mut self);

    /// Next message received on a subscribed topic.
    fn poll_inbound(&mut self) -> Option<InboundMessage>;
}

type Queue = Channel<CriticalSectionRawMutex, InboundMessage, MAILBOX_DEPTH>;

/// Bounded hand-off from the broker task to the control loop.  Clones
/// share the same queue.
#[derive(Clone)]
pub struct InboundMailbox(Arc<Queue>);

impl Default for InboundMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundMailbox {
    pub fn new() -> Self {
        Self(Arc::new(Channel::new()))
    }

    /// Drops the message (and returns `false`) when the mailbox is full.
    pub fn post(&self, message: InboundMessage) -> bool {
        match self.0.try_send(message) {
            Ok(()) => true,
            Err(_) => {
                warn!("Inbound mailbox full, dropping message");
                false
            }
        }
    }

    pub fn take(&self) -> Option<InboundMessage> {
        self.0.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
