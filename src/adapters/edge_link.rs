//! Edge link: the [`LinkPort`] the orchestrator talks to.
//!
//! Owns the broker transport and the network under it.  While not
//! connected it retries every `reconnect_interval_ms`; while connected it
//! drains inbound commands and publishes a heartbeat every
//! `heartbeat_interval_ms`.
//!
//! ```text
//!            connect()          session up
//!  Disconnected ───▶ Connecting ─────────▶ Connected
//!       ▲   │  WiFi down          │ timeout     │ session lost / WiFi down
//!       │   └────────▶ Error ◀────┘             │
//!       └───────────────────────────────────────┘
//! ```
//!
//! Connection-state changes are queued and handed to the orchestrator from
//! inside `update`, never from `connect`/`disconnect` directly.

use heapless::Deque;
use log::{debug, info, warn};

use super::device_id::{ClientId, client_id};
use super::transport::BrokerTransport;
use super::wifi::ConnectivityPort;
use super::wire::{Topics, decode_command, encode_heartbeat, encode_status, encode_weight};
use crate::app::events::DeviceId;
use crate::app::ports::{ConnectionState, LinkEvent, LinkPort};
use crate::config::LinkConfig;

/// How long a started session may take to come up.
pub const CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Inbound messages handled per `update` call.
pub const MAX_INBOUND_PER_UPDATE: usize = 4;

const PENDING_CAPACITY: usize = 8;

pub const STATUS_CONNECTED: &str = "CONNECTED";
pub const STATUS_DISCONNECTING: &str = "DISCONNECTING";

pub struct EdgeLink<T, N> {
    transport: T,
    network: N,
    config: LinkConfig,
    device_id: DeviceId,
    client_id: ClientId,
    topics: Topics,
    state: ConnectionState,
    started: bool,
    now_ms: u64,
    last_attempt_ms: u64,
    connecting_since_ms: Option<u64>,
    last_heartbeat_ms: u64,
    pending: Deque<LinkEvent, PENDING_CAPACITY>,
}

impl<T: BrokerTransport, N: ConnectivityPort> EdgeLink<T, N> {
    pub fn new(transport: T, network: N, device_id: &str, config: LinkConfig) -> Self {
        let mut id = DeviceId::new();
        for c in device_id.chars() {
            if id.push(c).is_err() {
                break;
            }
        }
        let topics = Topics::new(&config.topic_prefix, &id);
        Self {
            transport,
            network,
            client_id: client_id(&id),
            device_id: id,
            topics,
            config,
            state: ConnectionState::Disconnected,
            started: false,
            now_ms: 0,
            last_attempt_ms: 0,
            connecting_since_ms: None,
            last_heartbeat_ms: 0,
            pending: Deque::new(),
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        info!("Edge: {} -> {}", self.state.as_str(), state.as_str());
        self.state = state;
        if self.pending.is_full() {
            warn!("Edge: event queue full, dropping oldest");
            self.pending.pop_front();
        }
        let _ = self.pending.push_back(LinkEvent::ConnectionChanged(state));
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        match self.transport.publish(topic, payload) {
            Ok(()) => true,
            Err(e) => {
                warn!("Edge: publish to {} failed: {}", topic, e);
                false
            }
        }
    }

    fn publish_status(&mut self, status: &str) -> bool {
        let payload = match encode_status(&self.device_id, status, self.now_ms) {
            Ok(p) => p,
            Err(e) => {
                warn!("Edge: {}", e);
                return false;
            }
        };
        let topic = self.topics.status.clone();
        self.publish(&topic, &payload)
    }

    fn session_up(&mut self, now_ms: u64) {
        self.connecting_since_ms = None;
        let command_topic = self.topics.command.clone();
        match self.transport.subscribe(&command_topic) {
            Ok(()) => info!("Edge: subscribed to {}", command_topic),
            Err(e) => warn!("Edge: subscribe to {} failed: {}", command_topic, e),
        }
        self.set_state(ConnectionState::Connected);
        self.last_heartbeat_ms = now_ms;
        self.publish_status(STATUS_CONNECTED);
    }

    fn send_heartbeat(&mut self, now_ms: u64) {
        self.last_heartbeat_ms = now_ms;
        match encode_heartbeat(&self.device_id, now_ms) {
            Ok(payload) => {
                let topic = self.topics.status.clone();
                self.publish(&topic, &payload);
            }
            Err(e) => warn!("Edge: {}", e),
        }
    }

    fn drain_inbound(&mut self, now_ms: u64, on_event: &mut dyn FnMut(LinkEvent)) {
        for _ in 0..MAX_INBOUND_PER_UPDATE {
            let Some(message) = self.transport.poll_inbound() else {
                break;
            };
            if message.topic != self.topics.command {
                debug!("Edge: ignoring message on {}", message.topic);
                continue;
            }
            match decode_command(&message.payload, now_ms) {
                Ok(command) => {
                    info!("Edge: command {}", command.command.tag());
                    on_event(LinkEvent::Command(command));
                }
                Err(e) => warn!("Edge: rejected command: {}", e),
            }
        }
    }
}

impl<T: BrokerTransport, N: ConnectivityPort> LinkPort for EdgeLink<T, N> {
    fn begin(&mut self, now_ms: u64) {
        self.started = true;
        self.now_ms = now_ms;
        self.last_attempt_ms = now_ms;
        info!(
            "Edge: broker {}:{} as {}",
            self.config.broker_host, self.config.broker_port, self.client_id
        );
        if !self.network.is_connected() {
            if let Err(e) = self.network.connect(now_ms) {
                warn!("Edge: network: {}", e);
            }
        }
    }

    fn connect(&mut self, now_ms: u64) -> bool {
        self.now_ms = now_ms;
        self.last_attempt_ms = now_ms;
        if self.is_connected() {
            return true;
        }
        if !self.network.is_connected() {
            warn!("Edge: WiFi not connected, cannot reach broker");
            self.set_state(ConnectionState::Error);
            return false;
        }
        self.set_state(ConnectionState::Connecting);
        let client_id = self.client_id.clone();
        let host = self.config.broker_host.clone();
        if let Err(e) = self
            .transport
            .connect(&client_id, &host, self.config.broker_port)
        {
            warn!("Edge: broker connect failed: {}", e);
            self.set_state(ConnectionState::Error);
            return false;
        }
        if self.transport.is_connected() {
            self.session_up(now_ms);
            true
        } else {
            self.connecting_since_ms = Some(now_ms);
            false
        }
    }

    fn disconnect(&mut self) {
        if self.is_connected() {
            self.publish_status(STATUS_DISCONNECTING);
        }
        self.transport.disconnect();
        self.connecting_since_ms = None;
        self.set_state(ConnectionState::Disconnected);
    }

    fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.transport.is_connected()
    }

    fn connection_state(&self) -> ConnectionState {
        self.state
    }

    fn send_weight(&mut self, device_id: &str, grams: f32, timestamp_ms: u64) -> bool {
        if !self.is_connected() {
            debug!("Edge: weight not sent, not connected");
            return false;
        }
        let payload = match encode_weight(device_id, grams, timestamp_ms) {
            Ok(p) => p,
            Err(e) => {
                warn!("Edge: {}", e);
                return false;
            }
        };
        let topic = self.topics.weight.clone();
        let sent = self.publish(&topic, &payload);
        if sent {
            info!("Edge: weight sent {:.1}g", grams);
        }
        sent
    }

    fn send_status(&mut self, status: &str) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.publish_status(status)
    }

    fn update(&mut self, now_ms: u64, on_event: &mut dyn FnMut(LinkEvent)) {
        self.now_ms = now_ms;
        self.network.poll(now_ms);

        match self.state {
            ConnectionState::Connected => {
                if !self.network.is_connected() {
                    warn!("Edge: WiFi lost");
                    self.set_state(ConnectionState::Error);
                } else if !self.transport.is_connected() {
                    warn!("Edge: broker session lost");
                    self.set_state(ConnectionState::Disconnected);
                }
            }
            ConnectionState::Connecting => {
                if self.transport.is_connected() {
                    self.session_up(now_ms);
                } else if self
                    .connecting_since_ms
                    .is_some_and(|since| now_ms.saturating_sub(since) >= CONNECT_TIMEOUT_MS)
                {
                    warn!("Edge: broker connect timed out");
                    self.transport.disconnect();
                    self.connecting_since_ms = None;
                    self.set_state(ConnectionState::Error);
                }
            }
            ConnectionState::Disconnected | ConnectionState::Error => {
                if self.started
                    && now_ms.saturating_sub(self.last_attempt_ms)
                        >= self.config.reconnect_interval_ms
                {
                    info!("Edge: attempting to reconnect");
                    self.connect(now_ms);
                }
            }
        }

        while let Some(event) = self.pending.pop_front() {
            on_event(event);
        }

        if self.state == ConnectionState::Connected {
            self.drain_inbound(now_ms, on_event);
            if now_ms.saturating_sub(self.last_heartbeat_ms) >= self.config.heartbeat_interval_ms {
                self.send_heartbeat(now_ms);
            }
        }
    }
}
