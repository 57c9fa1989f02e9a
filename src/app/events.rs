//! Outbound application events.
//!
//! The [`Orchestrator`](super::service::Orchestrator) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, display, test recorder).

use core::fmt;

use crate::fsm::StateId;
use crate::fsm::context::DeviceStatus;

use super::commands::Command;
use super::ports::ConnectionState;

/// Station identity, e.g. `TAVOLO_DEADBEEFCAFE`.
pub type DeviceId = heapless::String<32>;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The orchestrator has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// Threshold-exceeded flag flipped.  Fired only by ThresholdExceeded
    /// entry (`true`) and exit (`false`).
    ThresholdChanged(bool),

    /// The load cell delivered a new weight (grams).
    WeightSample(f32),

    /// A weight report was accepted by the link.
    WeightReported { grams: f32, timestamp_ms: u64 },

    /// A state entry action marked a new device status.
    DeviceStatusChanged { from: DeviceStatus, to: DeviceStatus },

    /// The link reported a new connection state.
    LinkChanged(ConnectionState),

    /// A command was accepted from the edge or a local caller.
    CommandApplied(Command),

    /// Weight threshold was replaced (grams).
    ThresholdUpdated(f32),

    /// Point-in-time system summary.
    Status(StatusReport),
}

/// A point-in-time summary suitable for logging or transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub device_id: DeviceId,
    pub state: StateId,
    pub device_status: DeviceStatus,
    pub weight_g: f32,
    pub threshold_g: f32,
    pub threshold_exceeded: bool,
    pub link: ConnectionState,
    pub uptime_ms: u64,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "device={} | state={} ({}) | weight={:.1}g threshold={:.1}g exceeded={} | \
             edge={} | uptime={}s",
            self.device_id,
            self.state.as_str(),
            self.device_status.as_str(),
            self.weight_g,
            self.threshold_g,
            if self.threshold_exceeded { "YES" } else { "NO" },
            self.link.as_str(),
            self.uptime_ms / 1000,
        )
    }
}
