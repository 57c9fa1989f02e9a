//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the blackboard state handlers read from and write to:
//! readiness inputs sampled each tick, the measurement snapshot, the live
//! configuration, the device status, and an outbox of side effects that
//! entry/exit actions request.  The orchestrator drains the outbox into
//! the real capabilities right after each transition.

use heapless::Deque;
use log::warn;

use crate::app::ports::{BlinkPattern, ConnectionState};
use crate::config::SystemConfig;

// ---------------------------------------------------------------------------
// Measurement snapshot (written only by the orchestrator)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurement {
    /// Latest weight delivered by the sensor (grams).
    pub current_weight: f32,
    /// Weight carried by the last successful report.
    pub last_reported_weight: f32,
    /// When the sensor last delivered a sample.
    pub last_measurement_ms: Option<u64>,
    /// When the last report was accepted by the link.
    pub last_report_ms: Option<u64>,
    /// Hysteresis flag mirrored for display and status.
    pub threshold_exceeded: bool,
}

impl Measurement {
    /// Both report fields move together, and only on success.
    pub fn record_report(&mut self, now_ms: u64) {
        self.last_reported_weight = self.current_weight;
        self.last_report_ms = Some(now_ms);
    }
}

// ---------------------------------------------------------------------------
// Device status
// ---------------------------------------------------------------------------

/// Coarse status published to the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Initializing,
    Ready,
    Active,
    Error,
    Maintenance,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "INITIALIZING",
            Self::Ready => "READY",
            Self::Active => "ACTIVE",
            Self::Error => "ERROR",
            Self::Maintenance => "MAINTENANCE",
        }
    }
}

// ---------------------------------------------------------------------------
// Side effects (written by state handlers; applied by the orchestrator)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    Led(BlinkPattern),
    ShowStatus { text: &'static str, timeout_ms: u32 },
    ShowError { text: &'static str, timeout_ms: u32 },
    Tare,
    ThresholdChanged(bool),
}

/// Room for one exit plus one entry action list.
pub const EFFECT_CAPACITY: usize = 8;

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,
    /// Time of the current tick (ms since boot).
    pub now_ms: u64,
    /// Time the orchestrator started.
    pub boot_ms: u64,

    // -- Inputs sampled each tick --
    pub sensor_ready: bool,
    pub actuator_ready: bool,
    /// The sensor completed a fresh conversion this tick.
    pub new_data: bool,
    /// Last connection state reported by the link.
    pub link: ConnectionState,

    // -- Owned state --
    pub measurement: Measurement,
    pub config: SystemConfig,
    pub device_status: DeviceStatus,

    // -- Outbox --
    effects: Deque<Effect, EFFECT_CAPACITY>,
}

impl FsmContext {
    /// Create a new context with the given configuration.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            now_ms: 0,
            boot_ms: 0,
            sensor_ready: false,
            actuator_ready: false,
            new_data: false,
            link: ConnectionState::Disconnected,
            measurement: Measurement::default(),
            config,
            device_status: DeviceStatus::Initializing,
            effects: Deque::new(),
        }
    }

    /// Milliseconds since the orchestrator started.
    pub fn uptime_ms(&self) -> u64 {
        self.now_ms.saturating_sub(self.boot_ms)
    }

    /// `true` when the link has reported a failure.
    pub fn link_failed(&self) -> bool {
        self.link == ConnectionState::Error
    }

    /// Queue a side effect for the orchestrator.
    pub fn push_effect(&mut self, effect: Effect) {
        if let Err(dropped) = self.effects.push_back(effect) {
            warn!("FSM effect outbox full, dropping {:?}", dropped);
        }
    }

    /// Take the oldest pending side effect.
    pub fn take_effect(&mut self) -> Option<Effect> {
        self.effects.pop_front()
    }
}
