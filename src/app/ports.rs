//! Port traits: the hexagonal boundary between the orchestrator and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Orchestrator (domain)
//! ```
//!
//! Every capability exposes a non-blocking `update`.  Capabilities that
//! produce events (the weight sensor, the edge link) take a handler in
//! `update` and invoke it synchronously before returning, so the
//! orchestrator has fully reacted to an event before the next capability
//! is polled.

use crate::error::{ActuatorError, DisplayError, SensorError};

use super::commands::EdgeCommand;
use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Generic acquisition capability.
pub trait Sensor {
    /// Bring the device up.  Failing here leaves `is_ready()` false.
    fn begin(&mut self) -> Result<(), SensorError>;

    /// Current value.  When not ready, the last known value (or zero).
    fn read(&mut self) -> f32;

    fn is_ready(&self) -> bool;

    /// Poll the device.  Calls `on_data` for each sample worth reporting.
    fn update(&mut self, now_ms: u64, on_data: &mut dyn FnMut(f32));
}

/// Load-cell specific operations on top of [`Sensor`].
pub trait WeightSensorPort: Sensor {
    /// `true` when the most recent `update()` completed a fresh conversion.
    fn has_new_data(&self) -> bool;

    /// Zero the scale at the current load.
    fn tare(&mut self);

    /// Raw counts per gram.  Zero or non-finite factors are ignored.
    fn set_calibration_factor(&mut self, factor: f32);
}

// ───────────────────────────────────────────────────────────────
// Actuator ports (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Status LED waveforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlinkPattern {
    #[default]
    Off,
    On,
    /// 500 ms on / 500 ms off.
    SlowBlink,
    /// 100 ms on / 100 ms off.
    FastBlink,
    /// Triangular brightness ramp.
    Pulse,
}

/// Generic output capability.
pub trait Actuator {
    fn begin(&mut self) -> Result<(), ActuatorError>;

    /// Binary on/off request.
    fn set_state(&mut self, on: bool);

    /// Whether the output is doing anything at all.
    fn state(&self) -> bool;

    fn is_initialized(&self) -> bool;

    /// Advance any time-based output (blink phase, PWM ramp).
    fn update(&mut self, now_ms: u64);
}

/// LED-specific operations on top of [`Actuator`].
pub trait LedPort: Actuator {
    fn set_pattern(&mut self, pattern: BlinkPattern);
    fn pattern(&self) -> BlinkPattern;
}

// ───────────────────────────────────────────────────────────────
// Display port
// ───────────────────────────────────────────────────────────────

/// Which screen the display is currently rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Boot,
    Weight,
    Status,
    Error,
}

/// Character display.  Timed screens fall back to the weight screen once
/// their timeout elapses; a timeout of `0` keeps them up indefinitely.
pub trait DisplayPort {
    fn begin(&mut self) -> Result<(), DisplayError>;
    fn show_boot(&mut self, device_id: &str);
    fn show_weight(&mut self, grams: f32, status: &str);
    /// Broker link indicator on the weight screen.
    fn show_link(&mut self, connected: bool);
    fn show_status(&mut self, text: &str, timeout_ms: u32);
    fn show_error(&mut self, text: &str, timeout_ms: u32);
    fn update(&mut self, now_ms: u64);
    fn screen(&self) -> Screen;
}

// ───────────────────────────────────────────────────────────────
// Communication port
// ───────────────────────────────────────────────────────────────

/// Broker connection lifecycle as seen by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

/// Events a [`LinkPort`] delivers from inside `update`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkEvent {
    Command(EdgeCommand),
    ConnectionChanged(ConnectionState),
}

/// Publish/subscribe link to the edge.
///
/// Retry timing belongs to the adapter.  State changes caused by
/// `connect()`/`disconnect()` are delivered through the next `update()`.
pub trait LinkPort {
    fn begin(&mut self, now_ms: u64);

    /// Attempt a session now.  `true` when the session is up on return.
    fn connect(&mut self, now_ms: u64) -> bool;

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    fn connection_state(&self) -> ConnectionState;

    /// Publish a weight reading.  `false` when not connected or rejected.
    fn send_weight(&mut self, device_id: &str, grams: f32, timestamp_ms: u64) -> bool;

    /// Publish a status string.  `false` when not connected or rejected.
    fn send_status(&mut self, status: &str) -> bool;

    fn update(&mut self, now_ms: u64, on_event: &mut dyn FnMut(LinkEvent));
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
/// Weight-change and threshold-change observers hang off it.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}
