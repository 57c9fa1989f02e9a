//! Orchestrator: the hexagonal core.
//!
//! [`Orchestrator`] owns the capabilities, the FSM and the measurement
//! policies.  Each call to [`Orchestrator::tick`] runs one cooperative
//! cycle:
//!
//! ```text
//!  1. poll   sensor ─▶ led ─▶ display ─▶ link      (handlers run inline)
//!  2. FSM    one rule for the current state        (link guard first)
//!  3. policy report throttle
//!  4. effect weight screen · device status publish
//! ```
//!
//! Sensor samples, edge commands and connection changes arrive through
//! handlers passed into the capability's `update`.  Any state change they
//! cause goes through the same FSM transition path as tick rules, and the
//! resulting entry/exit effects are applied before `update` returns.

use log::{debug, info, warn};

use crate::config::{SystemConfig, TARE_MESSAGE, TARE_MESSAGE_MS};
use crate::fsm::context::{DeviceStatus, Effect, FsmContext, Measurement};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId, Transition};

use super::commands::Command;
use super::events::{AppEvent, DeviceId, StatusReport};
use super::policy::{ReportThrottle, ThresholdHysteresis};
use super::ports::{
    BlinkPattern, ConnectionState, DisplayPort, EventSink, LedPort, LinkEvent, LinkPort,
    WeightSensorPort,
};

const WEIGHT_STATUS_NORMAL: &str = "NORMAL";
const WEIGHT_STATUS_OVER: &str = "OVER LIMIT";

// ───────────────────────────────────────────────────────────────
// Effect targets
// ───────────────────────────────────────────────────────────────

/// The capabilities FSM effects and commands act on.  The link is kept
/// out so that it can be borrowed by its own `update` while handlers run.
struct Effectors<'a, S, A, D> {
    sensor: &'a mut S,
    led: &'a mut A,
    display: &'a mut D,
}

impl<S: WeightSensorPort, A: LedPort, D: DisplayPort> Effectors<'_, S, A, D> {
    fn apply(&mut self, effect: Effect, sink: &mut impl EventSink) {
        match effect {
            Effect::Led(pattern) => self.led.set_pattern(pattern),
            Effect::ShowStatus { text, timeout_ms } => self.display.show_status(text, timeout_ms),
            Effect::ShowError { text, timeout_ms } => self.display.show_error(text, timeout_ms),
            Effect::Tare => self.sensor.tare(),
            Effect::ThresholdChanged(exceeded) => {
                sink.emit(&AppEvent::ThresholdChanged(exceeded));
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Core (everything except the capabilities)
// ───────────────────────────────────────────────────────────────

struct Core {
    fsm: Fsm,
    ctx: FsmContext,
    device_id: DeviceId,
    hysteresis: ThresholdHysteresis,
    throttle: ReportThrottle,
    /// Last device status announced through the sink.
    announced_status: DeviceStatus,
    /// Last device status accepted by the link.
    published_status: Option<DeviceStatus>,
}

impl Core {
    fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    // ── Transitions ───────────────────────────────────────────

    fn change_state<S, A, D>(
        &mut self,
        to: StateId,
        fx: &mut Effectors<'_, S, A, D>,
        sink: &mut impl EventSink,
    ) where
        S: WeightSensorPort,
        A: LedPort,
        D: DisplayPort,
    {
        let transition = self.fsm.force_transition(to, &mut self.ctx);
        self.settle(transition, fx, sink);
    }

    fn evaluate<S, A, D>(&mut self, fx: &mut Effectors<'_, S, A, D>, sink: &mut impl EventSink)
    where
        S: WeightSensorPort,
        A: LedPort,
        D: DisplayPort,
    {
        let transition = self.fsm.tick(&mut self.ctx);
        self.settle(transition, fx, sink);
    }

    fn settle<S, A, D>(
        &mut self,
        transition: Option<Transition>,
        fx: &mut Effectors<'_, S, A, D>,
        sink: &mut impl EventSink,
    ) where
        S: WeightSensorPort,
        A: LedPort,
        D: DisplayPort,
    {
        let Some(Transition { from, to }) = transition else {
            return;
        };
        sink.emit(&AppEvent::StateChanged { from, to });
        self.drain_effects(fx, sink);
        self.sync_threshold_flag();
        self.announce_status(sink);
    }

    /// The exceeded flag follows the state, whichever path left or
    /// entered ThresholdExceeded.
    fn sync_threshold_flag(&mut self) {
        let exceeded = self.state() == StateId::ThresholdExceeded;
        if let Some(flag) = self.hysteresis.sync(exceeded) {
            debug!("Threshold flag -> {}", flag);
        }
        self.ctx.measurement.threshold_exceeded = exceeded;
    }

    fn drain_effects<S, A, D>(&mut self, fx: &mut Effectors<'_, S, A, D>, sink: &mut impl EventSink)
    where
        S: WeightSensorPort,
        A: LedPort,
        D: DisplayPort,
    {
        while let Some(effect) = self.ctx.take_effect() {
            fx.apply(effect, sink);
        }
    }

    fn announce_status(&mut self, sink: &mut impl EventSink) {
        let status = self.ctx.device_status;
        if status == self.announced_status {
            return;
        }
        info!("Device status: {}", status.as_str());
        sink.emit(&AppEvent::DeviceStatusChanged {
            from: self.announced_status,
            to: status,
        });
        self.announced_status = status;
    }

    // ── Capability handlers ───────────────────────────────────

    fn on_weight(&mut self, grams: f32, sink: &mut impl EventSink) {
        let m = &mut self.ctx.measurement;
        m.current_weight = grams;
        m.last_measurement_ms = Some(self.ctx.now_ms);
        debug!("Weight sample: {:.1}g", grams);
        sink.emit(&AppEvent::WeightSample(grams));
    }

    fn on_link_event<S, A, D>(
        &mut self,
        event: LinkEvent,
        fx: &mut Effectors<'_, S, A, D>,
        sink: &mut impl EventSink,
    ) where
        S: WeightSensorPort,
        A: LedPort,
        D: DisplayPort,
    {
        match event {
            LinkEvent::Command(cmd) => {
                info!(
                    "Edge command {} (ts={})",
                    cmd.command.tag(),
                    cmd.timestamp_ms
                );
                self.apply_command(cmd.command, fx, sink);
            }
            LinkEvent::ConnectionChanged(state) => self.on_connection_state(state, fx, sink),
        }
    }

    fn on_connection_state<S, A, D>(
        &mut self,
        state: ConnectionState,
        fx: &mut Effectors<'_, S, A, D>,
        sink: &mut impl EventSink,
    ) where
        S: WeightSensorPort,
        A: LedPort,
        D: DisplayPort,
    {
        self.ctx.link = state;
        sink.emit(&AppEvent::LinkChanged(state));
        fx.display.show_link(state == ConnectionState::Connected);
        match state {
            ConnectionState::Error => self.change_state(StateId::CommunicationError, fx, sink),
            ConnectionState::Connected if self.state() == StateId::CommunicationError => {
                self.change_state(StateId::Idle, fx, sink);
            }
            _ => {}
        }
    }

    fn apply_command<S, A, D>(
        &mut self,
        command: Command,
        fx: &mut Effectors<'_, S, A, D>,
        sink: &mut impl EventSink,
    ) where
        S: WeightSensorPort,
        A: LedPort,
        D: DisplayPort,
    {
        match command {
            Command::SetThreshold(grams) => {
                if !self.set_threshold(grams, sink) {
                    return;
                }
            }
            Command::LedOn => fx.led.set_pattern(BlinkPattern::On),
            Command::LedOff => fx.led.set_pattern(BlinkPattern::Off),
            Command::Tare => {
                fx.sensor.tare();
                fx.display.show_status(TARE_MESSAGE, TARE_MESSAGE_MS);
            }
            Command::Calibrate => self.change_state(StateId::Calibrating, fx, sink),
            Command::Maintenance => self.change_state(StateId::Maintenance, fx, sink),
            Command::Resume => self.change_state(StateId::Idle, fx, sink),
        }
        sink.emit(&AppEvent::CommandApplied(command));
    }

    fn set_threshold(&mut self, grams: f32, sink: &mut impl EventSink) -> bool {
        if !grams.is_finite() || grams <= 0.0 {
            warn!("Rejected weight threshold {}", grams);
            return false;
        }
        info!(
            "Weight threshold: {:.1}g -> {:.1}g",
            self.ctx.config.weight_threshold_g, grams
        );
        self.ctx.config.weight_threshold_g = grams;
        sink.emit(&AppEvent::ThresholdUpdated(grams));
        true
    }

    // ── Policies and side effects ─────────────────────────────

    fn run_policies(&mut self, link: &mut impl LinkPort, sink: &mut impl EventSink) {
        let weight = self.ctx.measurement.current_weight;
        let now = self.ctx.now_ms;
        if self.ctx.measurement.last_measurement_ms.is_none()
            || !link.is_connected()
            || !self.throttle.is_due(&self.ctx.measurement, now)
        {
            return;
        }
        if link.send_weight(&self.device_id, weight, now) {
            self.ctx.measurement.record_report(now);
            sink.emit(&AppEvent::WeightReported {
                grams: weight,
                timestamp_ms: now,
            });
        }
    }

    fn refresh_display(&self, display: &mut impl DisplayPort) {
        if !matches!(
            self.state(),
            StateId::Idle | StateId::Measuring | StateId::ThresholdExceeded
        ) {
            return;
        }
        let status = if self.ctx.measurement.threshold_exceeded {
            WEIGHT_STATUS_OVER
        } else {
            WEIGHT_STATUS_NORMAL
        };
        display.show_weight(self.ctx.measurement.current_weight, status);
    }

    fn publish_status(&mut self, link: &mut impl LinkPort) {
        let status = self.ctx.device_status;
        if self.published_status == Some(status) || !link.is_connected() {
            return;
        }
        if link.send_status(status.as_str()) {
            self.published_status = Some(status);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Orchestrator
// ───────────────────────────────────────────────────────────────

/// Owns the capabilities and all system state.
pub struct Orchestrator<S, A, D, L> {
    sensor: S,
    led: A,
    display: D,
    link: L,
    core: Core,
}

impl<S, A, D, L> Orchestrator<S, A, D, L>
where
    S: WeightSensorPort,
    A: LedPort,
    D: DisplayPort,
    L: LinkPort,
{
    /// Wire the capabilities together.
    ///
    /// Does **not** start anything; call [`start`](Self::start) next.
    /// An invalid `config` is replaced by the defaults.
    pub fn new(sensor: S, led: A, display: D, link: L, device_id: &str, config: SystemConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!("{}; falling back to defaults", e);
                SystemConfig::default()
            }
        };

        let mut id = DeviceId::new();
        for c in device_id.chars() {
            if id.push(c).is_err() {
                warn!("Device id '{}' truncated to '{}'", device_id, id);
                break;
            }
        }

        let core = Core {
            fsm: Fsm::new(build_state_table(), StateId::Initializing),
            ctx: FsmContext::new(config),
            device_id: id,
            hysteresis: ThresholdHysteresis::new(),
            throttle: ReportThrottle::default(),
            announced_status: DeviceStatus::Initializing,
            published_status: None,
        };

        Self {
            sensor,
            led,
            display,
            link,
            core,
        }
    }

    fn split(&mut self) -> (&mut Core, Effectors<'_, S, A, D>, &mut L) {
        let Self {
            sensor,
            led,
            display,
            link,
            core,
        } = self;
        (core, Effectors { sensor, led, display }, link)
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot sequence: display and boot screen, Initializing entry, then
    /// bring up the sensor, the LED and the link.
    pub fn start(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        let (core, mut fx, link) = self.split();
        core.ctx.boot_ms = now_ms;
        core.ctx.now_ms = now_ms;

        if let Err(e) = fx.display.begin() {
            warn!("Display init failed: {}", e);
        }
        fx.display.show_boot(&core.device_id);

        core.fsm.start(&mut core.ctx);
        core.drain_effects(&mut fx, sink);

        fx.sensor
            .set_calibration_factor(core.ctx.config.calibration_factor);
        if let Err(e) = fx.sensor.begin() {
            warn!("Weight sensor init failed: {}", e);
        }
        if let Err(e) = fx.led.begin() {
            warn!("Status LED init failed: {}", e);
        }
        link.begin(now_ms);

        core.ctx.sensor_ready = fx.sensor.is_ready();
        core.ctx.actuator_ready = fx.led.is_initialized();

        let state = core.state();
        sink.emit(&AppEvent::Started(state));
        info!("Orchestrator started in {:?} (device {})", state, core.device_id);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one cooperative cycle.  Never blocks.
    pub fn tick(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        let Self {
            sensor,
            led,
            display,
            link,
            core,
        } = self;
        core.ctx.now_ms = now_ms;

        // 1. Capabilities, fixed order.
        sensor.update(now_ms, &mut |grams: f32| core.on_weight(grams, &mut *sink));
        core.ctx.sensor_ready = sensor.is_ready();
        core.ctx.new_data = sensor.has_new_data();

        led.update(now_ms);
        core.ctx.actuator_ready = led.is_initialized();

        display.update(now_ms);

        link.update(now_ms, &mut |event: LinkEvent| {
            let mut fx = Effectors {
                sensor: &mut *sensor,
                led: &mut *led,
                display: &mut *display,
            };
            core.on_link_event(event, &mut fx, &mut *sink);
        });

        // 2. State machine.
        let mut fx = Effectors {
            sensor,
            led,
            display,
        };
        core.evaluate(&mut fx, sink);

        // 3. Policies.
        core.run_policies(link, sink);

        // 4. Side effects.
        core.refresh_display(fx.display);
        core.publish_status(link);
    }

    // ── Commands ──────────────────────────────────────────────

    /// Apply a command from a local caller exactly as if the edge sent it.
    pub fn handle_command(&mut self, command: Command, sink: &mut impl EventSink) {
        let (core, mut fx, _) = self.split();
        core.apply_command(command, &mut fx, sink);
    }

    /// Idle → Measuring.  `false` from any other state.
    pub fn start_measurement(&mut self, sink: &mut impl EventSink) -> bool {
        if self.state() != StateId::Idle {
            return false;
        }
        let (core, mut fx, _) = self.split();
        core.change_state(StateId::Measuring, &mut fx, sink);
        true
    }

    /// Measuring or ThresholdExceeded → Idle.  `false` from any other state.
    pub fn stop_measurement(&mut self, sink: &mut impl EventSink) -> bool {
        if !matches!(
            self.state(),
            StateId::Measuring | StateId::ThresholdExceeded
        ) {
            return false;
        }
        let (core, mut fx, _) = self.split();
        core.change_state(StateId::Idle, &mut fx, sink);
        true
    }

    pub fn calibrate(&mut self, sink: &mut impl EventSink) {
        self.handle_command(Command::Calibrate, sink);
    }

    pub fn tare(&mut self, sink: &mut impl EventSink) {
        self.handle_command(Command::Tare, sink);
    }

    // ── Configuration setters ─────────────────────────────────

    pub fn set_weight_threshold(&mut self, grams: f32, sink: &mut impl EventSink) -> bool {
        self.core.set_threshold(grams, sink)
    }

    /// Store the factor and forward it to the load cell.
    pub fn set_calibration_factor(&mut self, factor: f32) -> bool {
        if !factor.is_finite() || factor == 0.0 {
            warn!("Rejected calibration factor {}", factor);
            return false;
        }
        self.core.ctx.config.calibration_factor = factor;
        self.sensor.set_calibration_factor(factor);
        info!("Calibration factor set to {}", factor);
        true
    }

    /// Advisory cadence; stored and reported only.
    pub fn set_measurement_interval(&mut self, interval_ms: u32) -> bool {
        if interval_ms == 0 {
            warn!("Rejected zero measurement interval");
            return false;
        }
        self.core.ctx.config.measurement_interval_ms = interval_ms;
        true
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.core.state()
    }

    /// Upper-case state name, e.g. `THRESHOLD_EXCEEDED`.
    pub fn state_name(&self) -> &'static str {
        self.core.state().as_str()
    }

    pub fn device_status(&self) -> DeviceStatus {
        self.core.ctx.device_status
    }

    pub fn device_id(&self) -> &str {
        &self.core.device_id
    }

    pub fn config(&self) -> &SystemConfig {
        &self.core.ctx.config
    }

    pub fn measurement(&self) -> &Measurement {
        &self.core.ctx.measurement
    }

    /// True exactly while the FSM is in ThresholdExceeded.
    pub fn is_threshold_exceeded(&self) -> bool {
        self.core.hysteresis.is_exceeded()
    }

    /// Total ticks executed since construction.
    pub fn tick_count(&self) -> u64 {
        self.core.fsm.tick_count()
    }

    pub fn status_report(&self) -> StatusReport {
        let ctx = &self.core.ctx;
        StatusReport {
            device_id: self.core.device_id.clone(),
            state: self.state(),
            device_status: ctx.device_status,
            weight_g: ctx.measurement.current_weight,
            threshold_g: ctx.config.weight_threshold_g,
            threshold_exceeded: ctx.measurement.threshold_exceeded,
            link: self.link.connection_state(),
            uptime_ms: ctx.uptime_ms(),
        }
    }

    // ── Capability access ─────────────────────────────────────

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn led(&self) -> &A {
        &self.led
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}
