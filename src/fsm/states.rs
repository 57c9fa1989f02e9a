//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers.  Entry and exit actions
//! never touch hardware; they mark the device status and queue
//! [`Effect`]s that the orchestrator applies right after the transition.
//!
//! ```text
//!  INITIALIZING ──[sensor+led ready]──▶ CALIBRATING ──[5 s since boot]──▶ IDLE
//!                                                                         │
//!                                                             [new sample]│
//!                                                                         ▼
//!  THRESHOLD_EXCEEDED ◀──[w > T]── MEASURING ◀──[w < 0.9 T]── THRESHOLD_EXCEEDED
//!
//!  Any state ──[link Error]──▶ COMMUNICATION_ERROR ──[link Connected]──▶ IDLE
//!  Any state ──[MAINTENANCE]──▶ MAINTENANCE ──[RESUME]──▶ IDLE
//! ```

use super::context::{DeviceStatus, Effect, FsmContext};
use super::{StateDescriptor, StateId};
use crate::app::policy;
use crate::app::ports::{BlinkPattern, ConnectionState};
use crate::config::{
    CALIBRATING_MESSAGE, CALIBRATING_MESSAGE_MS, CALIBRATION_DURATION_MS, COMM_ERROR_MESSAGE,
    COMM_ERROR_MESSAGE_MS, MAINTENANCE_MESSAGE,
};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Initializing,
            name: "Initializing",
            on_enter: Some(initializing_enter),
            on_exit: None,
            on_update: initializing_update,
        },
        StateDescriptor {
            id: StateId::Calibrating,
            name: "Calibrating",
            on_enter: Some(calibrating_enter),
            on_exit: None,
            on_update: calibrating_update,
        },
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        StateDescriptor {
            id: StateId::Measuring,
            name: "Measuring",
            on_enter: Some(measuring_enter),
            on_exit: None,
            on_update: measuring_update,
        },
        StateDescriptor {
            id: StateId::ThresholdExceeded,
            name: "ThresholdExceeded",
            on_enter: Some(exceeded_enter),
            on_exit: Some(exceeded_exit),
            on_update: exceeded_update,
        },
        StateDescriptor {
            id: StateId::CommunicationError,
            name: "CommunicationError",
            on_enter: Some(comm_error_enter),
            on_exit: None,
            on_update: comm_error_update,
        },
        StateDescriptor {
            id: StateId::Maintenance,
            name: "Maintenance",
            on_enter: Some(maintenance_enter),
            on_exit: None,
            on_update: maintenance_update,
        },
    ]
}

/// Checked first by every state except CommunicationError itself.
fn link_guard(ctx: &FsmContext) -> Option<StateId> {
    ctx.link_failed().then_some(StateId::CommunicationError)
}

// ═══════════════════════════════════════════════════════════════════════════
//  INITIALIZING
// ═══════════════════════════════════════════════════════════════════════════

fn initializing_enter(ctx: &mut FsmContext) {
    ctx.push_effect(Effect::Led(BlinkPattern::FastBlink));
    ctx.device_status = DeviceStatus::Initializing;
}

fn initializing_update(ctx: &mut FsmContext) -> Option<StateId> {
    if let Some(next) = link_guard(ctx) {
        return Some(next);
    }
    (ctx.sensor_ready && ctx.actuator_ready).then_some(StateId::Calibrating)
}

// ═══════════════════════════════════════════════════════════════════════════
//  CALIBRATING
// ═══════════════════════════════════════════════════════════════════════════

fn calibrating_enter(ctx: &mut FsmContext) {
    ctx.push_effect(Effect::Led(BlinkPattern::Pulse));
    ctx.push_effect(Effect::ShowStatus {
        text: CALIBRATING_MESSAGE,
        timeout_ms: CALIBRATING_MESSAGE_MS,
    });
    if ctx.config.auto_tare {
        ctx.push_effect(Effect::Tare);
    }
    info!(
        "CALIBRATING: factor {:.3}, auto-tare {}",
        ctx.config.calibration_factor,
        if ctx.config.auto_tare { "on" } else { "off" }
    );
}

fn calibrating_update(ctx: &mut FsmContext) -> Option<StateId> {
    if let Some(next) = link_guard(ctx) {
        return Some(next);
    }
    (ctx.uptime_ms() >= CALIBRATION_DURATION_MS).then_some(StateId::Idle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.push_effect(Effect::Led(BlinkPattern::Off));
    ctx.device_status = DeviceStatus::Ready;
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    if let Some(next) = link_guard(ctx) {
        return Some(next);
    }
    ctx.new_data.then_some(StateId::Measuring)
}

// ═══════════════════════════════════════════════════════════════════════════
//  MEASURING
// ═══════════════════════════════════════════════════════════════════════════

fn measuring_enter(ctx: &mut FsmContext) {
    ctx.device_status = DeviceStatus::Active;
}

fn measuring_update(ctx: &mut FsmContext) -> Option<StateId> {
    if let Some(next) = link_guard(ctx) {
        return Some(next);
    }
    let weight = ctx.measurement.current_weight;
    let threshold = ctx.config.weight_threshold_g;
    if policy::exceeds_threshold(weight, threshold) {
        info!(
            "MEASURING: {:.1}g > {:.1}g threshold",
            weight, threshold
        );
        return Some(StateId::ThresholdExceeded);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  THRESHOLD_EXCEEDED
// ═══════════════════════════════════════════════════════════════════════════

fn exceeded_enter(ctx: &mut FsmContext) {
    ctx.push_effect(Effect::Led(BlinkPattern::On));
    ctx.push_effect(Effect::ThresholdChanged(true));
    warn!(
        "THRESHOLD_EXCEEDED: {:.1}g over {:.1}g limit",
        ctx.measurement.current_weight, ctx.config.weight_threshold_g
    );
}

fn exceeded_exit(ctx: &mut FsmContext) {
    ctx.push_effect(Effect::ThresholdChanged(false));
}

fn exceeded_update(ctx: &mut FsmContext) -> Option<StateId> {
    if let Some(next) = link_guard(ctx) {
        return Some(next);
    }
    policy::released_below(ctx.measurement.current_weight, ctx.config.weight_threshold_g)
        .then_some(StateId::Measuring)
}

// ═══════════════════════════════════════════════════════════════════════════
//  COMMUNICATION_ERROR
// ═══════════════════════════════════════════════════════════════════════════

fn comm_error_enter(ctx: &mut FsmContext) {
    ctx.push_effect(Effect::Led(BlinkPattern::FastBlink));
    ctx.push_effect(Effect::ShowError {
        text: COMM_ERROR_MESSAGE,
        timeout_ms: COMM_ERROR_MESSAGE_MS,
    });
    ctx.device_status = DeviceStatus::Error;
    warn!("COMMUNICATION_ERROR: edge link failed, waiting for reconnect");
}

fn comm_error_update(ctx: &mut FsmContext) -> Option<StateId> {
    (ctx.link == ConnectionState::Connected).then_some(StateId::Idle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  MAINTENANCE
// ═══════════════════════════════════════════════════════════════════════════

fn maintenance_enter(ctx: &mut FsmContext) {
    ctx.push_effect(Effect::Led(BlinkPattern::SlowBlink));
    ctx.push_effect(Effect::ShowStatus {
        text: MAINTENANCE_MESSAGE,
        timeout_ms: 0,
    });
    ctx.device_status = DeviceStatus::Maintenance;
}

fn maintenance_update(ctx: &mut FsmContext) -> Option<StateId> {
    link_guard(ctx)
}
