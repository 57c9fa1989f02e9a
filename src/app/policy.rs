//! Cross-cutting measurement policies.
//!
//! Both policies are pure: they look at the measurement snapshot and the
//! configuration and answer a question.  The orchestrator decides what to
//! do with the answer.

use crate::config::{HYSTERESIS_RATIO, REPORT_INTERVAL_MS, WEIGHT_REPORT_DELTA_G};
use crate::fsm::context::Measurement;

/// Upper edge of the band: strictly above the threshold.
pub fn exceeds_threshold(weight_g: f32, threshold_g: f32) -> bool {
    weight_g > threshold_g
}

/// Lower edge of the band: strictly below `threshold × 0.9`.
pub fn released_below(weight_g: f32, threshold_g: f32) -> bool {
    weight_g < threshold_g * HYSTERESIS_RATIO
}

// ── Threshold hysteresis ──────────────────────────────────────

/// Two-level threshold with a sticky band between release and trip.
///
/// Keeps its own "was exceeded" flag.  It never emits threshold events;
/// those belong to the ThresholdExceeded entry/exit actions, so
/// re-evaluating the same weight can never double-fire.  The orchestrator
/// keeps the flag in step with the FSM state through [`sync`](Self::sync).
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdHysteresis {
    exceeded: bool,
}

impl ThresholdHysteresis {
    pub const fn new() -> Self {
        Self { exceeded: false }
    }

    /// Feed a weight.  Returns the new flag value on an edge.
    pub fn update(&mut self, weight_g: f32, threshold_g: f32) -> Option<bool> {
        let next = if self.exceeded {
            !released_below(weight_g, threshold_g)
        } else {
            exceeds_threshold(weight_g, threshold_g)
        };
        if next == self.exceeded {
            return None;
        }
        self.exceeded = next;
        Some(next)
    }

    /// Force the flag.  Returns the new value if it changed.
    pub fn sync(&mut self, exceeded: bool) -> Option<bool> {
        if exceeded == self.exceeded {
            return None;
        }
        self.exceeded = exceeded;
        Some(exceeded)
    }

    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }
}

// ── Report throttle ───────────────────────────────────────────

/// Decides when a weight report is due.
#[derive(Debug, Clone, Copy)]
pub struct ReportThrottle {
    interval_ms: u64,
    min_delta_g: f32,
}

impl Default for ReportThrottle {
    fn default() -> Self {
        Self::new(REPORT_INTERVAL_MS, WEIGHT_REPORT_DELTA_G)
    }
}

impl ReportThrottle {
    pub const fn new(interval_ms: u64, min_delta_g: f32) -> Self {
        Self {
            interval_ms,
            min_delta_g,
        }
    }

    /// A report is due when none has succeeded yet, when the last one is
    /// `interval_ms` old, or when the weight has moved by `min_delta_g`.
    pub fn is_due(&self, m: &Measurement, now_ms: u64) -> bool {
        let Some(last) = m.last_report_ms else {
            return true;
        };
        now_ms.saturating_sub(last) >= self.interval_ms
            || (m.current_weight - m.last_reported_weight).abs() >= self.min_delta_g
    }
}
