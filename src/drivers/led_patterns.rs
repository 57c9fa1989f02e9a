//! Status LED waveform generator.
//!
//! Turns a [`BlinkPattern`] and a clock reading into a brightness level
//! (0–255).  The phase restarts whenever the pattern changes, so a newly
//! selected blink always begins with its "on" half.
//!
//! | Pattern    | Output                                   | Period  |
//! |------------|------------------------------------------|---------|
//! | Off        | 0                                        | n/a     |
//! | On         | 255                                      | n/a     |
//! | SlowBlink  | 500 ms on, 500 ms off                    | 1000 ms |
//! | FastBlink  | 100 ms on, 100 ms off                    | 200 ms  |
//! | Pulse      | ramp 0→255→0 in steps of 5 every 20 ms   | 2040 ms |

use crate::app::ports::BlinkPattern;

pub const SLOW_BLINK_HALF_MS: u64 = 500;
pub const FAST_BLINK_HALF_MS: u64 = 100;
pub const PULSE_STEP_MS: u64 = 20;
pub const PULSE_STEP: u8 = 5;

pub const LEVEL_OFF: u8 = 0;
pub const LEVEL_FULL: u8 = 255;

/// Duration of one ramp (0→255 or 255→0).
const PULSE_RAMP_MS: u64 = (LEVEL_FULL / PULSE_STEP) as u64 * PULSE_STEP_MS;

pub struct PatternGenerator {
    pattern: BlinkPattern,
    started_ms: Option<u64>,
}

impl Default for PatternGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternGenerator {
    pub const fn new() -> Self {
        Self {
            pattern: BlinkPattern::Off,
            started_ms: None,
        }
    }

    /// Select a pattern.  Re-selecting the active pattern keeps its phase.
    pub fn set(&mut self, pattern: BlinkPattern) {
        if pattern != self.pattern {
            self.pattern = pattern;
            self.started_ms = None;
        }
    }

    pub fn pattern(&self) -> BlinkPattern {
        self.pattern
    }

    /// Brightness at `now_ms`.  The first call after a pattern change
    /// anchors the phase.
    pub fn level(&mut self, now_ms: u64) -> u8 {
        let started = *self.started_ms.get_or_insert(now_ms);
        let phase = now_ms.saturating_sub(started);
        match self.pattern {
            BlinkPattern::Off => LEVEL_OFF,
            BlinkPattern::On => LEVEL_FULL,
            BlinkPattern::SlowBlink => square(phase, SLOW_BLINK_HALF_MS),
            BlinkPattern::FastBlink => square(phase, FAST_BLINK_HALF_MS),
            BlinkPattern::Pulse => triangle(phase),
        }
    }
}

fn square(phase_ms: u64, half_ms: u64) -> u8 {
    if phase_ms % (2 * half_ms) < half_ms {
        LEVEL_FULL
    } else {
        LEVEL_OFF
    }
}

fn triangle(phase_ms: u64) -> u8 {
    let pos = phase_ms % (2 * PULSE_RAMP_MS);
    let steps = if pos < PULSE_RAMP_MS {
        pos / PULSE_STEP_MS
    } else {
        (2 * PULSE_RAMP_MS - pos) / PULSE_STEP_MS
    };
    (steps * u64::from(PULSE_STEP)).min(u64::from(LEVEL_FULL)) as u8
}
