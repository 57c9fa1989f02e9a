//! Single-colour status LED on a PWM channel.
//!
//! ## Dual-target design
//!
//! Generic over [`SetDutyCycle`]: on ESP-IDF the channel is an LEDC
//! driver, on host/test a recording mock.  The duty cycle is only
//! rewritten when the pattern level changes.

use embedded_hal::pwm::SetDutyCycle;
use log::{info, warn};

use crate::app::ports::{Actuator, BlinkPattern, LedPort};
use crate::drivers::led_patterns::{LEVEL_FULL, LEVEL_OFF, PatternGenerator};
use crate::error::ActuatorError;

/// Called with the new on/off state whenever it flips.
pub type StateListener = Box<dyn FnMut(bool) + Send>;

pub struct LedActuator<P> {
    pwm: P,
    generator: PatternGenerator,
    level: Option<u8>,
    initialized: bool,
    listener: Option<StateListener>,
}

impl<P: SetDutyCycle> LedActuator<P> {
    pub fn new(pwm: P) -> Self {
        Self {
            pwm,
            generator: PatternGenerator::new(),
            level: None,
            initialized: false,
            listener: None,
        }
    }

    pub fn set_state_listener(&mut self, listener: StateListener) {
        self.listener = Some(listener);
    }

    /// Last level written to the channel.
    pub fn level(&self) -> u8 {
        self.level.unwrap_or(LEVEL_OFF)
    }

    fn write_level(&mut self, level: u8) -> Result<(), ActuatorError> {
        if self.level == Some(level) {
            return Ok(());
        }
        self.pwm
            .set_duty_cycle_fraction(u16::from(level), u16::from(LEVEL_FULL))
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        self.level = Some(level);
        Ok(())
    }

    fn select(&mut self, pattern: BlinkPattern) {
        let was_on = self.state();
        self.generator.set(pattern);
        let is_on = self.state();
        if was_on != is_on {
            if let Some(listener) = self.listener.as_mut() {
                listener(is_on);
            }
        }
    }
}

impl<P: SetDutyCycle> Actuator for LedActuator<P> {
    fn begin(&mut self) -> Result<(), ActuatorError> {
        self.level = None;
        self.write_level(LEVEL_OFF)?;
        self.initialized = true;
        info!("Status LED initialized");
        Ok(())
    }

    fn set_state(&mut self, on: bool) {
        self.set_pattern(if on {
            BlinkPattern::On
        } else {
            BlinkPattern::Off
        });
    }

    fn state(&self) -> bool {
        self.generator.pattern() != BlinkPattern::Off
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn update(&mut self, now_ms: u64) {
        if !self.initialized {
            return;
        }
        let level = self.generator.level(now_ms);
        if let Err(e) = self.write_level(level) {
            warn!("Status LED: {}", e);
        }
    }
}

impl<P: SetDutyCycle> LedPort for LedActuator<P> {
    fn set_pattern(&mut self, pattern: BlinkPattern) {
        if !self.initialized {
            warn!("Status LED pattern set before init");
            return;
        }
        self.select(pattern);
    }

    fn pattern(&self) -> BlinkPattern {
        self.generator.pattern()
    }
}
