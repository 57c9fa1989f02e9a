//! Sensor subsystem: the HX711 load-cell converter and the
//! [`WeightSensor`](weight::WeightSensor) that turns raw counts into grams.
//!
//! ```text
//!  HX711 (24-bit ADC) ──raw──▶ WeightSensor ──grams──▶ Orchestrator
//!        LoadCell             ring avg · tare · factor   (on_data)
//! ```

pub mod hx711;
pub mod weight;

use crate::error::SensorError;

/// A raw bridge converter.  Split out so the averaging and calibration
/// logic can be tested without bit-banged pins.
pub trait LoadCell {
    /// `true` when a conversion is waiting to be clocked out.
    fn is_ready(&mut self) -> bool;

    /// Clock out one signed conversion.  Fails with
    /// [`SensorError::NotReady`] when no conversion is waiting.
    fn read_raw(&mut self) -> Result<i32, SensorError>;
}
