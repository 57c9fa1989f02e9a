//! HX711 24-bit bridge ADC, bit-banged over two GPIOs.
//!
//! DOUT goes low when a conversion is ready.  Each of 24 SCK pulses
//! shifts one bit out MSB-first; 1–3 extra pulses select the channel and
//! gain of the *next* conversion.  Holding SCK high for more than 60 µs
//! powers the chip down.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use super::LoadCell;
use crate::error::SensorError;

/// Channel/gain for the next conversion, encoded as extra SCK pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    /// Channel A, gain 128.
    #[default]
    A128,
    /// Channel B, gain 32.
    B32,
    /// Channel A, gain 64.
    A64,
}

impl Gain {
    fn extra_pulses(self) -> u8 {
        match self {
            Self::A128 => 1,
            Self::B32 => 2,
            Self::A64 => 3,
        }
    }
}

pub struct Hx711<SCK, DT, D> {
    sck: SCK,
    dt: DT,
    delay: D,
    gain: Gain,
}

impl<SCK, DT, D> Hx711<SCK, DT, D>
where
    SCK: OutputPin,
    DT: InputPin,
    D: DelayNs,
{
    pub fn new(sck: SCK, dt: DT, delay: D) -> Self {
        Self {
            sck,
            dt,
            delay,
            gain: Gain::default(),
        }
    }

    /// Takes effect after the next conversion is clocked out.
    pub fn set_gain(&mut self, gain: Gain) {
        self.gain = gain;
    }

    pub fn power_down(&mut self) -> Result<(), SensorError> {
        self.sck.set_low().map_err(|_| SensorError::BusFault)?;
        self.sck.set_high().map_err(|_| SensorError::BusFault)?;
        self.delay.delay_us(70);
        Ok(())
    }

    pub fn power_up(&mut self) -> Result<(), SensorError> {
        self.sck.set_low().map_err(|_| SensorError::BusFault)
    }

    /// One SCK cycle; returns DOUT sampled while SCK is high.
    fn pulse(&mut self) -> Result<bool, SensorError> {
        self.sck.set_high().map_err(|_| SensorError::BusFault)?;
        self.delay.delay_us(1);
        let bit = self.dt.is_high().map_err(|_| SensorError::BusFault)?;
        self.sck.set_low().map_err(|_| SensorError::BusFault)?;
        self.delay.delay_us(1);
        Ok(bit)
    }
}

impl<SCK, DT, D> LoadCell for Hx711<SCK, DT, D>
where
    SCK: OutputPin,
    DT: InputPin,
    D: DelayNs,
{
    fn is_ready(&mut self) -> bool {
        self.dt.is_low().unwrap_or(false)
    }

    fn read_raw(&mut self) -> Result<i32, SensorError> {
        if !self.is_ready() {
            return Err(SensorError::NotReady);
        }
        let mut value: u32 = 0;
        for _ in 0..24 {
            value = (value << 1) | u32::from(self.pulse()?);
        }
        for _ in 0..self.gain.extra_pulses() {
            self.pulse()?;
        }
        Ok(sign_extend_24(value))
    }
}

/// Two's-complement 24-bit to `i32`.
#[allow(clippy::cast_possible_wrap)]
fn sign_extend_24(value: u32) -> i32 {
    ((value << 8) as i32) >> 8
}
