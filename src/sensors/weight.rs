//! Load-cell weight sensor.
//!
//! Samples the converter every [`READ_INTERVAL_MS`], keeps the last three
//! raw conversions, and reports
//! `(mean_raw − tare_offset) ÷ calibration_factor`, clamped at zero.  The
//! first conversion after `begin()` establishes the zero point; until then
//! the sensor is not ready.  The data handler only fires when the weight
//! has moved by at least [`MIN_CHANGE_G`].

use log::{info, warn};

use super::LoadCell;
use crate::app::ports::{Sensor, WeightSensorPort};
use crate::error::SensorError;

pub const READ_INTERVAL_MS: u64 = 100;
pub const MIN_CHANGE_G: f32 = 1.0;

const AVERAGE_WINDOW: usize = 3;

pub struct WeightSensor<C> {
    cell: C,
    calibration_factor: f32,
    tare_offset: f32,
    ring: [i32; AVERAGE_WINDOW],
    head: usize,
    count: usize,
    initialized: bool,
    tared: bool,
    tare_pending: bool,
    /// Last weight handed to the data handler.
    last_weight: f32,
    last_read_ms: Option<u64>,
    new_data: bool,
}

impl<C: LoadCell> WeightSensor<C> {
    pub fn new(cell: C, calibration_factor: f32) -> Self {
        Self {
            cell,
            calibration_factor,
            tare_offset: 0.0,
            ring: [0; AVERAGE_WINDOW],
            head: 0,
            count: 0,
            initialized: false,
            tared: false,
            tare_pending: false,
            last_weight: 0.0,
            last_read_ms: None,
            new_data: false,
        }
    }

    pub fn calibration_factor(&self) -> f32 {
        self.calibration_factor
    }

    pub fn tare_offset(&self) -> f32 {
        self.tare_offset
    }

    fn push_raw(&mut self, raw: i32) {
        self.ring[self.head] = raw;
        self.head = (self.head + 1) % AVERAGE_WINDOW;
        if self.count < AVERAGE_WINDOW {
            self.count += 1;
        }
    }

    fn average_raw(&self) -> Option<f32> {
        if self.count == 0 {
            return None;
        }
        let sum: i64 = self.ring[..self.count].iter().map(|&r| i64::from(r)).sum();
        Some(sum as f32 / self.count as f32)
    }

    fn grams(&self, average_raw: f32) -> f32 {
        ((average_raw - self.tare_offset) / self.calibration_factor).max(0.0)
    }

    fn apply_tare(&mut self) {
        match self.average_raw() {
            Some(avg) => {
                self.tare_offset = avg;
                self.tared = true;
                self.tare_pending = false;
                info!("Weight sensor tared (offset {:.0})", avg);
            }
            None => self.tare_pending = true,
        }
    }
}

impl<C: LoadCell> Sensor for WeightSensor<C> {
    fn begin(&mut self) -> Result<(), SensorError> {
        if !self.calibration_factor.is_finite() || self.calibration_factor == 0.0 {
            return Err(SensorError::InvalidCalibration);
        }
        self.initialized = true;
        self.tare_pending = true;
        info!(
            "Weight sensor initialized (factor {})",
            self.calibration_factor
        );
        Ok(())
    }

    fn read(&mut self) -> f32 {
        if !self.initialized {
            warn!("Weight sensor read before init");
            return 0.0;
        }
        if !self.tared {
            return self.last_weight;
        }
        self.average_raw()
            .map_or(self.last_weight, |avg| self.grams(avg))
    }

    fn is_ready(&self) -> bool {
        self.initialized && self.tared
    }

    fn update(&mut self, now_ms: u64, on_data: &mut dyn FnMut(f32)) {
        self.new_data = false;
        if !self.initialized {
            return;
        }
        if self
            .last_read_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < READ_INTERVAL_MS)
        {
            return;
        }
        if !self.cell.is_ready() {
            return;
        }
        let raw = match self.cell.read_raw() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Load cell read failed: {}", e);
                return;
            }
        };
        self.last_read_ms = Some(now_ms);
        self.push_raw(raw);

        if self.tare_pending {
            self.apply_tare();
            return;
        }

        self.new_data = true;
        let weight = self.read();
        if (weight - self.last_weight).abs() >= MIN_CHANGE_G {
            self.last_weight = weight;
            on_data(weight);
        }
    }
}

impl<C: LoadCell> WeightSensorPort for WeightSensor<C> {
    fn has_new_data(&self) -> bool {
        self.new_data
    }

    fn tare(&mut self) {
        if !self.initialized {
            warn!("Tare requested before weight sensor init");
            return;
        }
        self.apply_tare();
    }

    fn set_calibration_factor(&mut self, factor: f32) {
        if !factor.is_finite() || factor == 0.0 {
            warn!("Ignoring calibration factor {}", factor);
            return;
        }
        self.calibration_factor = factor;
    }
}
