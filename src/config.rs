//! System configuration parameters
//!
//! All tunable parameters for the Tavolo weight station.  Nothing here is
//! persisted; every boot starts from [`SystemConfig::default`] and the edge
//! may adjust the threshold at runtime.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// --- Fixed policy timing ---

/// Maximum age of the last successful weight report before another is due.
pub const REPORT_INTERVAL_MS: u64 = 5_000;
/// Weight movement (grams) that forces a report regardless of age.
pub const WEIGHT_REPORT_DELTA_G: f32 = 5.0;
/// Release level of the threshold band, as a fraction of the threshold.
pub const HYSTERESIS_RATIO: f32 = 0.9;
/// Time after boot before Calibrating hands over to Idle.
pub const CALIBRATION_DURATION_MS: u64 = 5_000;

// --- Operator-facing messages ---

pub const CALIBRATING_MESSAGE: &str = "Calibrating...";
pub const CALIBRATING_MESSAGE_MS: u32 = 3_000;
pub const COMM_ERROR_MESSAGE: &str = "Comm Error";
pub const COMM_ERROR_MESSAGE_MS: u32 = 5_000;
pub const MAINTENANCE_MESSAGE: &str = "Maintenance Mode";
pub const TARE_MESSAGE: &str = "Tare Complete";
pub const TARE_MESSAGE_MS: u32 = 2_000;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Weight (grams) above which the station reports an over-limit load
    pub weight_threshold_g: f32,
    /// Nominal measurement cadence (milliseconds); advisory only
    pub measurement_interval_ms: u32,
    /// Raw counts per gram, forwarded to the load cell
    pub calibration_factor: f32,
    /// Zero the scale every time Calibrating is entered
    pub auto_tare: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            weight_threshold_g: 100.0,
            measurement_interval_ms: 500,
            calibration_factor: 0.42,
            auto_tare: true,
        }
    }
}

impl SystemConfig {
    /// Reject values the orchestrator cannot act on.
    pub fn validate(&self) -> Result<()> {
        if !self.weight_threshold_g.is_finite() || self.weight_threshold_g <= 0.0 {
            return Err(Error::Config("weight threshold must be a positive number"));
        }
        if !self.calibration_factor.is_finite() || self.calibration_factor == 0.0 {
            return Err(Error::Config("calibration factor must be finite and non-zero"));
        }
        if self.measurement_interval_ms == 0 {
            return Err(Error::Config("measurement interval must be non-zero"));
        }
        Ok(())
    }

    /// Weight at which an exceeded threshold is released.
    pub fn release_level_g(&self) -> f32 {
        self.weight_threshold_g * HYSTERESIS_RATIO
    }
}

/// Edge broker connection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub broker_host: heapless::String<64>,
    pub broker_port: u16,
    /// First topic segment, e.g. `tavolo` in `tavolo/<device>/weight`
    pub topic_prefix: heapless::String<16>,
    /// Spacing between connection attempts while not connected
    pub reconnect_interval_ms: u64,
    /// Heartbeat cadence while connected
    pub heartbeat_interval_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        let mut broker_host = heapless::String::new();
        let _ = broker_host.push_str("broker.hivemq.com");
        let mut topic_prefix = heapless::String::new();
        let _ = topic_prefix.push_str("tavolo");
        Self {
            broker_host,
            broker_port: 1883,
            topic_prefix,
            reconnect_interval_ms: 5_000,
            heartbeat_interval_ms: 30_000,
        }
    }
}
