//! Inbound commands to the orchestrator.
//!
//! The edge sends `{command, value, timestamp}` objects; the link adapter
//! decodes them into this closed enum once, at the transport boundary, so
//! the orchestrator only ever matches on typed variants.

use core::fmt;

/// Actions the edge (or a local caller) can request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Replace the weight threshold (grams).
    SetThreshold(f32),
    /// Force the status LED solid on.
    LedOn,
    /// Force the status LED off.
    LedOff,
    /// Zero the scale at the current load.
    Tare,
    /// Re-enter Calibrating.
    Calibrate,
    /// Park the station in Maintenance until resumed.
    Maintenance,
    /// Leave Maintenance (or any state) for Idle.
    Resume,
}

/// A decoded command plus the edge-supplied timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCommand {
    pub command: Command,
    /// Milliseconds; defaults to the receive time when the edge omits it.
    pub timestamp_ms: u64,
}

/// Why a well-formed JSON command could not become a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The tag is not one the station understands.
    UnknownTag,
    /// `SET_THRESHOLD` without a positive, finite number.
    InvalidValue,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTag => write!(f, "unknown command tag"),
            Self::InvalidValue => write!(f, "invalid command value"),
        }
    }
}

impl Command {
    /// Map a wire tag and its optional textual value onto a command.
    pub fn parse(tag: &str, value: Option<&str>) -> Result<Self, CommandError> {
        match tag {
            "SET_THRESHOLD" => {
                let grams: f32 = value
                    .map(str::trim)
                    .and_then(|v| v.parse().ok())
                    .ok_or(CommandError::InvalidValue)?;
                if !grams.is_finite() || grams <= 0.0 {
                    return Err(CommandError::InvalidValue);
                }
                Ok(Self::SetThreshold(grams))
            }
            "LED_ON" => Ok(Self::LedOn),
            "LED_OFF" => Ok(Self::LedOff),
            "TARE" => Ok(Self::Tare),
            "CALIBRATE" => Ok(Self::Calibrate),
            "MAINTENANCE" => Ok(Self::Maintenance),
            "RESUME" => Ok(Self::Resume),
            _ => Err(CommandError::UnknownTag),
        }
    }

    /// The wire tag for this command.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::SetThreshold(_) => "SET_THRESHOLD",
            Self::LedOn => "LED_ON",
            Self::LedOff => "LED_OFF",
            Self::Tare => "TARE",
            Self::Calibrate => "CALIBRATE",
            Self::Maintenance => "MAINTENANCE",
            Self::Resume => "RESUME",
        }
    }
}
