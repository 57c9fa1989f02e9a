//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{ConnectionState, EventSink};

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={}", state.as_str());
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from.as_str(), to.as_str());
            }
            AppEvent::ThresholdChanged(exceeded) => {
                info!("LIMIT | exceeded={}", exceeded);
            }
            AppEvent::WeightSample(grams) => {
                info!("WEIGHT | {:.1}g", grams);
            }
            AppEvent::WeightReported {
                grams,
                timestamp_ms,
            } => {
                info!("REPORT | {:.1}g at {}ms", grams, timestamp_ms);
            }
            AppEvent::DeviceStatusChanged { from, to } => {
                info!("DEVICE | {} -> {}", from.as_str(), to.as_str());
            }
            AppEvent::LinkChanged(ConnectionState::Error) => {
                warn!("EDGE | connection error");
            }
            AppEvent::LinkChanged(state) => {
                info!("EDGE | {}", state.as_str());
            }
            AppEvent::CommandApplied(command) => {
                info!("CMD | {}", command.tag());
            }
            AppEvent::ThresholdUpdated(grams) => {
                info!("CONFIG | threshold={:.1}g", grams);
            }
            AppEvent::Status(report) => {
                info!("STATUS | {}", report);
            }
        }
    }
}
