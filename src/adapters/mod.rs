//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements        | Connects to                  |
//! |--------------|-------------------|------------------------------|
//! | `edge_link`  | LinkPort          | broker transport + network   |
//! | `log_sink`   | EventSink         | Serial log output            |
//! | `mqtt`       | BrokerTransport   | ESP-IDF MQTT client          |
//! | `time`       | (clock)           | ESP32 system timer           |
//! | `transport`  | (seam)            | inbound mailbox              |
//! | `wifi`       | ConnectivityPort  | ESP-IDF WiFi STA             |
//! | `wire`       | (codec)           | JSON payloads and topics     |

pub mod device_id;
pub mod edge_link;
pub mod log_sink;
#[cfg(target_os = "espidf")]
pub mod mqtt;
pub mod time;
pub mod transport;
pub(super) mod utils;
pub mod wifi;
pub mod wire;
