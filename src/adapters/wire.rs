//! JSON payloads and topic names exchanged with the edge broker.
//!
//! | Direction | Topic                        | Payload `type`             |
//! |-----------|------------------------------|----------------------------|
//! | out       | `tavolo/<device>/weight`     | `weight_data`              |
//! | out       | `tavolo/<device>/status`     | `status_update`, `heartbeat` |
//! | in        | `tavolo/<device>/command`    | `{command, value, timestamp}` |

use core::fmt;
use core::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::utils::topic_segment;
use crate::app::commands::{Command, CommandError, EdgeCommand};
use crate::error::CommsError;

pub type Topic = heapless::String<64>;

const WEIGHT_TYPE: &str = "weight_data";
const STATUS_TYPE: &str = "status_update";
const HEARTBEAT_TYPE: &str = "heartbeat";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WeightMessage<'a> {
    device_id: &'a str,
    weight: f32,
    timestamp: u64,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusMessage<'a> {
    device_id: &'a str,
    status: &'a str,
    timestamp: u64,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HeartbeatMessage<'a> {
    device_id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: u64,
}

/// Inbound `value` may be sent as a JSON string or a bare number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandValue {
    Text(String),
    Number(f64),
}

#[derive(Debug, Deserialize)]
struct CommandMessage {
    command: String,
    #[serde(default)]
    value: Option<CommandValue>,
    #[serde(default)]
    timestamp: Option<u64>,
}

pub fn encode_weight(device_id: &str, grams: f32, timestamp_ms: u64) -> Result<Vec<u8>, CommsError> {
    serde_json::to_vec(&WeightMessage {
        device_id,
        weight: grams,
        timestamp: timestamp_ms,
        kind: WEIGHT_TYPE,
    })
    .map_err(|_| CommsError::EncodeFailed)
}

pub fn encode_status(device_id: &str, status: &str, timestamp_ms: u64) -> Result<Vec<u8>, CommsError> {
    serde_json::to_vec(&StatusMessage {
        device_id,
        status,
        timestamp: timestamp_ms,
        kind: STATUS_TYPE,
    })
    .map_err(|_| CommsError::EncodeFailed)
}

pub fn encode_heartbeat(device_id: &str, timestamp_ms: u64) -> Result<Vec<u8>, CommsError> {
    serde_json::to_vec(&HeartbeatMessage {
        device_id,
        kind: HEARTBEAT_TYPE,
        timestamp: timestamp_ms,
    })
    .map_err(|_| CommsError::EncodeFailed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Not JSON, or missing the `command` field.
    Malformed,
    Command(CommandError),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed command payload"),
            Self::Command(e) => write!(f, "{e}"),
        }
    }
}

impl From<CommandError> for DecodeError {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

/// Decode an inbound command.  A missing `timestamp` is stamped with
/// `now_ms`.
pub fn decode_command(payload: &[u8], now_ms: u64) -> Result<EdgeCommand, DecodeError> {
    let msg: CommandMessage =
        serde_json::from_slice(payload).map_err(|_| DecodeError::Malformed)?;
    let value = match msg.value {
        Some(CommandValue::Text(text)) => Some(text),
        Some(CommandValue::Number(n)) => Some(n.to_string()),
        None => None,
    };
    let command = Command::parse(&msg.command, value.as_deref())?;
    Ok(EdgeCommand {
        command,
        timestamp_ms: msg.timestamp.unwrap_or(now_ms),
    })
}

/// Per-device topic names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub weight: Topic,
    pub command: Topic,
    pub status: Topic,
}

impl Topics {
    pub fn new(prefix: &str, device_id: &str) -> Self {
        let device: heapless::String<32> = topic_segment(device_id);
        let topic = |leaf: &str| {
            let mut t = Topic::new();
            let _ = write!(t, "{}/{}/{}", prefix, device, leaf);
            t
        };
        Self {
            weight: topic("weight"),
            command: topic("command"),
            status: topic("status"),
        }
    }
}
