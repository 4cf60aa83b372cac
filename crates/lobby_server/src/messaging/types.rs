//! Message type definitions for client-server communication.
//!
//! Inbound frames carry a two-field command:
//!
//! ```json
//! { "type": "username", "value": "Ada" }
//! ```
//!
//! Outbound responses use the `ClientInfo` envelope:
//!
//! ```json
//! { "type": "error", "message": "Username already set!" }
//! ```

use serde::{Deserialize, Deserializer, Serialize};

/// The command as it appears on the wire.
///
/// Both fields are optional and a missing or `null` field reads as an empty
/// string, so `{}` decodes and is rejected as an unknown command while
/// `{"type": "username", "value": null}` asks for an empty name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCommand {
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub kind: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A decoded inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Choose a display name
    SetUsername(String),

    /// Gameplay move; accepted but not acted upon here
    Move(String),

    /// Any other `type`, kept for diagnostics
    Unknown(String),
}

impl From<WireCommand> for Command {
    fn from(wire: WireCommand) -> Self {
        match wire.kind.as_str() {
            "username" => Command::SetUsername(wire.value),
            "move" => Command::Move(wire.value),
            _ => Command::Unknown(wire.kind),
        }
    }
}

impl Command {
    /// Decodes a raw inbound frame.
    ///
    /// A bare `null` decodes as an empty command. Text that is not JSON, or
    /// JSON whose shape or field types do not match, is an error.
    pub fn decode(frame: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice::<Option<WireCommand>>(frame)
            .map(|wire| Command::from(wire.unwrap_or_default()))
    }
}

/// Outbound envelope sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(rename = "type")]
    pub kind: String,

    pub message: String,
}

impl ClientInfo {
    /// An `"error"` envelope carrying a human-readable message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error".to_string(),
            message: message.into(),
        }
    }
}
