//! Typed events of the deliberation stream and the frame decoder.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::council::Stage;

/// Prefix every meaningful frame starts with.
pub const DATA_PREFIX: &str = "data: ";

/// Payload of the terminating frame.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Status update of the agent currently working.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// An event emitted by the orchestrator, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The deliberation moved to another stage.
    StageChange { stage: Stage },
    /// An agent reports what it is doing.
    StepUpdate {
        #[serde(default)]
        payload: StepPayload,
    },
    /// A fragment of the reasoning narrative.
    ReasoningChunk {
        #[serde(default)]
        content: String,
    },
    /// A fragment of the visible answer.
    Token {
        #[serde(default)]
        content: String,
    },
    /// The server persisted the user's message.
    UserMessageSaved {
        #[serde(
            default,
            deserialize_with = "id_as_string",
            skip_serializing_if = "Option::is_none"
        )]
        message_id: Option<String>,
    },
    /// The server persisted the assistant's message.
    AiMessageSaved {
        #[serde(
            default,
            deserialize_with = "id_as_string",
            skip_serializing_if = "Option::is_none"
        )]
        message_id: Option<String>,
    },
    /// The server reports a failure. The stream may continue.
    Error {
        #[serde(default)]
        content: String,
    },
}

/// Accepts string or numeric ids; anything else reads as absent.
fn id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) => Some(id),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

/// Result of decoding one complete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Event(StreamEvent),
    Done,
}

/// Decodes one complete frame.
///
/// Returns `None` for anything that is not a usable event: empty frames,
/// frames without the `data: ` prefix, malformed JSON, payloads without a
/// non-empty `type`, and event types this client does not know. None of these
/// abort the stream.
pub fn decode_frame(frame: &str) -> Option<Decoded> {
    let frame = frame.trim();
    if frame.is_empty() {
        return None;
    }

    let Some(payload) = frame.strip_prefix(DATA_PREFIX) else {
        tracing::trace!(target: "counsel::stream", "Ignoring non-data frame");
        return None;
    };

    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        return Some(Decoded::Done);
    }

    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(target: "counsel::stream", "Discarding malformed frame: {}", e);
            return None;
        }
    };

    let has_type = value
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| !t.is_empty());
    if !has_type {
        tracing::debug!(target: "counsel::stream", "Discarding frame without event type");
        return None;
    }

    match serde_json::from_value::<StreamEvent>(value) {
        Ok(event) => Some(Decoded::Event(event)),
        Err(e) => {
            tracing::debug!(target: "counsel::stream", "Discarding unsupported event: {}", e);
            None
        }
    }
}
