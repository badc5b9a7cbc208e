//! Chat message types.
//!
//! A `ChatMessage` is either server-confirmed (real id, `is_optimistic == false`)
//! or an optimistic placeholder synthesized by the client before the server
//! acknowledges it. Placeholders carry a `temp-` id prefix.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Prefix of every client-generated message id.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Metadata key set on messages whose send failed for good.
pub const FAILED_METADATA_KEY: &str = "failed";

/// Represents the role of a message in a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the council (any backend agent speaking as the assistant).
    Assistant,
    /// System-generated message.
    System,
}

/// A single message in a chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server-assigned UUID, or a `temp-` id for optimistic messages.
    pub id: String,
    /// Owning session id.
    #[serde(default)]
    pub session_id: String,
    /// The role of the message sender.
    pub role: MessageRole,
    /// Visible content. Grows token by token while streaming.
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    /// Side-channel deliberation narrative, distinct from `content`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Creation timestamp (RFC 3339 or naive ISO 8601, treated as UTC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// True until the server confirms the message.
    #[serde(default)]
    pub is_optimistic: bool,
    /// Free-form bag (failure markers, server hints).
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ChatMessage {
    /// Creates a server-style message. Mostly useful for tests and fallbacks.
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            role,
            content: content.into(),
            reasoning: None,
            created_at: None,
            is_optimistic: false,
            metadata: Map::new(),
        }
    }

    /// Creates a client-side placeholder with a `temp-<role>-<millis>-<nonce>` id.
    ///
    /// The placeholder is timestamped now so that it sorts after the history
    /// it is appended to.
    pub fn optimistic(
        session_id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!(
                "{TEMP_ID_PREFIX}{role}-{}-{}",
                now.timestamp_millis(),
                &Uuid::new_v4().simple().to_string()[..8]
            ),
            session_id: session_id.into(),
            role,
            content: content.into(),
            reasoning: None,
            created_at: Some(now.to_rfc3339()),
            is_optimistic: true,
            metadata: Map::new(),
        }
    }

    /// Sets `created_at`.
    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }

    /// Returns true if the id was generated on the client.
    pub fn has_temp_id(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }

    /// Returns true if this message still awaits server confirmation.
    pub fn is_pending(&self) -> bool {
        self.is_optimistic || self.has_temp_id()
    }

    /// Returns the creation time in milliseconds since the epoch.
    ///
    /// Missing or unparsable timestamps yield `0` so they sort at the epoch.
    pub fn created_at_millis(&self) -> i64 {
        self.created_at
            .as_deref()
            .and_then(parse_timestamp_millis)
            .unwrap_or(0)
    }

    /// Marks the message as failed to send. It stays visible for a retry.
    pub fn mark_failed(&mut self) {
        self.metadata
            .insert(FAILED_METADATA_KEY.to_string(), Value::Bool(true));
    }

    /// Returns true if the message carries the failure marker.
    pub fn is_failed(&self) -> bool {
        self.metadata
            .get(FAILED_METADATA_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.timestamp_millis());
    }
    // Naive ISO 8601 without offset, as emitted by many Python backends.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc().timestamp_millis())
}
