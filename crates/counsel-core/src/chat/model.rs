//! Chat session domain model.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Title given to sessions created without one.
pub const DEFAULT_SESSION_TITLE: &str = "New chat";

/// Partition tag for sessions.
///
/// Each UI surface owns its own session partition. The side panel expects a
/// session to always exist, so clearing it creates a replacement immediately.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionType {
    /// Persistent assistant side panel.
    Sidebar,
    /// Main chat page.
    #[default]
    Main,
    /// Sessions driven through the workflow automation bridge.
    N8n,
}

impl SessionType {
    /// Returns true if a session of this type must always be present.
    pub fn requires_persistent_session(&self) -> bool {
        matches!(self, Self::Sidebar)
    }
}

/// A chat session as exposed by the session endpoints.
///
/// Only `title` and `last_message_at` change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Human-readable session title
    #[serde(default)]
    pub title: String,
    /// Partition tag
    #[serde(default)]
    pub session_type: SessionType,
    /// Timestamp when the session was created (ISO 8601 format)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Timestamp of the last message (ISO 8601 format)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<String>,
}

impl ChatSession {
    /// Records message activity on the session.
    pub fn touch(&mut self) {
        self.last_message_at = Some(Utc::now().to_rfc3339());
    }

    /// Returns true if the title was never set by the user or the server.
    pub fn has_default_title(&self) -> bool {
        self.title.trim().is_empty() || self.title == DEFAULT_SESSION_TITLE
    }
}
