//! Client settings.
//!
//! Every field has a default, so an empty or partial `config.toml` is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chat::SessionType;
use crate::council::DEFAULT_MONOLOGUE_WINDOW;
use crate::stream::DEFAULT_MAX_BUFFER_BYTES;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSettings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub stream: StreamSettings,
    #[serde(default)]
    pub reconnect: ReconnectSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_sessions_path")]
    pub sessions_path: String,
    #[serde(default = "default_stream_path")]
    pub stream_path: String,
    #[serde(default = "default_message_path")]
    pub message_path: String,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_sessions_path() -> String {
    "/chat/sessions".to_string()
}

fn default_stream_path() -> String {
    "/chat/stream".to_string()
}

fn default_message_path() -> String {
    "/chat/message".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            sessions_path: default_sessions_path(),
            stream_path: default_stream_path(),
            message_path: default_message_path(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    /// Client-side deadline for one streaming attempt.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Cap on a pending frame before the stream is failed.
    #[serde(default = "default_max_buffer_bytes")]
    pub max_buffer_bytes: usize,
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_buffer_bytes() -> usize {
    DEFAULT_MAX_BUFFER_BYTES
}

impl StreamSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_buffer_bytes: default_max_buffer_bytes(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ReconnectSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    2000
}

impl ReconnectSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    #[serde(default)]
    pub session_type: SessionType,
    #[serde(default = "default_mode")]
    pub default_mode: String,
    #[serde(default = "default_monologue_window")]
    pub monologue_window: usize,
}

fn default_mode() -> String {
    "council".to_string()
}

fn default_monologue_window() -> usize {
    DEFAULT_MONOLOGUE_WINDOW
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            session_type: SessionType::default(),
            default_mode: default_mode(),
            monologue_window: default_monologue_window(),
        }
    }
}
