//! Chat backend interface.
//!
//! Defines the contract of the server the client talks to: the session REST
//! endpoints, the streaming endpoint and the non-streaming fallback. The
//! application layer depends only on this trait, so it can run against the
//! HTTP implementation or an in-memory double.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, ChatSession, SessionType};
use crate::error::Result;

/// Raw response body of the streaming endpoint.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Body of both send endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_summary: Option<String>,
}

/// Response of the non-streaming send endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub user_message: ChatMessage,
    pub ai_message: ChatMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_title: Option<String>,
}

/// Body of the create-session endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub title: String,
    pub session_type: SessionType,
    pub user_id: String,
}

/// An abstract chat server.
///
/// Implementations attach the bearer credential to every call.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Lists sessions of the given partition visible to the credential.
    async fn list_sessions(&self, session_type: SessionType) -> Result<Vec<ChatSession>>;

    /// Fetches one session's metadata.
    async fn get_session(&self, session_id: &str) -> Result<ChatSession>;

    /// Fetches a session's message history.
    async fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>>;

    /// Creates a session.
    async fn create_session(&self, request: &CreateSessionRequest) -> Result<ChatSession>;

    /// Sends a message and waits for the complete reply.
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// Sends a message and returns the raw event stream.
    ///
    /// Resolves once response headers arrive; body bytes follow on the stream.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream>;
}
