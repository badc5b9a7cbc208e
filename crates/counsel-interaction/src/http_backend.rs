//! HttpChatBackend - REST and streaming transport over reqwest.
//!
//! Every call carries `Authorization: Bearer <token>` when the identity
//! provider has one. Failing to connect, or losing the connection while a
//! body is being read, marks the server unreachable on the shared
//! connectivity flag; any answer from the server marks it reachable again.

use std::sync::Arc;

use async_trait::async_trait;
use counsel_core::backend::{ByteStream, ChatBackend, ChatReply, ChatRequest, CreateSessionRequest};
use counsel_core::chat::{ChatMessage, ChatSession, SessionType};
use counsel_core::config::ServerSettings;
use counsel_core::connectivity::ConnectivityFlag;
use counsel_core::error::{CounselError, Result};
use counsel_core::identity::IdentityProvider;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Chat backend that talks to the REST API over HTTP.
#[derive(Clone)]
pub struct HttpChatBackend {
    client: Client,
    settings: ServerSettings,
    identity: Arc<dyn IdentityProvider>,
    connectivity: Option<ConnectivityFlag>,
}

impl HttpChatBackend {
    /// Creates a backend for the given server settings and credential.
    pub fn new(settings: ServerSettings, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            client: Client::new(),
            settings,
            identity,
            connectivity: None,
        }
    }

    /// Replaces the HTTP client (proxies, custom TLS, test servers).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Reports connection failures and recoveries to `flag`.
    pub fn with_connectivity(mut self, flag: ConnectivityFlag) -> Self {
        self.connectivity = Some(flag);
        self
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.settings.base_url, path)
    }

    fn session_url(&self, session_id: &str) -> String {
        self.url(&format!("{}/{}", self.settings.sessions_path, session_id))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.identity.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|err| transport_error(err, self.connectivity.as_ref()))?;

        if let Some(flag) = &self.connectivity {
            flag.mark_reachable(true);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        Ok(response)
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.execute(builder).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| body_error(err, self.connectivity.as_ref()))?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn list_sessions(&self, session_type: SessionType) -> Result<Vec<ChatSession>> {
        let builder = self
            .client
            .get(self.url(&self.settings.sessions_path))
            .query(&[("session_type", session_type.to_string())]);
        let sessions: SessionList = self.json(builder).await?;
        Ok(sessions.into_vec())
    }

    async fn get_session(&self, session_id: &str) -> Result<ChatSession> {
        let builder = self.client.get(self.session_url(session_id));
        self.json::<ChatSession>(builder).await.map_err(|err| match err {
            CounselError::Http { status: 404, .. } => {
                CounselError::not_found("session", session_id)
            }
            other => other,
        })
    }

    async fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let url = format!("{}/messages", self.session_url(session_id));
        let messages: MessageList = self.json(self.client.get(url)).await?;
        Ok(messages.into_vec())
    }

    async fn create_session(&self, request: &CreateSessionRequest) -> Result<ChatSession> {
        let builder = self
            .client
            .post(self.url(&self.settings.sessions_path))
            .json(request);
        self.json(builder).await
    }

    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply> {
        let builder = self
            .client
            .post(self.url(&self.settings.message_path))
            .json(request);
        self.json(builder).await
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        let builder = self
            .client
            .post(self.url(&self.settings.stream_path))
            .header(header::ACCEPT, "text/event-stream")
            .json(request);
        let response = self.execute(builder).await?;

        tracing::debug!(
            target: "counsel::stream",
            "Stream opened for session {} (status {})",
            request.session_id,
            response.status()
        );

        let connectivity = self.connectivity.clone();
        let stream = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|err| body_error(err, connectivity.as_ref())));
        Ok(Box::pin(stream))
    }
}

/// Session list as returned by the server: bare array or `{"sessions": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SessionList {
    Bare(Vec<ChatSession>),
    Wrapped { sessions: Vec<ChatSession> },
}

impl SessionList {
    fn into_vec(self) -> Vec<ChatSession> {
        match self {
            Self::Bare(sessions) | Self::Wrapped { sessions } => sessions,
        }
    }
}

/// Message history: bare array or `{"messages": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum MessageList {
    Bare(Vec<ChatMessage>),
    Wrapped { messages: Vec<ChatMessage> },
}

impl MessageList {
    fn into_vec(self) -> Vec<ChatMessage> {
        match self {
            Self::Bare(messages) | Self::Wrapped { messages } => messages,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorResponse {
    Detail { detail: String },
    Nested { error: ErrorBody },
    Message { message: String },
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn transport_error(err: reqwest::Error, connectivity: Option<&ConnectivityFlag>) -> CounselError {
    if err.is_connect() {
        if let Some(flag) = connectivity {
            flag.mark_reachable(false);
        }
    }
    CounselError::network(format!("Request failed: {err}"))
}

/// A body read that fails after the headers arrived means the connection
/// dropped mid-response.
fn body_error(err: reqwest::Error, connectivity: Option<&ConnectivityFlag>) -> CounselError {
    if let Some(flag) = connectivity {
        flag.mark_reachable(false);
    }
    CounselError::network(format!("Connection lost while reading the response: {err}"))
}

fn map_http_error(status: StatusCode, body: &str) -> CounselError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|parsed| match parsed {
            ErrorResponse::Detail { detail } => detail,
            ErrorResponse::Nested { error } => error.message,
            ErrorResponse::Message { message } => message,
        })
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CounselError::auth(message),
        _ => CounselError::Http {
            status: status.as_u16(),
            message,
        },
    }
}
