use std::sync::Arc;
use std::sync::Mutex;

use counsel_core::backend::{ChatBackend, ChatRequest, CreateSessionRequest};
use counsel_core::chat::{
    ChatMessage, ChatSession, DEFAULT_SESSION_TITLE, FAILED_METADATA_KEY, MessageRole,
};
use counsel_core::config::ClientSettings;
use counsel_core::connectivity::Connectivity;
use counsel_core::council::{CouncilAction, CouncilStore};
use counsel_core::error::{CounselError, Result};
use counsel_core::identity::IdentityProvider;
use counsel_core::notice::Notifier;
use tokio::sync::{RwLock, watch};
use tokio_util::sync::CancellationToken;

use crate::send::{
    EventRouter, FailureKind, ReconnectDecision, ReconnectionController, SendOptions, SendOutcome,
    StreamingTurn, TurnOutcome,
};

/// Client-side owner of the chat sessions and the deliberation stream.
///
/// `ChatSessionManager` is responsible for:
/// - Listing, loading, switching, creating and clearing sessions
/// - Sending messages over the streaming or the single-response endpoint
/// - Reconnecting after connectivity loss
/// - Writing every state change through the injected [`CouncilStore`]
///
/// One send is in flight at a time; a second call while one runs is ignored.
pub struct ChatSessionManager {
    /// Server the client talks to
    backend: Arc<dyn ChatBackend>,
    /// Credential and acting user
    identity: Arc<dyn IdentityProvider>,
    /// Runtime signal gates sends; server reachability classifies failures
    connectivity: Arc<dyn Connectivity>,
    /// Activity, monologue and message state of the active session
    store: CouncilStore,
    /// User-facing notices
    notifier: Notifier,
    settings: ClientSettings,
    /// Last fetched session list
    sessions: RwLock<Vec<ChatSession>>,
    /// Session the message list belongs to
    current: RwLock<Option<ChatSession>>,
    /// Single-writer send flag; subscribers see it clear when a send ends
    sending: watch::Sender<bool>,
    /// Abort handle of the in-flight send
    abort: Mutex<Option<CancellationToken>>,
    reconnect: ReconnectionController,
}

impl ChatSessionManager {
    /// Creates a manager with a fresh store and a log-only notifier.
    ///
    /// # Arguments
    ///
    /// * `backend` - Chat server implementation
    /// * `identity` - Provides the bearer token and the user id
    /// * `connectivity` - Online/offline signal of the runtime
    /// * `settings` - Effective client settings
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        identity: Arc<dyn IdentityProvider>,
        connectivity: Arc<dyn Connectivity>,
        settings: ClientSettings,
    ) -> Self {
        Self {
            backend,
            identity,
            connectivity,
            store: CouncilStore::new(settings.session.monologue_window),
            notifier: Notifier::silent(),
            reconnect: ReconnectionController::new(settings.reconnect.clone()),
            settings,
            sessions: RwLock::new(Vec::new()),
            current: RwLock::new(None),
            sending: watch::channel(false).0,
            abort: Mutex::new(None),
        }
    }

    /// Uses `store` instead of the manager's own store.
    pub fn with_store(mut self, store: CouncilStore) -> Self {
        self.store = store;
        self
    }

    /// Delivers notices through `notifier`.
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn store(&self) -> &CouncilStore {
        &self.store
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub async fn current_session(&self) -> Option<ChatSession> {
        self.current.read().await.clone()
    }

    pub async fn sessions(&self) -> Vec<ChatSession> {
        self.sessions.read().await.clone()
    }

    /// Returns true while a send is in flight.
    pub fn is_sending(&self) -> bool {
        *self.sending.borrow()
    }

    /// Fetches the sessions visible to the credential and replaces the local list.
    pub async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        let sessions = self
            .backend
            .list_sessions(self.settings.session.session_type)
            .await?;
        tracing::debug!("Fetched {} sessions", sessions.len());
        *self.sessions.write().await = sessions.clone();
        Ok(sessions)
    }

    /// Fetches a session and its history and merges the history into the store.
    ///
    /// Messages already in the store are kept; placeholders confirmed by the
    /// history are replaced. Loading a session other than the current one
    /// behaves like [`switch_session`](Self::switch_session).
    pub async fn load_session(&self, session_id: &str) -> Result<ChatSession> {
        if self.is_other_session(session_id).await {
            return self.switch_session(session_id).await;
        }
        self.fetch_and_merge(session_id).await
    }

    /// Makes `session_id` the active session.
    ///
    /// Switching to another session cancels the in-flight send, waits for it
    /// to stop writing and clears the message list and activity before the
    /// new history is merged.
    pub async fn switch_session(&self, session_id: &str) -> Result<ChatSession> {
        if self.is_other_session(session_id).await {
            self.cancel();
            self.wait_idle().await;
            self.store.dispatch(CouncilAction::ReplaceMessages(Vec::new()));
            self.store.dispatch(CouncilAction::ResetActivity);
        }
        self.fetch_and_merge(session_id).await
    }

    async fn is_other_session(&self, session_id: &str) -> bool {
        self.current
            .read()
            .await
            .as_ref()
            .is_none_or(|current| current.id != session_id)
    }

    async fn fetch_and_merge(&self, session_id: &str) -> Result<ChatSession> {
        let (session, messages) = futures::try_join!(
            self.backend.get_session(session_id),
            self.backend.get_messages(session_id)
        )?;

        tracing::info!(
            "Loaded session {} ({} messages)",
            session.id,
            messages.len()
        );
        self.store.dispatch(CouncilAction::MergeMessages(messages));
        *self.current.write().await = Some(session.clone());
        self.upsert_listed(session.clone()).await;
        Ok(session)
    }

    /// Creates a session and makes it current with an empty message list.
    ///
    /// # Errors
    ///
    /// Returns `CounselError::Auth` when the identity has no user id.
    pub async fn create_session(&self, title: Option<&str>) -> Result<ChatSession> {
        let user_id = self
            .identity
            .user_id()
            .ok_or_else(|| CounselError::auth("No authenticated user; cannot create a session"))?;

        let request = CreateSessionRequest {
            title: title.unwrap_or(DEFAULT_SESSION_TITLE).to_string(),
            session_type: self.settings.session.session_type,
            user_id,
        };
        let session = self.backend.create_session(&request).await?;
        tracing::info!("Created session {}", session.id);

        self.store.dispatch(CouncilAction::ReplaceMessages(Vec::new()));
        *self.current.write().await = Some(session.clone());
        {
            let mut sessions = self.sessions.write().await;
            sessions.retain(|s| s.id != session.id);
            sessions.insert(0, session.clone());
        }
        Ok(session)
    }

    /// Clears messages and activity.
    ///
    /// Session types that always need a session get a fresh one, which is
    /// returned.
    pub async fn clear_session(&self) -> Result<Option<ChatSession>> {
        self.cancel();
        self.wait_idle().await;
        self.store.dispatch(CouncilAction::ReplaceMessages(Vec::new()));
        self.store.dispatch(CouncilAction::ResetActivity);
        let previous = self.current.write().await.take();
        tracing::debug!(
            "Cleared session {}",
            previous.as_ref().map_or("<none>", |s| s.id.as_str())
        );

        if self.settings.session.session_type.requires_persistent_session() {
            return self.create_session(None).await.map(Some);
        }
        Ok(None)
    }

    /// Resets stage, actor, roster and monologue. Messages are kept.
    pub fn reset_activity(&self) {
        self.store.dispatch(CouncilAction::ResetActivity);
    }

    /// Aborts the in-flight send, if any.
    pub fn cancel(&self) {
        let abort = self.abort.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = abort.as_ref() {
            tracing::info!("Cancelling in-flight send");
            token.cancel();
        }
    }

    /// Resolves once no send is in flight.
    async fn wait_idle(&self) {
        let mut sending = self.sending.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = sending.wait_for(|sending| !*sending).await;
    }

    /// Cancels the in-flight send and stops all further state writes.
    pub fn dispose(&self) {
        self.cancel();
        self.store.dispose();
    }

    /// Sends `content` to the current session, creating one if needed.
    ///
    /// The user message is shown optimistically before the request is issued.
    /// Failures are reported through the notifier and returned; the user
    /// message then stays visible with a failure marker.
    pub async fn send(&self, content: &str, options: SendOptions) -> Result<SendOutcome> {
        if self.store.is_disposed() {
            tracing::debug!("Send ignored: manager disposed");
            return Ok(SendOutcome::Ignored);
        }
        let Some(guard) = SendGuard::acquire(self) else {
            tracing::debug!("Send ignored: another send is in flight");
            return Ok(SendOutcome::Ignored);
        };

        let content = content.trim();
        if content.is_empty() {
            self.notifier.warning("Cannot send an empty message.");
            return Err(CounselError::precondition("message is empty"));
        }
        // A server the transport failed to reach does not block a new attempt.
        if !self.connectivity.runtime_online() {
            self.notifier
                .error("You are offline. Check your connection and try again.");
            return Err(CounselError::precondition("client is offline"));
        }

        let session = match self.ensure_session().await {
            Ok(session) => session,
            Err(err) => {
                self.notifier
                    .error(format!("Failed to start a session: {err}"));
                return Err(err);
            }
        };

        let user_message_id = self.stage_user_message(&session.id, content);
        self.store.dispatch(CouncilAction::ResetActivity);
        self.store.dispatch(CouncilAction::SetThinking(true));

        let request = ChatRequest {
            session_id: session.id.clone(),
            message: content.to_string(),
            mode: options
                .mode
                .unwrap_or_else(|| self.settings.session.default_mode.clone()),
            context_summary: options.context_summary,
        };

        if options.stream {
            self.send_streaming(&request, &user_message_id, &guard.cancel)
                .await
        } else {
            self.send_simple(&request, &user_message_id, &guard.cancel)
                .await
        }
    }

    async fn send_streaming(
        &self,
        request: &ChatRequest,
        user_message_id: &str,
        cancel: &CancellationToken,
    ) -> Result<SendOutcome> {
        let mut router = EventRouter::new(
            self.store.clone(),
            self.notifier.clone(),
            &request.session_id,
            user_message_id,
        );

        loop {
            let result = StreamingTurn::new(&mut router, &self.settings.stream)
                .run(self.backend.as_ref(), request, cancel)
                .await;

            let err = match result {
                Ok(TurnOutcome::Completed) => {
                    self.reconnect.reset();
                    self.touch_session(&request.session_id).await;
                    return Ok(SendOutcome::Completed);
                }
                Ok(TurnOutcome::Aborted) => {
                    self.reconnect.reset();
                    tracing::info!("Send to session {} aborted", request.session_id);
                    return Ok(SendOutcome::Aborted);
                }
                Err(err) => err,
            };

            tracing::warn!(
                target: "counsel::stream",
                "Stream for session {} failed: {}",
                request.session_id,
                err
            );
            router.discard_partial();

            match self.reconnect.on_failure(&err, self.connectivity.as_ref()) {
                ReconnectDecision::Retry {
                    attempt,
                    max_attempts,
                    delay,
                } => {
                    self.notifier.warning(format!(
                        "Connection lost. Reconnecting (attempt {attempt}/{max_attempts})..."
                    ));
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(SendOutcome::Aborted),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    self.store.dispatch(CouncilAction::ResetActivity);
                    self.store.dispatch(CouncilAction::SetThinking(true));
                }
                ReconnectDecision::GiveUp(kind) => {
                    self.fail_user_message(user_message_id);
                    self.notifier.error(self.failure_message(kind, &err));
                    return Err(err);
                }
            }
        }
    }

    async fn send_simple(
        &self,
        request: &ChatRequest,
        user_message_id: &str,
        cancel: &CancellationToken,
    ) -> Result<SendOutcome> {
        let seconds = self.settings.stream.timeout_secs;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(SendOutcome::Aborted),
            _ = tokio::time::sleep(self.settings.stream.timeout()) => {
                Err(CounselError::Timeout { seconds })
            }
            reply = self.backend.send_message(request) => reply,
        };

        if cancel.is_cancelled() {
            return Ok(SendOutcome::Aborted);
        }
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                self.fail_user_message(user_message_id);
                let kind = if err.is_timeout() {
                    FailureKind::Timeout
                } else {
                    FailureKind::Other
                };
                self.notifier.error(self.failure_message(kind, &err));
                return Err(err);
            }
        };

        self.store.dispatch(CouncilAction::MergeMessages(vec![
            reply.user_message,
            reply.ai_message,
        ]));
        if let Some(title) = reply.suggested_title.filter(|t| !t.trim().is_empty()) {
            self.apply_title(&request.session_id, &title).await;
        }
        self.touch_session(&request.session_id).await;
        Ok(SendOutcome::Completed)
    }

    async fn ensure_session(&self) -> Result<ChatSession> {
        if let Some(session) = self.current.read().await.clone() {
            return Ok(session);
        }
        self.create_session(None).await
    }

    /// Puts the user message into the store and returns its id.
    ///
    /// A failed placeholder with the same content is reused for the retry.
    fn stage_user_message(&self, session_id: &str, content: &str) -> String {
        let failed = self.store.read(|state| {
            state
                .messages
                .iter()
                .find(|m| {
                    m.role == MessageRole::User
                        && m.is_pending()
                        && m.is_failed()
                        && m.session_id == session_id
                        && m.content.trim() == content
                })
                .cloned()
        });

        let message = match failed {
            Some(mut message) => {
                tracing::debug!("Retrying failed message {}", message.id);
                message.metadata.remove(FAILED_METADATA_KEY);
                message.is_optimistic = true;
                message
            }
            None => ChatMessage::optimistic(session_id, MessageRole::User, content),
        };
        let id = message.id.clone();
        self.store.dispatch(CouncilAction::UpsertMessage(message));
        id
    }

    fn fail_user_message(&self, id: &str) {
        self.store
            .dispatch(CouncilAction::MarkFailed { id: id.to_string() });
    }

    fn failure_message(&self, kind: FailureKind, err: &CounselError) -> String {
        match kind {
            FailureKind::Timeout => {
                "The council took too long to respond. Please try again.".to_string()
            }
            FailureKind::Offline => format!(
                "Could not reconnect after {} attempts. Check your connection and try again.",
                self.reconnect.max_attempts()
            ),
            FailureKind::Other => format!("Failed to send message: {err}"),
        }
    }

    async fn touch_session(&self, session_id: &str) {
        if let Some(current) = self.current.write().await.as_mut() {
            if current.id == session_id {
                current.touch();
            }
        }
        if let Some(listed) = self
            .sessions
            .write()
            .await
            .iter_mut()
            .find(|s| s.id == session_id)
        {
            listed.touch();
        }
    }

    async fn apply_title(&self, session_id: &str, title: &str) {
        tracing::debug!("Applying suggested title to session {}", session_id);
        if let Some(current) = self.current.write().await.as_mut() {
            if current.id == session_id {
                current.title = title.to_string();
            }
        }
        if let Some(listed) = self
            .sessions
            .write()
            .await
            .iter_mut()
            .find(|s| s.id == session_id)
        {
            listed.title = title.to_string();
        }
    }

    async fn upsert_listed(&self, session: ChatSession) {
        let mut sessions = self.sessions.write().await;
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(slot) => *slot = session,
            None => sessions.insert(0, session),
        }
    }
}

/// Holds the single-writer flag for one send.
///
/// Dropping it clears the flag, detaches the abort handle, stops the
/// thinking indicator and wakes anyone waiting for the send to end.
struct SendGuard<'a> {
    manager: &'a ChatSessionManager,
    cancel: CancellationToken,
}

impl<'a> SendGuard<'a> {
    fn acquire(manager: &'a ChatSessionManager) -> Option<Self> {
        let acquired = manager.sending.send_if_modified(|sending| {
            if *sending {
                return false;
            }
            *sending = true;
            true
        });
        if !acquired {
            return None;
        }

        let cancel = CancellationToken::new();
        *manager.abort.lock().unwrap_or_else(|e| e.into_inner()) = Some(cancel.clone());
        Some(Self { manager, cancel })
    }
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.manager
            .abort
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.manager
            .store
            .dispatch(CouncilAction::SetThinking(false));
        self.manager.sending.send_replace(false);
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
