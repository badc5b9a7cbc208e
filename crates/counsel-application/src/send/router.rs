//! Routes decoded stream events into the council store.

use counsel_core::chat::{ChatMessage, MessageRole};
use counsel_core::council::{CouncilAction, CouncilStore};
use counsel_core::notice::Notifier;
use counsel_core::stream::StreamEvent;

/// Agent name used for monologue lines whose step carries no actor.
pub const FALLBACK_AGENT: &str = "Council";

/// Applies the events of one streaming turn.
///
/// Owns the id of the assistant placeholder, which is created lazily by the
/// first answer or reasoning fragment.
pub struct EventRouter {
    store: CouncilStore,
    notifier: Notifier,
    session_id: String,
    user_message_id: String,
    assistant_id: Option<String>,
}

impl EventRouter {
    pub fn new(
        store: CouncilStore,
        notifier: Notifier,
        session_id: impl Into<String>,
        user_message_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            session_id: session_id.into(),
            user_message_id: user_message_id.into(),
            assistant_id: None,
        }
    }

    pub fn assistant_id(&self) -> Option<&str> {
        self.assistant_id.as_deref()
    }

    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::StageChange { stage } => {
                self.store.dispatch(CouncilAction::SetStage(stage));
            }
            StreamEvent::StepUpdate { payload } => {
                let action = payload.message.clone().or(payload.status);
                self.store.dispatch(CouncilAction::StepUpdate {
                    actor: payload.actor.clone(),
                    action,
                });
                if let Some(message) = payload.message.filter(|m| !m.trim().is_empty()) {
                    self.store.dispatch(CouncilAction::AppendMonologue {
                        agent: payload.actor.unwrap_or_else(|| FALLBACK_AGENT.to_string()),
                        content: message,
                    });
                }
            }
            StreamEvent::ReasoningChunk { content } => {
                let id = self.ensure_assistant();
                self.store.dispatch(CouncilAction::AppendReasoning { id, chunk: content });
            }
            StreamEvent::Token { content } => {
                let id = self.ensure_assistant();
                self.store.dispatch(CouncilAction::AppendContent { id, chunk: content });
                self.store.dispatch(CouncilAction::TokenArrived);
            }
            StreamEvent::UserMessageSaved { message_id } => {
                self.store.dispatch(CouncilAction::Acknowledge {
                    id: self.user_message_id.clone(),
                    server_id: message_id,
                });
            }
            StreamEvent::AiMessageSaved { message_id } => match &self.assistant_id {
                Some(id) => {
                    self.store.dispatch(CouncilAction::Acknowledge {
                        id: id.clone(),
                        server_id: message_id,
                    });
                }
                None => {
                    tracing::debug!(
                        target: "counsel::stream",
                        "ai_message_saved before any answer content; ignoring"
                    );
                }
            },
            StreamEvent::Error { content } => {
                tracing::warn!(target: "counsel::stream", "Server reported: {}", content);
                self.notifier.error(content);
            }
        }
    }

    /// Drops the partially streamed assistant message, if any.
    pub fn discard_partial(&mut self) {
        if let Some(id) = self.assistant_id.take() {
            self.store.dispatch(CouncilAction::RemoveMessage { id });
        }
    }

    fn ensure_assistant(&mut self) -> String {
        if let Some(id) = &self.assistant_id {
            return id.clone();
        }
        let placeholder = ChatMessage::optimistic(&self.session_id, MessageRole::Assistant, "");
        let id = placeholder.id.clone();
        self.store.dispatch(CouncilAction::UpsertMessage(placeholder));
        self.assistant_id = Some(id.clone());
        id
    }
}
