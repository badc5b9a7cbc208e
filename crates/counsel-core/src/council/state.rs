//! Council state and the actions that mutate it.

use std::collections::VecDeque;

use serde::Serialize;

use super::activity::{ActivityState, MonologueEntry, Stage};
use crate::chat::{ChatMessage, reconcile};

/// A discrete mutation of the council state.
#[derive(Debug, Clone, PartialEq)]
pub enum CouncilAction {
    /// Overwrite the current stage.
    SetStage(Stage),
    /// Overwrite actor and action (when present) and mark the council thinking.
    StepUpdate {
        actor: Option<String>,
        action: Option<String>,
    },
    /// Append a monologue line, evicting the oldest beyond the window.
    AppendMonologue { agent: String, content: String },
    /// An answer token arrived (stage auto-advance).
    TokenArrived,
    SetThinking(bool),
    /// Back to an idle council: stage, actor, roster and monologue cleared.
    ResetActivity,
    ReplaceMessages(Vec<ChatMessage>),
    /// Reconcile a batch into the message list.
    MergeMessages(Vec<ChatMessage>),
    /// Insert a message, replacing one with the same id.
    UpsertMessage(ChatMessage),
    AppendContent { id: String, chunk: String },
    AppendReasoning { id: String, chunk: String },
    /// Server acknowledged a message: clear `is_optimistic`, keep the id.
    Acknowledge {
        id: String,
        server_id: Option<String>,
    },
    MarkFailed { id: String },
    RemoveMessage { id: String },
}

/// Everything the UI reads: activity, roster, monologue window and messages.
#[derive(Debug, Clone, Serialize)]
pub struct CouncilState {
    pub activity: ActivityState,
    /// Agents seen this turn, in first-seen order.
    pub active_agents: Vec<String>,
    pub monologue: VecDeque<MonologueEntry>,
    /// Canonical message list of the active session.
    pub messages: Vec<ChatMessage>,
    #[serde(skip)]
    monologue_limit: usize,
}

impl CouncilState {
    pub fn new(monologue_limit: usize) -> Self {
        Self {
            activity: ActivityState::default(),
            active_agents: Vec::new(),
            monologue: VecDeque::with_capacity(monologue_limit),
            messages: Vec::new(),
            monologue_limit,
        }
    }

    /// Finds a message by id.
    pub fn message(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn message_mut(&mut self, id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Applies one action.
    pub fn apply(&mut self, action: CouncilAction) {
        match action {
            CouncilAction::SetStage(stage) => self.activity.stage = stage,
            CouncilAction::StepUpdate { actor, action } => {
                if let Some(actor) = actor {
                    if !self.active_agents.contains(&actor) {
                        self.active_agents.push(actor.clone());
                    }
                    self.activity.actor = actor;
                }
                if let Some(action) = action {
                    self.activity.action = action;
                }
                self.activity.is_thinking = true;
            }
            CouncilAction::AppendMonologue { agent, content } => {
                if self.monologue_limit == 0 {
                    return;
                }
                while self.monologue.len() >= self.monologue_limit {
                    self.monologue.pop_front();
                }
                self.monologue.push_back(MonologueEntry::new(agent, content));
            }
            CouncilAction::TokenArrived => self.activity.on_token(),
            CouncilAction::SetThinking(thinking) => self.activity.is_thinking = thinking,
            CouncilAction::ResetActivity => {
                self.activity = ActivityState::default();
                self.active_agents.clear();
                self.monologue.clear();
            }
            CouncilAction::ReplaceMessages(messages) => self.messages = messages,
            CouncilAction::MergeMessages(incoming) => {
                self.messages = reconcile::merge(&self.messages, &incoming);
            }
            CouncilAction::UpsertMessage(message) => match self.message_mut(&message.id) {
                Some(slot) => *slot = message,
                None => self.messages.push(message),
            },
            CouncilAction::AppendContent { id, chunk } => {
                if let Some(message) = self.message_mut(&id) {
                    message.content.push_str(&chunk);
                }
            }
            CouncilAction::AppendReasoning { id, chunk } => {
                if let Some(message) = self.message_mut(&id) {
                    message
                        .reasoning
                        .get_or_insert_with(String::new)
                        .push_str(&chunk);
                }
            }
            CouncilAction::Acknowledge { id, server_id } => {
                if let Some(message) = self.message_mut(&id) {
                    message.is_optimistic = false;
                    if let Some(server_id) = server_id {
                        message
                            .metadata
                            .insert("server_id".to_string(), server_id.into());
                    }
                }
            }
            CouncilAction::MarkFailed { id } => {
                if let Some(message) = self.message_mut(&id) {
                    message.mark_failed();
                }
            }
            CouncilAction::RemoveMessage { id } => self.messages.retain(|m| m.id != id),
        }
    }
}
