//! Ephemeral activity of the backend council during one conversational turn.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Default number of monologue entries kept per turn.
pub const DEFAULT_MONOLOGUE_WINDOW: usize = 20;

/// Coarse phase of the backend deliberation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    #[default]
    Idle,
    Routing,
    Investigating,
    Deliberating,
    Verdict,
}

/// What the council is doing right now. Reset every turn, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityState {
    pub stage: Stage,
    /// Display name of the agent currently speaking.
    pub actor: String,
    /// Human-readable status line.
    pub action: String,
    pub is_thinking: bool,
}

impl ActivityState {
    /// Applies the side effect of an answer token arriving.
    ///
    /// Tokens end the thinking phase: any active stage other than `Verdict`
    /// advances to `Verdict`. An `Idle` council is left untouched.
    pub fn on_token(&mut self) {
        if self.stage == Stage::Idle {
            return;
        }
        self.stage = Stage::Verdict;
        self.is_thinking = false;
    }
}

/// One line of an agent's streamed inner monologue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonologueEntry {
    pub id: String,
    pub agent: String,
    pub content: String,
    pub timestamp: String,
}

impl MonologueEntry {
    pub fn new(agent: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent: agent.into(),
            content: content.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
