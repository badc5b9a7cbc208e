//! Message sending: streaming turns, event routing and reconnection.

pub mod reconnect;
pub mod router;
pub mod streaming;

pub use reconnect::{FailureKind, ReconnectDecision, ReconnectionController, classify};
pub use router::EventRouter;
pub use streaming::{StreamPhase, StreamingTurn, TurnOutcome};

/// Options of a single send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    /// Use the streaming endpoint (default) or the single-response fallback.
    pub stream: bool,
    /// Orchestration mode; the configured default when `None`.
    pub mode: Option<String>,
    /// Optional context summary forwarded to the orchestrator.
    pub context_summary: Option<String>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            stream: true,
            mode: None,
            context_summary: None,
        }
    }
}

/// How a send call ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    /// Cancelled by the caller. Partial content stays visible.
    Aborted,
    /// Another send was already in flight; nothing happened.
    Ignored,
}
