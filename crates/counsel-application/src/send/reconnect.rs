//! Reconnection policy for failed streaming turns.
//!
//! Only connectivity loss is retried. The whole send is re-issued each time;
//! the protocol has no resumption token, and reconciliation absorbs the
//! duplicate user message a resubmission may produce.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use counsel_core::config::ReconnectSettings;
use counsel_core::connectivity::Connectivity;
use counsel_core::error::CounselError;

/// How a stream failure is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Client deadline elapsed. Reported, never retried.
    Timeout,
    /// Network failure while offline or with the server unreachable. Retried.
    Offline,
    /// Anything else. Reported with its message, never retried.
    Other,
}

/// Classifies a stream failure.
pub fn classify(error: &CounselError, connectivity: &dyn Connectivity) -> FailureKind {
    if error.is_timeout() {
        FailureKind::Timeout
    } else if error.is_network() && !connectivity.is_online() {
        FailureKind::Offline
    } else {
        FailureKind::Other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Wait `delay`, then re-issue the send.
    Retry {
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
    },
    /// Stop and report.
    GiveUp(FailureKind),
}

/// Counts consecutive connectivity failures against a fixed bound.
#[derive(Debug)]
pub struct ReconnectionController {
    settings: ReconnectSettings,
    attempts: AtomicU32,
}

impl ReconnectionController {
    pub fn new(settings: ReconnectSettings) -> Self {
        Self {
            settings,
            attempts: AtomicU32::new(0),
        }
    }

    /// Decides what to do about `error`.
    ///
    /// The counter resets whenever the controller gives up, so the next send
    /// starts with a full budget.
    pub fn on_failure(
        &self,
        error: &CounselError,
        connectivity: &dyn Connectivity,
    ) -> ReconnectDecision {
        let kind = classify(error, connectivity);
        if kind != FailureKind::Offline {
            self.reset();
            return ReconnectDecision::GiveUp(kind);
        }

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt > self.settings.max_attempts {
            self.reset();
            return ReconnectDecision::GiveUp(kind);
        }

        ReconnectDecision::Retry {
            attempt,
            max_attempts: self.settings.max_attempts,
            delay: self.settings.delay(),
        }
    }

    /// Clears the attempt counter.
    pub fn reset(&self) {
        self.attempts.store(0, Ordering::SeqCst);
    }

    /// Attempts used so far in the current failure run.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn max_attempts(&self) -> u32 {
        self.settings.max_attempts
    }
}
