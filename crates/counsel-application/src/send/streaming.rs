//! One streaming attempt: open, frame, decode, route.

use std::fmt;

use counsel_core::backend::{ChatBackend, ChatRequest};
use counsel_core::config::StreamSettings;
use counsel_core::error::{CounselError, Result};
use counsel_core::stream::{Decoded, FrameBuffer, decode_frame};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::router::EventRouter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Failed,
    Aborted,
}

impl fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// How a turn that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// `[DONE]` or end of body.
    Completed,
    /// The cancellation token fired.
    Aborted,
}

/// Drives a single streaming attempt against the backend.
///
/// The deadline covers the whole attempt, connect included.
pub struct StreamingTurn<'a> {
    router: &'a mut EventRouter,
    settings: &'a StreamSettings,
    phase: StreamPhase,
}

impl<'a> StreamingTurn<'a> {
    pub fn new(router: &'a mut EventRouter, settings: &'a StreamSettings) -> Self {
        Self {
            router,
            settings,
            phase: StreamPhase::Idle,
        }
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub async fn run(
        &mut self,
        backend: &dyn ChatBackend,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let result = self.drive(backend, request, cancel).await;
        self.phase = match &result {
            Ok(TurnOutcome::Completed) => StreamPhase::Completed,
            Ok(TurnOutcome::Aborted) => StreamPhase::Aborted,
            Err(_) => StreamPhase::Failed,
        };
        tracing::debug!(target: "counsel::stream", "Turn ended: {}", self.phase);
        result
    }

    async fn drive(
        &mut self,
        backend: &dyn ChatBackend,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let seconds = self.settings.timeout_secs;
        let timeout = move || CounselError::Timeout { seconds };
        let deadline = tokio::time::sleep(self.settings.timeout());
        tokio::pin!(deadline);

        self.phase = StreamPhase::Connecting;
        let mut body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(TurnOutcome::Aborted),
            _ = &mut deadline => return Err(timeout()),
            opened = backend.open_stream(request) => opened?,
        };

        self.phase = StreamPhase::Streaming;
        let mut frames = FrameBuffer::with_limit(self.settings.max_buffer_bytes);
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(TurnOutcome::Aborted),
                _ = &mut deadline => return Err(timeout()),
                chunk = body.next() => chunk,
            };

            let Some(chunk) = chunk else {
                if cancel.is_cancelled() {
                    return Ok(TurnOutcome::Aborted);
                }
                if let Some(Decoded::Done) = frames.finish().and_then(|f| self.handle(&f)) {
                    return Ok(TurnOutcome::Completed);
                }
                tracing::warn!(
                    target: "counsel::stream",
                    "Stream for session {} ended without a completion marker",
                    request.session_id
                );
                return Ok(TurnOutcome::Completed);
            };

            frames.push_bytes(&chunk?)?;
            for frame in frames.by_ref() {
                // A chunk can carry many frames; none may land after an abort.
                if cancel.is_cancelled() {
                    return Ok(TurnOutcome::Aborted);
                }
                if let Some(Decoded::Done) = self.handle(&frame) {
                    return Ok(TurnOutcome::Completed);
                }
            }
        }
    }

    /// Routes an event frame; returns `Some(Done)` for the terminator.
    fn handle(&mut self, frame: &str) -> Option<Decoded> {
        match decode_frame(frame)? {
            Decoded::Event(event) => {
                self.router.apply(event);
                None
            }
            Decoded::Done => Some(Decoded::Done),
        }
    }
}
