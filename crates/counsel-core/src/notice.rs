//! User-facing notices.
//!
//! Failures and progress are delivered to the UI as transient notices rather
//! than returned errors, so message and activity state stay inspectable.

use serde::Serialize;
use strum::Display;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Sends notices to an optional UI channel and mirrors them to the log.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    sender: Option<mpsc::UnboundedSender<Notice>>,
}

impl Notifier {
    /// Creates a notifier and the receiving end the UI drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A notifier that only logs.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Info, message.into());
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Warning, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Error, message.into());
    }

    fn notify(&self, level: NoticeLevel, message: String) {
        match level {
            NoticeLevel::Info => tracing::info!(target: "counsel::notice", "{}", message),
            NoticeLevel::Warning => tracing::warn!(target: "counsel::notice", "{}", message),
            NoticeLevel::Error => tracing::error!(target: "counsel::notice", "{}", message),
        }
        if let Some(sender) = &self.sender {
            // A closed receiver means the UI is gone; nothing left to tell.
            let _ = sender.send(Notice { level, message });
        }
    }
}
