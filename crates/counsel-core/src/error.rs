//! Error types for the Counsel client.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for the entire Counsel client.
///
/// Variants follow the failure taxonomy of the deliberation stream: transport
/// timeouts, connectivity loss, HTTP-level rejections, oversized frames,
/// send preconditions and the storage/serialization errors of the ambient stack.
#[derive(Error, Debug, Clone, Serialize)]
pub enum CounselError {
    /// The client-side deadline for a streaming turn elapsed.
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The runtime reports no network connectivity.
    #[error("No network connection")]
    Offline,

    /// Transport-level failure (connect, read, body).
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// A frame grew past the configured buffer cap without a delimiter.
    #[error("Stream frame exceeded {limit} bytes without a delimiter")]
    FrameTooLarge { limit: usize },

    /// No usable credential or actor identity.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A send was rejected before any network call.
    #[error("Cannot send: {0}")]
    Precondition(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CounselError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates an Auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Creates a Precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a client-side timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this error came from the transport rather than the server.
    ///
    /// Returns true for `Offline` and `Network`. HTTP status errors are
    /// answers from a reachable server and do not count.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Offline | Self::Network(_))
    }

    /// Check if this is an authentication error
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Auth(_) => true,
            Self::Http { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Http { status, .. } => *status == 404,
            _ => false,
        }
    }

    /// Check if this is a send precondition failure
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for CounselError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for CounselError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CounselError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for CounselError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (for collaborators that report via anyhow)
impl From<anyhow::Error> for CounselError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, CounselError>`.
pub type Result<T> = std::result::Result<T, CounselError>;
