//! Domain layer of the Counsel deliberation stream client.
//!
//! Pure types and algorithms: the chat data model, the wire protocol
//! (framing and decoding), message reconciliation, the council state store,
//! and the traits through which the application layer reaches the server,
//! the credential and the connectivity signal.

pub mod backend;
pub mod chat;
pub mod config;
pub mod connectivity;
pub mod council;
pub mod error;
pub mod identity;
pub mod notice;
pub mod stream;

// Re-export common error type
pub use error::{CounselError, Result};
