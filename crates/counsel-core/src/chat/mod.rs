//! Chat domain module.
//!
//! # Module Structure
//!
//! - `message`: Chat message types (`MessageRole`, `ChatMessage`)
//! - `model`: Session model (`ChatSession`, `SessionType`)
//! - `reconcile`: Merging optimistic and server-confirmed messages

mod message;
mod model;
pub mod reconcile;

// Re-export public API
pub use message::{ChatMessage, FAILED_METADATA_KEY, MessageRole, TEMP_ID_PREFIX};
pub use model::{ChatSession, DEFAULT_SESSION_TITLE, SessionType};
pub use reconcile::merge;
