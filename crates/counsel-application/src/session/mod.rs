//! Session lifecycle services.
//!
//! The manager owns the active session, its message list (through the council
//! store) and the single in-flight send.

mod manager;

pub use manager::ChatSessionManager;
