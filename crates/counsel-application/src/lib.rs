//! Application layer of the Counsel client.
//!
//! Coordinates the chat backend, the council store and the notifier to
//! implement the session lifecycle and the streaming send with reconnection.

pub mod send;
pub mod session;

pub use send::{SendOptions, SendOutcome};
pub use session::ChatSessionManager;
