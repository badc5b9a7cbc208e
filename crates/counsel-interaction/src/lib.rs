//! Interaction layer for Counsel.
//!
//! Implements the `ChatBackend` trait over HTTP: the session REST endpoints,
//! the streaming chat endpoint and the non-streaming fallback.

pub mod http_backend;

pub use http_backend::HttpChatBackend;
