//! HTTP and WebSocket layer for Murmur.
//!
//! Axum router with cookie-carried sessions: JSON auth endpoints, the chat
//! WebSocket, and a health probe.

pub mod error;
pub mod handlers;
pub mod router;
