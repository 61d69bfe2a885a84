//! Shared domain types for Murmur.
//!
//! This crate contains the core domain types used across the Murmur chat
//! server: identities, sessions, chat messages and their wire frames,
//! connection state, configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod connection;
pub mod error;
pub mod identity;
pub mod message;
pub mod session;
pub mod user;
