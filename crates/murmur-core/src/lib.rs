//! Realtime chat core and repository trait definitions for Murmur.
//!
//! This crate owns the shared mutable state of the chat server (the session
//! table and the live connection set) and the logic that moves messages
//! between them. It defines the "ports" (repository and hasher traits) that
//! the infrastructure layer implements, and depends only on `murmur-types`
//! -- never on `murmur-infra` or any database/IO crate.

pub mod chat;
pub mod connection;
pub mod repository;
pub mod service;
pub mod session;
