//! Infrastructure layer for Murmur.
//!
//! Contains implementations of the traits defined in `murmur-core`: SQLite
//! storage for users and messages, Argon2id password hashing, and the
//! `config.toml` loader.

pub mod config;
pub mod crypto;
pub mod sqlite;
