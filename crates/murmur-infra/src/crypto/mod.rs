//! Cryptographic operations for Murmur.
//!
//! - `password`: Argon2id hashing for stored credentials

pub mod password;
