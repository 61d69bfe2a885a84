//! PasswordHasher trait for credential storage.
//!
//! Defined in murmur-core so the account service can hash and verify
//! passwords without coupling to a specific algorithm. The Argon2id adapter
//! lives in murmur-infra.

/// Abstraction over one-way password hashing.
pub trait PasswordHasher: Send + Sync + 'static {
    /// Hash a plaintext password into a self-describing (PHC) string.
    fn hash(&self, password: &str) -> Result<String, String>;

    /// Check a plaintext password against a stored hash.
    ///
    /// `Ok(false)` on mismatch, `Err` only when the stored hash is malformed.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, String>;
}
