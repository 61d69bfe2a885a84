//! Account service: signup, login, and provisioning.
//!
//! Issues the [`Identity`] assertions that sessions carry. Password hashing
//! is CPU-bound, so it runs on the blocking pool rather than a runtime worker.

use std::sync::Arc;

use murmur_types::error::{AccountError, FieldErrors, RepositoryError};
use murmur_types::identity::{Identity, Rank, UserId};
use murmur_types::user::UserRecord;
use tracing::{debug, info};

use crate::repository::user::UserRepository;
use crate::service::hash::PasswordHasher;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

const USERNAME_TAKEN: &str = "Username already taken!";
const USERNAME_REQUIRED: &str = "Username is required!";
const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters!";
const PASSWORD_MISMATCH: &str = "Repeated password is different!";

/// Service verifying credentials and creating accounts.
///
/// Generic over the user repository and hasher so murmur-core never depends
/// on murmur-infra.
pub struct AccountService<U: UserRepository, H: PasswordHasher> {
    users: U,
    hasher: Arc<H>,
}

impl<U: UserRepository, H: PasswordHasher> AccountService<U, H> {
    pub fn new(users: U, hasher: H) -> Self {
        Self {
            users,
            hasher: Arc::new(hasher),
        }
    }

    /// Register a new user account and return its identity.
    ///
    /// All validation failures are collected and returned together, keyed by
    /// form field (`username`, `password`, `repeatPassword`).
    pub async fn signup(
        &self,
        username: &str,
        password: &str,
        repeat_password: &str,
    ) -> Result<Identity, AccountError> {
        let mut errors = FieldErrors::new();

        if username.trim().is_empty() {
            errors.insert("username".to_string(), USERNAME_REQUIRED.to_string());
        } else if self.find(username).await?.is_some() {
            errors.insert("username".to_string(), USERNAME_TAKEN.to_string());
        }

        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert("password".to_string(), PASSWORD_TOO_SHORT.to_string());
        }

        if password != repeat_password {
            errors.insert("repeatPassword".to_string(), PASSWORD_MISMATCH.to_string());
        }

        if !errors.is_empty() {
            debug!(username, fields = ?errors.keys().collect::<Vec<_>>(), "signup rejected");
            return Err(AccountError::Validation(errors));
        }

        let user = self.insert_user(username, password, Rank::User).await?;
        info!(user_id = %user.id, username = %user.username, "user signed up");
        Ok(user.identity())
    }

    /// Verify a username/password pair and return the account's identity.
    ///
    /// Unknown users and wrong passwords produce the same error.
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, AccountError> {
        let Some(user) = self.find(username).await? else {
            debug!(username, "login for unknown user");
            return Err(AccountError::InvalidCredentials);
        };

        let hasher = Arc::clone(&self.hasher);
        let plain = password.to_string();
        let stored = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&plain, &stored))
            .await
            .map_err(|e| AccountError::Hashing(e.to_string()))?
            .map_err(AccountError::Hashing)?;

        if !valid {
            debug!(username, "login with wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        Ok(user.identity())
    }

    /// Provision an account directly (CLI path), optionally as an admin.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        rank: Rank,
    ) -> Result<UserRecord, AccountError> {
        let mut errors = FieldErrors::new();
        if username.trim().is_empty() {
            errors.insert("username".to_string(), USERNAME_REQUIRED.to_string());
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert("password".to_string(), PASSWORD_TOO_SHORT.to_string());
        }
        if !errors.is_empty() {
            return Err(AccountError::Validation(errors));
        }

        let user = self.insert_user(username, password, rank).await?;
        info!(user_id = %user.id, username = %user.username, %rank, "user provisioned");
        Ok(user)
    }

    async fn find(&self, username: &str) -> Result<Option<UserRecord>, AccountError> {
        self.users
            .find_by_username(username)
            .await
            .map_err(|e| AccountError::StorageError(e.to_string()))
    }

    async fn insert_user(
        &self,
        username: &str,
        password: &str,
        rank: Rank,
    ) -> Result<UserRecord, AccountError> {
        let hasher = Arc::clone(&self.hasher);
        let plain = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| AccountError::Hashing(e.to_string()))?
            .map_err(AccountError::Hashing)?;

        let user = UserRecord {
            id: UserId::new(),
            username: username.to_string(),
            password_hash,
            rank,
        };

        self.users.create(&user).await.map_err(|e| match e {
            // Lost a race with a concurrent signup for the same name.
            RepositoryError::Conflict(_) => AccountError::Validation(FieldErrors::from([(
                "username".to_string(),
                USERNAME_TAKEN.to_string(),
            )])),
            other => AccountError::StorageError(other.to_string()),
        })?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemoryUsers {
        users: Mutex<HashMap<String, UserRecord>>,
    }

    impl UserRepository for MemoryUsers {
        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<UserRecord>, RepositoryError> {
            Ok(self.users.lock().await.get(username).cloned())
        }

        async fn create(&self, user: &UserRecord) -> Result<(), RepositoryError> {
            let mut users = self.users.lock().await;
            if users.contains_key(&user.username) {
                return Err(RepositoryError::Conflict(user.username.clone()));
            }
            users.insert(user.username.clone(), user.clone());
            Ok(())
        }
    }

    /// Reversible stand-in so tests stay fast.
    struct PlainHasher;

    impl PasswordHasher for PlainHasher {
        fn hash(&self, password: &str) -> Result<String, String> {
            Ok(format!("plain${password}"))
        }

        fn verify(&self, password: &str, hash: &str) -> Result<bool, String> {
            let stored = hash.strip_prefix("plain$").ok_or("malformed hash")?;
            Ok(stored == password)
        }
    }

    fn service() -> AccountService<MemoryUsers, PlainHasher> {
        AccountService::new(MemoryUsers::default(), PlainHasher)
    }

    fn validation_errors(err: AccountError) -> FieldErrors {
        match err {
            AccountError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_signup_issues_user_identity() {
        let svc = service();
        let identity = svc.signup("alice", "secret1", "secret1").await.unwrap();

        assert_eq!(identity.username, "alice");
        assert!(!identity.is_admin);

        let stored = svc.users.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(stored.id, identity.user_id);
        assert_ne!(stored.password_hash, "secret1");
    }

    #[tokio::test]
    async fn test_signup_collects_all_field_errors() {
        let svc = service();
        svc.signup("alice", "secret1", "secret1").await.unwrap();

        let errors = validation_errors(svc.signup("alice", "abc", "abd").await.unwrap_err());
        assert_eq!(errors.len(), 3);
        assert_eq!(errors["username"], USERNAME_TAKEN);
        assert_eq!(errors["password"], PASSWORD_TOO_SHORT);
        assert_eq!(errors["repeatPassword"], PASSWORD_MISMATCH);
    }

    #[tokio::test]
    async fn test_signup_requires_username() {
        let svc = service();
        let errors = validation_errors(svc.signup("  ", "secret1", "secret1").await.unwrap_err());
        assert_eq!(errors["username"], USERNAME_REQUIRED);
    }

    #[tokio::test]
    async fn test_login_success_and_failures_are_indistinguishable() {
        let svc = service();
        svc.signup("bob", "hunter22", "hunter22").await.unwrap();

        let identity = svc.login("bob", "hunter22").await.unwrap();
        assert_eq!(identity.username, "bob");

        let wrong_pw = svc.login("bob", "nope").await.unwrap_err();
        let unknown = svc.login("carol", "hunter22").await.unwrap_err();
        assert!(matches!(wrong_pw, AccountError::InvalidCredentials));
        assert!(matches!(unknown, AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_create_admin_user() {
        let svc = service();
        let user = svc.create_user("root", "rootpass", Rank::Admin).await.unwrap();
        assert_eq!(user.rank, Rank::Admin);

        let identity = svc.login("root", "rootpass").await.unwrap();
        assert!(identity.is_admin);
    }

    #[tokio::test]
    async fn test_create_user_duplicate_maps_to_username_taken() {
        let svc = service();
        svc.create_user("dup", "password", Rank::User).await.unwrap();
        let errors =
            validation_errors(svc.create_user("dup", "password", Rank::User).await.unwrap_err());
        assert_eq!(errors["username"], USERNAME_TAKEN);
    }
}
