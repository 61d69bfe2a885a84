use murmur_types::error::RepositoryError;
use murmur_types::user::UserRecord;

/// Repository trait for user account persistence.
pub trait UserRepository: Send + Sync {
    /// Look up an account by its exact username.
    fn find_by_username(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<Option<UserRecord>, RepositoryError>> + Send;

    /// Insert a new account. Returns `Conflict` if the username is taken.
    fn create(
        &self,
        user: &UserRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
