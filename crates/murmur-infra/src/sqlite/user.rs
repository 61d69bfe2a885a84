//! SQLite user repository implementation.

use murmur_core::repository::user::UserRepository;
use murmur_types::error::RepositoryError;
use murmur_types::identity::{Rank, UserId};
use murmur_types::user::UserRecord;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `UserRepository`.
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<UserRecord, RepositoryError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let rank: String = row
        .try_get("rank")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    Ok(UserRecord {
        id: id
            .parse::<UserId>()
            .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))?,
        username: row
            .try_get("username")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        password_hash: row
            .try_get("password")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        rank: rank.parse::<Rank>().map_err(RepositoryError::Query)?,
    })
}

impl UserRepository for SqliteUserRepository {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, password, rank FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn create(&self, user: &UserRecord) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("INSERT INTO users (id, username, password, rank) VALUES (?, ?, ?, ?)")
                .bind(user.id.to_string())
                .bind(&user.username)
                .bind(&user.password_hash)
                .bind(user.rank.to_string())
                .execute(&self.pool.writer)
                .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("username '{}' already exists", user.username)),
            ),
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }
}
