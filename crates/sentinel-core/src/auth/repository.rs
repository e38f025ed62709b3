use super::{
    token::{Token, TokenScope},
    User,
};
use crate::storage::{get_i32, get_required, with_deadline, StoreError, DEFAULT_QUERY_TIMEOUT};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{sqlite::SqliteRow, SqlitePool};
use std::time::Duration;

/// Repository trait for credential persistence.
///
/// Provides an abstraction layer enabling testability (mock implementations)
/// and backend flexibility. Implementations must bound every call by a deadline.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Stores the digest, owner, expiry, and scope of a freshly issued credential.
    async fn insert(&self, token: &Token) -> Result<(), StoreError>;

    /// Finds the user owning an unexpired credential with this digest and scope.
    async fn find_user_for_token(
        &self,
        scope: TokenScope,
        hash: &[u8],
    ) -> Result<Option<User>, StoreError>;

    /// Deletes every credential of `user_id` in `scope`, returning how many were removed.
    async fn delete_all_for_user(&self, scope: TokenScope, user_id: i64)
        -> Result<u64, StoreError>;
}

/// Repository trait for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts the user and fills in `id`, `created_at`, and `version`.
    async fn create_user(&self, user: &mut User) -> Result<(), StoreError>;

    async fn get_user(&self, id: i64) -> Result<User, StoreError>;

    /// Marks the user activated if its stored version still matches `user.version`.
    ///
    /// On success `user.version` is advanced to the stored value. A version mismatch or a
    /// missing row yields [`StoreError::EditConflict`].
    async fn activate_user(&self, user: &mut User) -> Result<i32, StoreError>;
}

pub struct SqliteRepository {
    pool: SqlitePool,
    query_timeout: Duration,
}

impl SqliteRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, query_timeout: DEFAULT_QUERY_TIMEOUT }
    }

    #[must_use]
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_user(row: &SqliteRow) -> Result<User, StoreError> {
        Ok(User {
            id: get_required(row, "id")?,
            created_at: DateTime::from_naive_utc_and_offset(
                get_required::<NaiveDateTime>(row, "created_at")?,
                Utc,
            ),
            name: get_required(row, "name")?,
            email: get_required(row, "email")?,
            activated: get_required(row, "activated")?,
            version: get_i32(row, "version")?,
        })
    }
}

#[async_trait]
impl TokenRepository for SqliteRepository {
    async fn insert(&self, token: &Token) -> Result<(), StoreError> {
        with_deadline(
            self.query_timeout,
            sqlx::query(
                r"
                INSERT INTO tokens (hash, user_id, expiry, scope)
                VALUES (?, ?, ?, ?)
                ",
            )
            .bind(token.hash.as_slice())
            .bind(token.user_id)
            .bind(token.expiry.timestamp())
            .bind(token.scope.as_str())
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn find_user_for_token(
        &self,
        scope: TokenScope,
        hash: &[u8],
    ) -> Result<Option<User>, StoreError> {
        // expiry is stored as unix seconds
        let now = Utc::now().timestamp();

        let row = with_deadline(
            self.query_timeout,
            sqlx::query(
                r"
                SELECT users.id, users.created_at, users.name, users.email,
                       users.activated, users.version
                FROM users
                INNER JOIN tokens ON users.id = tokens.user_id
                WHERE tokens.hash = ? AND tokens.scope = ? AND tokens.expiry > ?
                ",
            )
            .bind(hash)
            .bind(scope.as_str())
            .bind(now)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.map(|row| Self::row_to_user(&row)).transpose()
    }

    async fn delete_all_for_user(
        &self,
        scope: TokenScope,
        user_id: i64,
    ) -> Result<u64, StoreError> {
        let result = with_deadline(
            self.query_timeout,
            sqlx::query("DELETE FROM tokens WHERE scope = ? AND user_id = ?")
                .bind(scope.as_str())
                .bind(user_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn create_user(&self, user: &mut User) -> Result<(), StoreError> {
        let row = with_deadline(
            self.query_timeout,
            sqlx::query(
                r"
                INSERT INTO users (name, email, activated)
                VALUES (?, ?, ?)
                RETURNING id, created_at, version
                ",
            )
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.activated)
            .fetch_one(&self.pool),
        )
        .await?;

        user.id = get_required(&row, "id")?;
        user.created_at = DateTime::from_naive_utc_and_offset(
            get_required::<NaiveDateTime>(&row, "created_at")?,
            Utc,
        );
        user.version = get_i32(&row, "version")?;

        Ok(())
    }

    async fn get_user(&self, id: i64) -> Result<User, StoreError> {
        if id < 1 {
            return Err(StoreError::RecordNotFound);
        }

        let row = with_deadline(
            self.query_timeout,
            sqlx::query(
                r"
                SELECT id, created_at, name, email, activated, version
                FROM users
                WHERE id = ?
                ",
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.map(|row| Self::row_to_user(&row)).transpose()?.ok_or(StoreError::RecordNotFound)
    }

    async fn activate_user(&self, user: &mut User) -> Result<i32, StoreError> {
        let row = with_deadline(
            self.query_timeout,
            sqlx::query(
                r"
                UPDATE users
                SET activated = 1, version = version + 1
                WHERE id = ? AND version = ?
                RETURNING version
                ",
            )
            .bind(user.id)
            .bind(user.version)
            .fetch_optional(&self.pool),
        )
        .await?;

        let row = row.ok_or(StoreError::EditConflict)?;
        user.version = get_i32(&row, "version")?;
        user.activated = true;

        Ok(user.version)
    }
}
