use super::{Movie, Runtime};
use crate::storage::{get_i32, get_required, with_deadline, StoreError, DEFAULT_QUERY_TIMEOUT};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{sqlite::SqliteRow, SqlitePool};
use std::time::Duration;

/// Persistence for [`Movie`] records under optimistic concurrency control.
#[async_trait]
pub trait MovieRepository: Send + Sync {
    /// Inserts the movie and fills in `id`, `created_at`, and `version`.
    async fn insert(&self, movie: &mut Movie) -> Result<(), StoreError>;

    async fn get(&self, id: i64) -> Result<Movie, StoreError>;

    /// Writes every mutable field if the stored version still equals `movie.version`.
    ///
    /// On success the new version is written back into `movie` and returned. A version
    /// mismatch and a missing row both yield [`StoreError::EditConflict`].
    async fn update(&self, movie: &mut Movie) -> Result<i32, StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}

pub struct SqliteMovieRepository {
    pool: SqlitePool,
    query_timeout: Duration,
}

impl SqliteMovieRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, query_timeout: DEFAULT_QUERY_TIMEOUT }
    }

    #[must_use]
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    fn encode_genres(genres: &[String]) -> Result<String, StoreError> {
        serde_json::to_string(genres)
            .map_err(|e| StoreError::Database(format!("encode genres: {e}")))
    }

    fn row_to_movie(row: &SqliteRow) -> Result<Movie, StoreError> {
        let genres: String = get_required(row, "genres")?;

        Ok(Movie {
            id: get_required(row, "id")?,
            created_at: DateTime::from_naive_utc_and_offset(
                get_required::<NaiveDateTime>(row, "created_at")?,
                Utc,
            ),
            title: get_required(row, "title")?,
            year: get_i32(row, "year")?,
            runtime: Runtime(get_i32(row, "runtime")?),
            genres: serde_json::from_str(&genres)
                .map_err(|e| StoreError::Database(format!("column 'genres': {e}")))?,
            version: get_i32(row, "version")?,
        })
    }
}

#[async_trait]
impl MovieRepository for SqliteMovieRepository {
    async fn insert(&self, movie: &mut Movie) -> Result<(), StoreError> {
        let genres = Self::encode_genres(&movie.genres)?;

        let row = with_deadline(
            self.query_timeout,
            sqlx::query(
                r"
                INSERT INTO movies (title, year, runtime, genres)
                VALUES (?, ?, ?, ?)
                RETURNING id, created_at, version
                ",
            )
            .bind(&movie.title)
            .bind(movie.year)
            .bind(movie.runtime.0)
            .bind(genres)
            .fetch_one(&self.pool),
        )
        .await?;

        movie.id = get_required(&row, "id")?;
        movie.created_at = DateTime::from_naive_utc_and_offset(
            get_required::<NaiveDateTime>(&row, "created_at")?,
            Utc,
        );
        movie.version = get_i32(&row, "version")?;

        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Movie, StoreError> {
        if id < 1 {
            return Err(StoreError::RecordNotFound);
        }

        let row = with_deadline(
            self.query_timeout,
            sqlx::query(
                r"
                SELECT id, created_at, title, year, runtime, genres, version
                FROM movies
                WHERE id = ?
                ",
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.map(|row| Self::row_to_movie(&row)).transpose()?.ok_or(StoreError::RecordNotFound)
    }

    async fn update(&self, movie: &mut Movie) -> Result<i32, StoreError> {
        let genres = Self::encode_genres(&movie.genres)?;

        let row = with_deadline(
            self.query_timeout,
            sqlx::query(
                r"
                UPDATE movies
                SET title = ?, year = ?, runtime = ?, genres = ?, version = version + 1
                WHERE id = ? AND version = ?
                RETURNING version
                ",
            )
            .bind(&movie.title)
            .bind(movie.year)
            .bind(movie.runtime.0)
            .bind(genres)
            .bind(movie.id)
            .bind(movie.version)
            .fetch_optional(&self.pool),
        )
        .await?;

        let row = row.ok_or(StoreError::EditConflict)?;
        movie.version = get_i32(&row, "version")?;

        Ok(movie.version)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        if id < 1 {
            return Err(StoreError::RecordNotFound);
        }

        let result = with_deadline(
            self.query_timeout,
            sqlx::query("DELETE FROM movies WHERE id = ?").bind(id).execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RecordNotFound);
        }

        Ok(())
    }
}
