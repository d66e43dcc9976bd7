//! Write-once SQLite cache for resolved lyrics, keyed by track identity.

use crate::lyrics::types::{LyricsError, LyricsRecord, TrackIdentity};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS lyrics (\
    id INTEGER PRIMARY KEY AUTOINCREMENT,\
    title TEXT NOT NULL,\
    artist TEXT NOT NULL,\
    album TEXT NOT NULL,\
    duration INTEGER NOT NULL,\
    isSynced INTEGER NOT NULL,\
    lyrics TEXT NOT NULL\
)";

/// Read-through, insert-if-absent lyrics store. Rows are never updated or
/// deleted once written.
pub struct LyricsCache {
    pool: SqlitePool,
}

impl LyricsCache {
    /// Open (creating file and schema if absent) the cache at `path`.
    pub async fn open(path: &Path) -> Result<Self, LyricsError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect(options).await
    }

    /// In-memory cache, used by tests.
    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self, LyricsError> {
        use std::str::FromStr;
        Self::connect(SqliteConnectOptions::from_str("sqlite::memory:")?).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self, LyricsError> {
        // Single connection: callers are sequential, and an in-memory
        // database lives only as long as its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Exact-key read. `Ok(None)` is a cache miss.
    pub async fn get(
        &self,
        identity: &TrackIdentity,
    ) -> Result<Option<LyricsRecord>, LyricsError> {
        let row = sqlx::query(
            "SELECT isSynced, lyrics FROM lyrics \
             WHERE title = ?1 AND artist = ?2 AND album = ?3 AND duration = ?4",
        )
        .bind(&identity.title)
        .bind(&identity.artist)
        .bind(&identity.album)
        .bind(identity.duration_secs)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| LyricsRecord {
            identity: identity.clone(),
            synced: row.get::<i64, _>("isSynced") != 0,
            lyrics: row.get("lyrics"),
        }))
    }

    /// Insert the record unless a row for its identity already exists.
    /// Returns whether a row was inserted. The guard runs inside a single
    /// statement, so concurrent callers still end up with one row.
    pub async fn put_if_absent(&self, record: &LyricsRecord) -> Result<bool, LyricsError> {
        let result = sqlx::query(
            "INSERT INTO lyrics (title, artist, album, duration, isSynced, lyrics) \
             SELECT ?1, ?2, ?3, ?4, ?5, ?6 \
             WHERE NOT EXISTS (\
                 SELECT 1 FROM lyrics \
                 WHERE title = ?1 AND artist = ?2 AND album = ?3 AND duration = ?4\
             )",
        )
        .bind(&record.identity.title)
        .bind(&record.identity.artist)
        .bind(&record.identity.album)
        .bind(record.identity.duration_secs)
        .bind(record.synced as i64)
        .bind(&record.lyrics)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
