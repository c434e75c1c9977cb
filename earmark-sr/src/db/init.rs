//! Catalog schema initialization
//!
//! Idempotent table/index creation. The schema is part of the on-disk
//! contract: `fingerprints.hash` stores the 20-character hex hash as text,
//! and `song_id` cascades on song deletion so a song and its postings
//! disappear together.

use earmark_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::info;

/// Create catalog tables and indexes if they do not exist.
pub async fn initialize_catalog(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            album TEXT,
            duration REAL NOT NULL,
            path TEXT NOT NULL,
            metadata TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fingerprints (
            hash TEXT NOT NULL,
            song_id INTEGER NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
            anchor_time INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_fingerprints_hash ON fingerprints(hash)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_fingerprints_song ON fingerprints(song_id)")
        .execute(pool)
        .await?;

    info!("catalog schema initialized");
    Ok(())
}
