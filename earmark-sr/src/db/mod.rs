//! Catalog store: song metadata plus the inverted fingerprint index
//!
//! One SQLite database holds both tables. Reads go straight to the pool and
//! run concurrently; writes (ingest, delete) serialize behind an async
//! mutex and commit in a single transaction, so a song is either fully
//! indexed or absent, and no reader ever observes postings of a deleted
//! song.

pub mod init;
pub mod models;
mod postings;
mod songs;

pub use init::initialize_catalog;
pub use models::{CatalogStats, NewSong, Posting, Song};

use earmark_common::Result;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::info;

use crate::fingerprint::{Fingerprint, FingerprintHash};

/// Handle to the persistent catalog. Cheap to share behind an `Arc`.
pub struct CatalogStore {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl CatalogStore {
    /// Open (creating if missing) a catalog database file.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        initialize_catalog(&pool).await?;
        info!(path = %path.display(), "catalog opened");

        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    /// Open an in-memory catalog (tests, scratch runs).
    ///
    /// A single pooled connection keeps every caller on the same in-memory
    /// database.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        initialize_catalog(&pool).await?;

        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Persist a song and its full posting batch in one atomic unit.
    ///
    /// On any failure nothing is persisted.
    pub async fn add_song(&self, song: &NewSong, fingerprints: &[Fingerprint]) -> Result<i64> {
        let _guard = self.write_lock.lock().await;

        let mut tx = self.pool.begin().await?;
        let song_id = songs::insert_song(&mut *tx, song).await?;
        postings::insert_postings(&mut *tx, song_id, fingerprints).await?;
        tx.commit().await?;

        info!(
            song_id,
            title = %song.title,
            postings = fingerprints.len(),
            "song added to catalog"
        );
        Ok(song_id)
    }

    /// Remove a song and all of its postings atomically.
    pub async fn delete_song(&self, song_id: i64) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut tx = self.pool.begin().await?;
        songs::delete_song(&mut *tx, song_id).await?;
        tx.commit().await?;

        info!(song_id, "song deleted from catalog");
        Ok(())
    }

    pub async fn get_song(&self, song_id: i64) -> Result<Option<Song>> {
        songs::get_song(&self.pool, song_id).await
    }

    pub async fn list_songs(&self) -> Result<Vec<Song>> {
        songs::list_songs(&self.pool).await
    }

    /// Replace a song's opaque metadata blob (the one post-insert mutation
    /// songs allow).
    pub async fn update_metadata(&self, song_id: i64, metadata: &Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        songs::update_metadata(&self.pool, song_id, metadata).await
    }

    /// Batched hash lookup for the matcher; see [`postings::lookup_postings`].
    pub async fn lookup(
        &self,
        hashes: &[FingerprintHash],
    ) -> Result<HashMap<FingerprintHash, Vec<Posting>>> {
        postings::lookup_postings(&self.pool, hashes).await
    }

    pub async fn stats(&self) -> Result<CatalogStats> {
        let songs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
            .fetch_one(&self.pool)
            .await?;
        let fingerprints = postings::count_postings(&self.pool).await?;
        Ok(CatalogStats { songs, fingerprints })
    }

    /// Posting count for one song (deletion-accounting checks).
    pub async fn posting_count_for_song(&self, song_id: i64) -> Result<i64> {
        postings::count_postings_for_song(&self.pool, song_id).await
    }
}
