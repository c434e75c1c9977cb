//! Inverted fingerprint index queries
//!
//! Posting inserts and hash lookups are always batched: a song ingests tens
//! of thousands of postings, and a query carries thousands of hashes.
//! SQLite caps bind parameters per statement, so both directions chunk well
//! below that limit.

use earmark_common::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::{HashMap, HashSet};

use super::models::Posting;
use crate::fingerprint::{Fingerprint, FingerprintHash};

/// Rows per multi-row INSERT (3 binds each, far under SQLite's 999 cap).
const INSERT_BATCH: usize = 300;

/// Hashes per IN (...) lookup query.
const LOOKUP_BATCH: usize = 500;

/// Insert a song's full posting batch inside an open transaction.
pub async fn insert_postings(
    conn: &mut SqliteConnection,
    song_id: i64,
    fingerprints: &[Fingerprint],
) -> Result<()> {
    for chunk in fingerprints.chunks(INSERT_BATCH) {
        let placeholders = (0..chunk.len())
            .map(|_| "(?, ?, ?)")
            .collect::<Vec<_>>()
            .join(", ");
        let query_str =
            format!("INSERT INTO fingerprints (hash, song_id, anchor_time) VALUES {placeholders}");

        let mut query = sqlx::query(&query_str);
        for fp in chunk {
            query = query
                .bind(fp.hash.to_hex())
                .bind(song_id)
                .bind(fp.anchor_time as i64);
        }
        query.execute(&mut *conn).await?;
    }

    Ok(())
}

/// Look up postings for a set of query hashes.
///
/// Returns only the hashes that exist in the index, each with every
/// `(song_id, anchor_time)` occurrence. Duplicate input hashes collapse to
/// one lookup.
pub async fn lookup_postings(
    pool: &SqlitePool,
    hashes: &[FingerprintHash],
) -> Result<HashMap<FingerprintHash, Vec<Posting>>> {
    let distinct: Vec<FingerprintHash> = {
        let mut seen = HashSet::new();
        hashes.iter().copied().filter(|h| seen.insert(*h)).collect()
    };

    let mut map: HashMap<FingerprintHash, Vec<Posting>> = HashMap::new();

    for chunk in distinct.chunks(LOOKUP_BATCH) {
        let placeholders = (0..chunk.len()).map(|_| "?").collect::<Vec<_>>().join(", ");
        let query_str = format!(
            "SELECT hash, song_id, anchor_time FROM fingerprints WHERE hash IN ({placeholders})"
        );

        let mut query = sqlx::query(&query_str);
        for hash in chunk {
            query = query.bind(hash.to_hex());
        }

        for row in query.fetch_all(pool).await? {
            let hex: String = row.get("hash");
            // rows come straight out of the index; the hex form is ours
            let Some(hash) = FingerprintHash::from_hex(&hex) else {
                continue;
            };
            map.entry(hash).or_default().push(Posting {
                song_id: row.get("song_id"),
                anchor_time: row.get::<i64, _>("anchor_time") as u32,
            });
        }
    }

    Ok(map)
}

/// Number of postings currently indexed.
pub async fn count_postings(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM fingerprints")
        .fetch_one(pool)
        .await?)
}

/// Number of postings indexed for one song.
pub async fn count_postings_for_song(pool: &SqlitePool, song_id: i64) -> Result<i64> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM fingerprints WHERE song_id = ?")
            .bind(song_id)
            .fetch_one(pool)
            .await?,
    )
}
