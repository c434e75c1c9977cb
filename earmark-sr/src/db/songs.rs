//! Song row queries

use earmark_common::{Error, Result};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::models::{NewSong, Song};

fn song_from_row(row: &SqliteRow) -> Result<Song> {
    let metadata: Option<String> = row.get("metadata");
    let metadata = match metadata {
        Some(text) => Some(
            serde_json::from_str::<Value>(&text)
                .map_err(|e| Error::InvalidInput(format!("corrupt metadata blob: {e}")))?,
        ),
        None => None,
    };

    Ok(Song {
        id: row.get("id"),
        title: row.get("title"),
        artist: row.get("artist"),
        album: row.get("album"),
        duration: row.get("duration"),
        path: row.get("path"),
        metadata,
        created_at: row.get("created_at"),
    })
}

/// Insert a song row inside an open transaction; returns the fresh id.
pub async fn insert_song(conn: &mut SqliteConnection, song: &NewSong) -> Result<i64> {
    let metadata = song
        .metadata
        .as_ref()
        .map(|v| serde_json::to_string(v))
        .transpose()
        .map_err(|e| Error::InvalidInput(format!("unserializable metadata blob: {e}")))?;

    let result = sqlx::query(
        "INSERT INTO songs (title, artist, album, duration, path, metadata)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&song.title)
    .bind(&song.artist)
    .bind(&song.album)
    .bind(song.duration)
    .bind(&song.path)
    .bind(metadata)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Delete a song row; postings follow via cascade. Errors when the id does
/// not exist.
pub async fn delete_song(conn: &mut SqliteConnection, song_id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM songs WHERE id = ?")
        .bind(song_id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("song {song_id}")));
    }
    Ok(())
}

pub async fn get_song(pool: &SqlitePool, song_id: i64) -> Result<Option<Song>> {
    let row = sqlx::query("SELECT * FROM songs WHERE id = ?")
        .bind(song_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(song_from_row).transpose()
}

pub async fn list_songs(pool: &SqlitePool) -> Result<Vec<Song>> {
    let rows = sqlx::query("SELECT * FROM songs ORDER BY id")
        .fetch_all(pool)
        .await?;

    rows.iter().map(song_from_row).collect()
}

/// Replace a song's opaque metadata blob.
pub async fn update_metadata(pool: &SqlitePool, song_id: i64, metadata: &Value) -> Result<()> {
    let text = serde_json::to_string(metadata)
        .map_err(|e| Error::InvalidInput(format!("unserializable metadata blob: {e}")))?;

    let result = sqlx::query("UPDATE songs SET metadata = ? WHERE id = ?")
        .bind(text)
        .bind(song_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("song {song_id}")));
    }
    Ok(())
}
