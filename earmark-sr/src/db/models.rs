//! Catalog row types

use chrono::NaiveDateTime;
use earmark_common::messages::SongInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A catalog entry. Immutable after insert except for the metadata blob
/// and deletion.
#[derive(Debug, Clone, Serialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Duration in seconds
    pub duration: f64,
    /// Source audio file path
    pub path: String,
    /// Opaque enrichment blob (artwork URL, external links, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub created_at: NaiveDateTime,
}

impl Song {
    /// Wire identity for match responses.
    pub fn info(&self) -> SongInfo {
        SongInfo {
            id: self.id,
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            duration: self.duration,
        }
    }
}

/// Metadata for a song about to be inserted.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    pub duration: f64,
    pub path: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// One inverted-index entry under a hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub song_id: i64,
    /// Time bin of the anchor peak within the song
    pub anchor_time: u32,
}

/// Catalog size counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub songs: i64,
    pub fingerprints: i64,
}
