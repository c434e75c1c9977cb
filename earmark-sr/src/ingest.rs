//! Song ingestion: file → PCM → landmarks → catalog
//!
//! Decoding, resampling, and fingerprinting are CPU-bound and run on the
//! blocking pool; the catalog write is one atomic transaction, so a song is
//! either fully indexed or not indexed at all.

use earmark_common::params::AnalysisParams;
use earmark_common::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;
use tracing::info;

use crate::audio::{decode_file, resample};
use crate::db::{CatalogStore, NewSong, Song};
use crate::fingerprint::Fingerprinter;

/// User-supplied metadata for a song being added.
#[derive(Debug, Clone, Deserialize)]
pub struct SongMeta {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    /// Opaque enrichment blob stored verbatim
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Ingestion pipeline bound to a catalog.
pub struct IngestService {
    catalog: Arc<CatalogStore>,
    fingerprinter: Fingerprinter,
}

impl IngestService {
    pub fn new(catalog: Arc<CatalogStore>, params: AnalysisParams) -> Self {
        Self {
            catalog,
            fingerprinter: Fingerprinter::new(params),
        }
    }

    /// Decode and index an audio file.
    pub async fn ingest_file(&self, path: &Path, meta: SongMeta) -> Result<Song> {
        let owned: PathBuf = path.to_path_buf();
        let decoded = task::spawn_blocking(move || decode_file(&owned))
            .await
            .map_err(|e| Error::Internal(format!("decode task failed: {e}")))??;

        self.ingest_samples(decoded.samples, decoded.sample_rate, meta, path.display().to_string())
            .await
    }

    /// Index already-decoded mono PCM.
    ///
    /// Audio that yields zero landmarks (silence, sub-floor noise) is
    /// rejected; a song with no postings could never be matched.
    pub async fn ingest_samples(
        &self,
        samples: Vec<f32>,
        sample_rate: u32,
        meta: SongMeta,
        path: String,
    ) -> Result<Song> {
        let duration = samples.len() as f64 / sample_rate as f64;

        let fingerprinter = self.fingerprinter;
        let target_rate = fingerprinter.params().sample_rate;
        let landmarks = task::spawn_blocking(move || -> Result<_> {
            let canonical = resample(&samples, sample_rate, target_rate)?;
            Ok(fingerprinter.fingerprint(&canonical))
        })
        .await
        .map_err(|e| Error::Internal(format!("fingerprint task failed: {e}")))??;

        if landmarks.is_empty() {
            return Err(Error::EmptyFingerprint);
        }

        let new_song = NewSong {
            title: meta.title,
            artist: meta.artist,
            album: meta.album,
            duration,
            path,
            metadata: meta.metadata,
        };

        let song_id = self.catalog.add_song(&new_song, &landmarks).await?;
        info!(song_id, duration, landmarks = landmarks.len(), "ingested song");

        self.catalog
            .get_song(song_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("song {song_id} vanished after insert")))
    }
}
