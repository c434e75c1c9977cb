//! Live and one-shot recognition
//!
//! [`RecognitionEngine`] runs one analysis attempt (fingerprint → lookup →
//! score) with the CPU-bound stages on the blocking pool. [`session`] drives
//! the engine incrementally over a live sample stream; the engine alone
//! serves one-shot file queries.

pub mod session;
mod window;

pub use session::{run_session, SessionInput};
pub use window::SampleWindow;

use earmark_common::messages::ServerMessage;
use earmark_common::params::{AnalysisParams, MatcherParams};
use earmark_common::{Error, Result};
use std::sync::Arc;
use tokio::task;

use crate::db::{CatalogStore, Song};
use crate::fingerprint::Fingerprinter;
use crate::matcher::{MatchScore, Matcher};

/// Result of one analysis attempt over a sample buffer.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// A catalog song cleared every acceptance threshold.
    Match { song: Song, score: MatchScore },

    /// No acceptable candidate. `empty_query` distinguishes "the audio had
    /// no usable peaks" from "peaks existed but nothing aligned".
    NoAlignment { empty_query: bool },
}

impl AttemptOutcome {
    /// Terminal protocol message for a one-shot (non-streaming) query.
    pub fn into_terminal_message(self, frame_duration: f64) -> ServerMessage {
        match self {
            AttemptOutcome::Match { song, score } => ServerMessage::MatchFound {
                analysis: song.metadata.clone(),
                song: song.info(),
                confidence: score.confidence,
                score_ratio: score.score_ratio,
                offset_seconds: score.offset_delta as f64 * frame_duration,
            },
            AttemptOutcome::NoAlignment { empty_query: true } => ServerMessage::NoMatch {
                message: "no spectral peaks found in the audio (is it silence?)".into(),
            },
            AttemptOutcome::NoAlignment { empty_query: false } => ServerMessage::NoMatch {
                message: "no confident match in the catalog".into(),
            },
        }
    }
}

/// Shared recognition pipeline: fingerprinter + catalog + thresholds.
pub struct RecognitionEngine {
    catalog: Arc<CatalogStore>,
    fingerprinter: Fingerprinter,
    matcher_params: MatcherParams,
}

impl RecognitionEngine {
    pub fn new(
        catalog: Arc<CatalogStore>,
        analysis_params: AnalysisParams,
        matcher_params: MatcherParams,
    ) -> Self {
        Self {
            catalog,
            fingerprinter: Fingerprinter::new(analysis_params),
            matcher_params,
        }
    }

    pub fn analysis_params(&self) -> &AnalysisParams {
        self.fingerprinter.params()
    }

    /// Run one analysis attempt over mono PCM at the canonical rate.
    ///
    /// Never errors on empty or silent input; those come back as
    /// `NoAlignment { empty_query: true }`.
    pub async fn analyze(&self, samples: Vec<f32>) -> Result<AttemptOutcome> {
        let fingerprinter = self.fingerprinter;
        let landmarks = task::spawn_blocking(move || fingerprinter.fingerprint(&samples))
            .await
            .map_err(|e| Error::Internal(format!("fingerprint task failed: {e}")))?;

        if landmarks.is_empty() {
            return Ok(AttemptOutcome::NoAlignment { empty_query: true });
        }

        let matcher = Matcher::new(Arc::clone(&self.catalog), self.matcher_params);
        match matcher.match_fingerprints(&landmarks).await? {
            Some(score) if score.accepted => {
                // the song can vanish between scoring and this read; a
                // deleted song must never be reported as a match
                match self.catalog.get_song(score.song_id).await? {
                    Some(song) => Ok(AttemptOutcome::Match { song, score }),
                    None => Ok(AttemptOutcome::NoAlignment { empty_query: false }),
                }
            }
            _ => Ok(AttemptOutcome::NoAlignment { empty_query: false }),
        }
    }
}
