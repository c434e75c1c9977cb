//! Tunable parameters for fingerprinting, matching, and streaming sessions
//!
//! The analysis parameters are part of the on-disk contract: a catalog and a
//! recognizer disagreeing on any of them (or on the hash derivation) must be
//! treated as incompatible, so they are defined once here and passed into
//! every component rather than read from scattered constants.

use serde::{Deserialize, Serialize};

/// Fingerprint analysis parameters (spectrogram, peak picking, hashing)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Canonical analysis rate in Hz; all audio is resampled to this
    pub sample_rate: u32,

    /// STFT window length in samples
    pub window_size: usize,

    /// STFT hop in samples (50% overlap at the defaults)
    pub hop_size: usize,

    /// Spectral floor in dB; bins below this can never be peaks
    pub floor_db: f32,

    /// Peak neighborhood extent along the time axis, in frames
    pub neighborhood_frames: usize,

    /// Peak neighborhood extent along the frequency axis, in bins
    pub neighborhood_bins: usize,

    /// Minimum partner distance from the anchor, in frames
    pub min_dt: u32,

    /// Maximum partner distance from the anchor, in frames
    pub max_dt: u32,

    /// Maximum absolute frequency distance anchor↔partner, in bins
    pub max_df: u32,

    /// Maximum partners paired with a single anchor
    pub fan_out: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            window_size: 4096,
            hop_size: 2048,
            floor_db: -60.0,
            neighborhood_frames: 20,
            neighborhood_bins: 20,
            min_dt: 1,
            max_dt: 200,
            max_df: 200,
            fan_out: 15,
        }
    }
}

impl AnalysisParams {
    /// Number of frequency bins per spectrogram column (`window/2 + 1`)
    pub fn freq_bins(&self) -> usize {
        self.window_size / 2 + 1
    }

    /// Duration of one hop (one time bin) in seconds
    pub fn frame_duration(&self) -> f64 {
        self.hop_size as f64 / self.sample_rate as f64
    }
}

/// Match acceptance thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatcherParams {
    /// Minimum votes in the best offset bin
    pub min_aligned: u32,

    /// Minimum ratio of best song's peak over the runner-up's
    pub min_ratio: f64,

    /// Minimum confidence (aligned share of query hashes, 0–100)
    pub min_confidence: f64,
}

impl Default for MatcherParams {
    fn default() -> Self {
        Self {
            min_aligned: 5,
            min_ratio: 2.0,
            min_confidence: 10.0,
        }
    }
}

/// Streaming session pacing and limits, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    /// Audio required before the first analysis attempt
    pub min_query_secs: f64,

    /// Minimum spacing between analysis attempts
    pub attempt_every_secs: f64,

    /// Sliding-window capacity; older samples are dropped past this
    pub max_query_secs: f64,

    /// Progress message cadence
    pub tick_secs: f64,

    /// Session dies after this long without incoming samples
    pub idle_timeout_secs: f64,

    /// Wall-clock cap on a single analysis attempt
    pub attempt_timeout_secs: f64,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            min_query_secs: 3.0,
            attempt_every_secs: 2.0,
            max_query_secs: 12.0,
            tick_secs: 1.0,
            idle_timeout_secs: 10.0,
            attempt_timeout_secs: 5.0,
        }
    }
}
