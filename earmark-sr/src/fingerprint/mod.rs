//! Audio fingerprinting pipeline
//!
//! Turns mono PCM at the canonical analysis rate into a set of
//! `(hash, anchor_time)` landmarks: STFT spectrogram → constellation peak
//! picking → combinatorial pair hashing.
//!
//! The pipeline is deterministic: fingerprinting the same buffer twice
//! yields the same landmark multiset, and ingest and query always run the
//! exact same path.

mod framer;
mod hashes;
mod peaks;
mod spectrogram;

pub use framer::Framer;
pub use hashes::{create_hashes, Fingerprint, FingerprintHash};
pub use peaks::{find_peaks, Peak};
pub use spectrogram::compute_spectrogram;

use earmark_common::params::AnalysisParams;

/// End-to-end fingerprinter over a fixed parameter set
#[derive(Debug, Clone, Copy)]
pub struct Fingerprinter {
    params: AnalysisParams,
}

impl Fingerprinter {
    pub fn new(params: AnalysisParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    /// Extract the constellation (time/frequency peaks) from PCM
    ///
    /// Empty or too-quiet input yields an empty peak list, never an error.
    pub fn peaks(&self, samples: &[f32]) -> Vec<Peak> {
        let spec = compute_spectrogram(samples, &self.params);
        find_peaks(&spec, &self.params)
    }

    /// Fingerprint PCM into `(hash, anchor_time)` landmarks
    pub fn fingerprint(&self, samples: &[f32]) -> Vec<Fingerprint> {
        create_hashes(&self.peaks(samples), &self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::f32::consts::PI;

    fn fp() -> Fingerprinter {
        Fingerprinter::new(AnalysisParams::default())
    }

    /// Two sines plus a changing tone: dense enough to produce landmarks
    fn test_signal(secs: f32) -> Vec<f32> {
        let rate = 22_050;
        let n = (secs * rate as f32) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / rate as f32;
                // step the third tone every half second
                let step = (t * 2.0) as u32 % 5;
                let f3 = 700.0 + 350.0 * step as f32;
                0.3 * (2.0 * PI * 440.0 * t).sin()
                    + 0.2 * (2.0 * PI * 1320.0 * t).sin()
                    + 0.25 * (2.0 * PI * f3 * t).sin()
            })
            .collect()
    }

    fn multiset(fps: &[Fingerprint]) -> HashMap<(FingerprintHash, u32), usize> {
        let mut m = HashMap::new();
        for f in fps {
            *m.entry((f.hash, f.anchor_time)).or_insert(0) += 1;
        }
        m
    }

    #[test]
    fn fingerprinting_is_deterministic() {
        let samples = test_signal(4.0);
        let a = fp().fingerprint(&samples);
        let b = fp().fingerprint(&samples);
        assert!(!a.is_empty());
        assert_eq!(multiset(&a), multiset(&b));
    }

    #[test]
    fn silence_yields_no_landmarks() {
        let silence = vec![0.0f32; 22_050 * 3];
        assert!(fp().peaks(&silence).is_empty());
        assert!(fp().fingerprint(&silence).is_empty());
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(fp().fingerprint(&[]).is_empty());
    }

    #[test]
    fn dc_offset_does_not_change_hashes() {
        let samples = test_signal(3.0);
        let shifted: Vec<f32> = samples.iter().map(|s| s + 0.25).collect();
        assert_eq!(multiset(&fp().fingerprint(&samples)), multiset(&fp().fingerprint(&shifted)));
    }
}
