//! Sample rate conversion using rubato
//!
//! Two shapes, matching the two call sites:
//! - [`resample`] converts a whole buffer in one pass with a high-quality
//!   sinc filter (used at ingest and for file queries).
//! - [`StreamResampler`] keeps filter state across arbitrarily sized live
//!   chunks, feeding fixed-size blocks through a fast polynomial resampler
//!   so streaming sessions never pay sinc-filter latency per chunk.

use earmark_common::{Error, Result};
use rubato::{
    FastFixedIn, PolynomialDegree, Resampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};
use tracing::debug;

/// Fixed block size fed to the streaming resampler, in frames.
const STREAM_CHUNK: usize = 1024;

/// Collapse interleaved PCM to mono by averaging channels.
///
/// Mono input is returned as-is; a trailing incomplete frame is dropped.
pub fn to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Resample a whole mono buffer from `from_rate` to `to_rate`.
///
/// Band-limited sinc interpolation (256 taps, BlackmanHarris2, cutoff 0.95)
/// preserves content below the target Nyquist. Same-rate input is copied
/// through; empty input stays empty.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    debug!(from_rate, to_rate, frames = samples.len(), "resampling buffer");

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        to_rate as f64 / from_rate as f64,
        2.0,
        params,
        samples.len(),
        1,
    )
    .map_err(|e| Error::Resample(format!("failed to create resampler: {e}")))?;

    let waves_in = vec![samples.to_vec()];
    let mut waves_out = resampler
        .process(&waves_in, None)
        .map_err(|e| Error::Resample(e.to_string()))?;

    Ok(waves_out.swap_remove(0))
}

/// Stateful mono resampler for live sample streams.
///
/// rubato's fixed-input resamplers want equal-sized blocks, so incoming
/// chunks accumulate in a pending buffer and drain in `STREAM_CHUNK`-frame
/// blocks; filter state carries across blocks, avoiding phase seams.
pub enum StreamResampler {
    /// Input already at the target rate
    PassThrough,

    /// Active conversion with retained filter state
    Active {
        resampler: FastFixedIn<f32>,
        pending: Vec<f32>,
    },
}

impl StreamResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        if input_rate == 0 {
            return Err(Error::Resample("input sample rate of 0".into()));
        }
        if input_rate == output_rate {
            debug!(input_rate, "stream resampler in pass-through mode");
            return Ok(Self::PassThrough);
        }

        debug!(input_rate, output_rate, "creating stream resampler");
        let resampler = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            PolynomialDegree::Septic,
            STREAM_CHUNK,
            1,
        )
        .map_err(|e| Error::Resample(format!("failed to create stream resampler: {e}")))?;

        Ok(Self::Active {
            resampler,
            pending: Vec::new(),
        })
    }

    /// Feed one chunk of mono samples, returning whatever full blocks are
    /// ready at the output rate. Tail samples shorter than a block stay
    /// buffered for the next call.
    pub fn process(&mut self, chunk: &[f32]) -> Result<Vec<f32>> {
        match self {
            Self::PassThrough => Ok(chunk.to_vec()),
            Self::Active { resampler, pending } => {
                pending.extend_from_slice(chunk);

                let mut out = Vec::new();
                while pending.len() >= STREAM_CHUNK {
                    let block: Vec<f32> = pending.drain(..STREAM_CHUNK).collect();
                    let mut produced = resampler
                        .process(&[block], None)
                        .map_err(|e| Error::Resample(e.to_string()))?;
                    out.append(&mut produced[0]);
                }
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, secs: f32, rate: u32) -> Vec<f32> {
        let n = (secs * rate as f32) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn mono_collapse_averages_channels() {
        let stereo = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(to_mono(&stereo, 2), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn mono_passes_through() {
        let mono = vec![0.1, 0.2, 0.3];
        assert_eq!(to_mono(&mono, 1), mono);
    }

    #[test]
    fn same_rate_is_identity() {
        let samples = sine(440.0, 0.1, 22_050);
        assert_eq!(resample(&samples, 22_050, 22_050).unwrap(), samples);
    }

    #[test]
    fn downsample_ratio_is_respected() {
        let samples = sine(440.0, 1.0, 44_100);
        let out = resample(&samples, 44_100, 22_050).unwrap();
        let expected = samples.len() / 2;
        let tolerance = expected / 100 + 16;
        assert!(
            out.len().abs_diff(expected) <= tolerance,
            "expected ~{expected} samples, got {}",
            out.len()
        );
    }

    #[test]
    fn upsample_from_low_rates() {
        let samples = sine(440.0, 0.5, 8_000);
        let out = resample(&samples, 8_000, 22_050).unwrap();
        let expected = (samples.len() as f64 * 22_050.0 / 8_000.0) as usize;
        assert!(out.len().abs_diff(expected) <= expected / 100 + 16);
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(resample(&[], 44_100, 22_050).unwrap().is_empty());
    }

    #[test]
    fn stream_pass_through_copies() {
        let mut rs = StreamResampler::new(22_050, 22_050).unwrap();
        let chunk = vec![0.5f32; 100];
        assert_eq!(rs.process(&chunk).unwrap(), chunk);
    }

    #[test]
    fn stream_resampler_buffers_partial_blocks() {
        let mut rs = StreamResampler::new(44_100, 22_050).unwrap();
        // half a block: nothing comes out yet
        assert!(rs.process(&vec![0.1f32; 512]).unwrap().is_empty());
        // the second half completes the block
        let out = rs.process(&vec![0.1f32; 512]).unwrap();
        assert!(!out.is_empty());
    }

    #[test]
    fn stream_resampler_converges_on_the_ratio() {
        let mut rs = StreamResampler::new(48_000, 22_050).unwrap();
        let input = sine(440.0, 2.0, 48_000);
        let mut total = 0usize;
        for chunk in input.chunks(1000) {
            total += rs.process(chunk).unwrap().len();
        }
        let expected = (input.len() as f64 * 22_050.0 / 48_000.0) as usize;
        // tail shorter than one block stays pending
        assert!(total <= expected);
        assert!(total >= expected - 2048, "expected ~{expected}, got {total}");
    }

    #[test]
    fn zero_rate_is_rejected() {
        assert!(StreamResampler::new(0, 22_050).is_err());
    }
}
