//! Deterministic synthetic audio for recognition tests
//!
//! Everything is seeded or closed-form so test runs are reproducible.
#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::path::Path;

/// Canonical analysis rate used across the tests.
pub const RATE: u32 = 22_050;

/// Linear sine sweep from `f0` to `f1` Hz over `secs`.
pub fn sine_sweep(secs: f64, f0: f64, f1: f64, amplitude: f32) -> Vec<f32> {
    let n = (secs * RATE as f64) as usize;
    let rate = RATE as f64;
    let sweep_rate = (f1 - f0) / secs;
    (0..n)
        .map(|i| {
            let t = i as f64 / rate;
            let phase = 2.0 * PI * (f0 * t + 0.5 * sweep_rate * t * t);
            amplitude * phase.sin() as f32
        })
        .collect()
}

/// A dense synthetic "song": three simultaneous tones re-picked from a
/// seeded RNG every quarter second. Produces a rich, arbitrary-offset-
/// friendly constellation.
pub fn stepped_tones(secs: f64, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = (secs * RATE as f64) as usize;
    let step_len = (RATE as usize) / 4;
    let steps = n / step_len + 1;

    let freqs: Vec<[f64; 3]> = (0..steps)
        .map(|_| {
            [
                rng.gen_range(100.0..1000.0),
                rng.gen_range(1000.0..3000.0),
                rng.gen_range(3000.0..8000.0),
            ]
        })
        .collect();

    (0..n)
        .map(|i| {
            let t = i as f64 / RATE as f64;
            let step = &freqs[i / step_len];
            let s = (2.0 * PI * step[0] * t).sin()
                + 0.7 * (2.0 * PI * step[1] * t).sin()
                + 0.4 * (2.0 * PI * step[2] * t).sin();
            (0.25 * s) as f32
        })
        .collect()
}

/// Seeded Gaussian noise (Box–Muller over uniform draws).
pub fn gaussian_noise(n: usize, sigma: f32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen_range(0.0..1.0);
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;
        out.push(sigma * (radius * theta.cos()) as f32);
        if out.len() < n {
            out.push(sigma * (radius * theta.sin()) as f32);
        }
    }
    out
}

/// Pink-ish noise via a bank of leaky integrators over white noise.
pub fn pink_noise(secs: f64, amplitude: f32, seed: u64) -> Vec<f32> {
    let n = (secs * RATE as f64) as usize;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = [0.0f32; 4];
    let leak = [0.997f32, 0.985, 0.95, 0.8];
    (0..n)
        .map(|_| {
            let white: f32 = rng.gen_range(-1.0..1.0);
            let mut sum = 0.0;
            for (s, l) in state.iter_mut().zip(leak) {
                *s = *s * l + white * (1.0 - l);
                sum += *s;
            }
            amplitude * (sum + 0.1 * white)
        })
        .collect()
}

/// Element-wise sum of a signal and seeded Gaussian noise.
pub fn add_noise(samples: &[f32], sigma: f32, seed: u64) -> Vec<f32> {
    let noise = gaussian_noise(samples.len(), sigma, seed);
    samples.iter().zip(noise).map(|(s, n)| s + n).collect()
}

/// Contiguous excerpt by time, in seconds.
pub fn excerpt(samples: &[f32], start_secs: f64, dur_secs: f64) -> Vec<f32> {
    let start = (start_secs * RATE as f64) as usize;
    let end = (start + (dur_secs * RATE as f64) as usize).min(samples.len());
    samples[start.min(samples.len())..end].to_vec()
}

/// Excerpt whose start is snapped to an analysis-hop boundary, so the
/// query's frames line up exactly with the indexed song's frames.
pub fn hop_aligned_excerpt(samples: &[f32], start_secs: f64, dur_secs: f64, hop: usize) -> Vec<f32> {
    let start = ((start_secs * RATE as f64) as usize / hop) * hop;
    let end = (start + (dur_secs * RATE as f64) as usize).min(samples.len());
    samples[start.min(samples.len())..end].to_vec()
}

/// Write mono f32 samples as a 16-bit WAV file.
pub fn write_wav(path: &Path, samples: &[f32], rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
}
