//! STFT magnitude spectrogram in dB
//!
//! Hann-windowed real-input FFT per frame; keeps bins `0..=window/2` and
//! converts density-scaled magnitudes to dB. The density scaling
//! (`sqrt(2 / (fs · Σw²))`, the one-sided PSD normalization) is uniform, so
//! it never changes which cells are local maxima — it anchors the dB axis
//! so the peak picker's absolute floor separates tonal content from
//! broadband noise. Each window also has its mean removed before
//! windowing, so a constant DC offset on the input never shifts the
//! constellation.

use earmark_common::params::AnalysisParams;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;

use super::Framer;

/// Magnitude floor inside the dB conversion; keeps log10 finite on silence.
const DB_EPSILON: f32 = 1e-10;

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}

/// Compute the dB spectrogram of a mono buffer at the analysis rate.
///
/// Returns one column per frame, `window/2 + 1` bins per column, indexed
/// `[frame][bin]`. Fewer samples than one hop of tail still produce a final
/// (zero-padded) column, so short buffers are never silently dropped.
pub fn compute_spectrogram(samples: &[f32], params: &AnalysisParams) -> Vec<Vec<f32>> {
    if samples.is_empty() {
        return Vec::new();
    }

    let window_size = params.window_size;
    let num_bins = params.freq_bins();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(window_size);
    let window_values = hann_window(window_size);

    let window_power: f32 = window_values.iter().map(|w| w * w).sum();
    let density_scale = (2.0 / (params.sample_rate as f32 * window_power)).sqrt();

    let mut framer = Framer::new(window_size, params.hop_size);
    framer.push(samples);

    let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); window_size];
    let mut spectrogram = Vec::new();

    let process_frame = |frame: &[f32], buffer: &mut Vec<Complex<f32>>, out: &mut Vec<Vec<f32>>| {
        // remove the per-window mean so DC never leaks into low bins
        let mean = frame.iter().sum::<f32>() / frame.len() as f32;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = frame.get(i).copied().unwrap_or(mean);
            *slot = Complex::new((sample - mean) * window_values[i], 0.0);
        }
        fft.process(buffer);

        let mut column = Vec::with_capacity(num_bins);
        for bin in buffer.iter().take(num_bins) {
            let magnitude = (bin.norm() * density_scale).max(DB_EPSILON);
            column.push(20.0 * magnitude.log10());
        }
        out.push(column);
    };

    while let Some(frame) = framer.next_window() {
        process_frame(frame, &mut buffer, &mut spectrogram);
    }
    if let Some(tail) = framer.finish() {
        process_frame(&tail, &mut buffer, &mut spectrogram);
    }

    spectrogram
}
