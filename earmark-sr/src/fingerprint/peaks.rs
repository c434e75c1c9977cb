//! Constellation peak picking
//!
//! A spectral cell is a peak when it sits at or above the dB floor and is
//! the strict maximum of its neighborhood (an even-sized window extends one
//! cell less on the trailing side). Equal-valued cells resolve to the one
//! earliest in scan order: an equal neighbor that precedes the candidate
//! disqualifies it, a later one does not.
//!
//! The neighborhood maximum is computed with a separable monotonic-deque
//! sliding maximum, rows then columns, so the pass stays linear in the
//! spectrogram size; candidates that survive the filter get an exact
//! neighborhood check for the tie rule.

use earmark_common::params::AnalysisParams;
use std::collections::VecDeque;

/// One constellation point: time bin and frequency bin of a spectral peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Peak {
    /// Frame index within the analyzed buffer
    pub time: u32,
    /// DFT bin index
    pub freq: u32,
}

/// Sliding maximum over `values` with window `[i - left, i + right]`,
/// clipped at the array edges. Reflection padding collapses to exactly this
/// clipped window because the reflected cells are already inside it.
fn sliding_max(values: &[f32], left: usize, right: usize, out: &mut Vec<f32>) {
    out.clear();
    let n = values.len();
    let mut deque: VecDeque<usize> = VecDeque::new();
    let mut next = 0usize;

    for i in 0..n {
        let hi = (i + right).min(n - 1);
        while next <= hi {
            while deque.back().is_some_and(|&b| values[b] <= values[next]) {
                deque.pop_back();
            }
            deque.push_back(next);
            next += 1;
        }
        while deque.front().is_some_and(|&f| f + left < i) {
            deque.pop_front();
        }
        out.push(values[deque[0]]);
    }
}

/// Exact check for the scan-order tie rule: reject the candidate when any
/// neighbor is greater, or equal but earlier in `(t, f)` scan order.
fn survives_tie_check(
    spec: &[Vec<f32>],
    t: usize,
    f: usize,
    t_range: (usize, usize),
    f_range: (usize, usize),
) -> bool {
    let value = spec[t][f];
    for nt in t_range.0..=t_range.1 {
        for nf in f_range.0..=f_range.1 {
            if nt == t && nf == f {
                continue;
            }
            let v = spec[nt][nf];
            if v > value || (v == value && (nt < t || (nt == t && nf < f))) {
                return false;
            }
        }
    }
    true
}

/// Pick constellation peaks from a dB spectrogram.
///
/// Output is sorted by time bin, then frequency bin. Empty spectrograms
/// yield an empty list.
pub fn find_peaks(spec: &[Vec<f32>], params: &AnalysisParams) -> Vec<Peak> {
    if spec.is_empty() || spec[0].is_empty() {
        return Vec::new();
    }

    let num_frames = spec.len();
    let num_bins = spec[0].len();

    // even-sized window: extends n/2 back, n/2 - 1 forward
    let t_back = params.neighborhood_frames / 2;
    let t_fwd = params.neighborhood_frames - t_back - 1;
    let f_back = params.neighborhood_bins / 2;
    let f_fwd = params.neighborhood_bins - f_back - 1;

    // pass 1: maximum along the frequency axis of each frame
    let mut row_max: Vec<Vec<f32>> = Vec::with_capacity(num_frames);
    let mut scratch = Vec::with_capacity(num_bins);
    for column in spec {
        sliding_max(column, f_back, f_fwd, &mut scratch);
        row_max.push(scratch.clone());
    }

    // pass 2: maximum along the time axis of the row maxima
    let mut peaks = Vec::new();
    let mut time_slice = vec![0.0f32; num_frames];
    let mut neighborhood_max = vec![vec![0.0f32; num_bins]; num_frames];
    for f in 0..num_bins {
        for t in 0..num_frames {
            time_slice[t] = row_max[t][f];
        }
        sliding_max(&time_slice, t_back, t_fwd, &mut scratch);
        for t in 0..num_frames {
            neighborhood_max[t][f] = scratch[t];
        }
    }

    for t in 0..num_frames {
        for f in 0..num_bins {
            let value = spec[t][f];
            if value < params.floor_db || value < neighborhood_max[t][f] {
                continue;
            }
            let t_range = (t.saturating_sub(t_back), (t + t_fwd).min(num_frames - 1));
            let f_range = (f.saturating_sub(f_back), (f + f_fwd).min(num_bins - 1));
            if survives_tie_check(spec, t, f, t_range, f_range) {
                peaks.push(Peak {
                    time: t as u32,
                    freq: f as u32,
                });
            }
        }
    }

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> AnalysisParams {
        AnalysisParams::default()
    }

    /// A quiet background with a handful of louder cells planted in it.
    fn grid(frames: usize, bins: usize, spikes: &[(usize, usize, f32)]) -> Vec<Vec<f32>> {
        let mut spec = vec![vec![-80.0f32; bins]; frames];
        for &(t, f, v) in spikes {
            spec[t][f] = v;
        }
        spec
    }

    #[test]
    fn isolated_spike_is_a_peak() {
        let spec = grid(60, 60, &[(30, 30, -10.0)]);
        assert_eq!(find_peaks(&spec, &params()), vec![Peak { time: 30, freq: 30 }]);
    }

    #[test]
    fn below_floor_is_never_a_peak() {
        let spec = grid(60, 60, &[(30, 30, -70.0)]);
        assert!(find_peaks(&spec, &params()).is_empty());
    }

    #[test]
    fn weaker_neighbor_is_suppressed() {
        // 5 frames apart: inside the 20-frame neighborhood
        let spec = grid(60, 60, &[(30, 30, -10.0), (35, 30, -20.0)]);
        assert_eq!(find_peaks(&spec, &params()), vec![Peak { time: 30, freq: 30 }]);
    }

    #[test]
    fn distant_spikes_both_survive() {
        let spec = grid(80, 80, &[(20, 20, -10.0), (60, 60, -10.0)]);
        assert_eq!(
            find_peaks(&spec, &params()),
            vec![Peak { time: 20, freq: 20 }, Peak { time: 60, freq: 60 }]
        );
    }

    #[test]
    fn equal_tie_keeps_the_earliest() {
        let spec = grid(60, 60, &[(28, 30, -10.0), (31, 30, -10.0)]);
        assert_eq!(find_peaks(&spec, &params()), vec![Peak { time: 28, freq: 30 }]);
    }

    #[test]
    fn edge_peaks_are_permitted() {
        let spec = grid(40, 40, &[(0, 0, -10.0), (39, 39, -12.0)]);
        assert_eq!(
            find_peaks(&spec, &params()),
            vec![Peak { time: 0, freq: 0 }, Peak { time: 39, freq: 39 }]
        );
    }

    #[test]
    fn asymmetric_window_reach() {
        // 10 frames behind is inside the window, 10 ahead is outside
        let behind = grid(60, 60, &[(20, 30, -5.0), (30, 30, -10.0)]);
        assert_eq!(find_peaks(&behind, &params()), vec![Peak { time: 20, freq: 30 }]);

        let ahead = grid(60, 60, &[(30, 30, -10.0), (40, 30, -5.0)]);
        assert_eq!(
            find_peaks(&ahead, &params()),
            vec![Peak { time: 30, freq: 30 }, Peak { time: 40, freq: 30 }]
        );
    }

    #[test]
    fn empty_spectrogram() {
        assert!(find_peaks(&[], &params()).is_empty());
    }
}
