//! Overlapping analysis windows over a growing sample buffer
//!
//! Yields full windows of `window_size` samples every `hop_size` samples.
//! While samples are still arriving, only full windows come out; `finish()`
//! flushes whatever tail remains, shorter than a full window, exactly once.

/// Buffers samples and yields consecutive overlapping windows.
pub struct Framer {
    window_size: usize,
    hop_size: usize,
    buf: Vec<f32>,
    /// Start of the next window within `buf`
    pos: usize,
}

impl Framer {
    pub fn new(window_size: usize, hop_size: usize) -> Self {
        assert!(hop_size > 0 && hop_size <= window_size);
        Self {
            window_size,
            hop_size,
            buf: Vec::new(),
            pos: 0,
        }
    }

    /// Append samples to the buffer.
    pub fn push(&mut self, samples: &[f32]) {
        // drop the consumed prefix before growing so memory stays bounded
        if self.pos >= self.window_size * 4 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(samples);
    }

    /// Next full window, advancing by one hop. `None` until enough samples
    /// have been pushed.
    pub fn next_window(&mut self) -> Option<&[f32]> {
        if self.pos + self.window_size <= self.buf.len() {
            let start = self.pos;
            self.pos += self.hop_size;
            Some(&self.buf[start..start + self.window_size])
        } else {
            None
        }
    }

    /// Flush the pending tail, shorter than a full window.
    ///
    /// Returns `None` when no samples are pending. Callers pad the tail as
    /// needed; the framer never fabricates samples.
    pub fn finish(&mut self) -> Option<Vec<f32>> {
        if self.pos < self.buf.len() {
            let tail = self.buf[self.pos..].to_vec();
            self.pos = self.buf.len();
            Some(tail)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_windows(framer: &mut Framer) -> Vec<Vec<f32>> {
        let mut out = Vec::new();
        while let Some(w) = framer.next_window() {
            out.push(w.to_vec());
        }
        out
    }

    #[test]
    fn yields_full_windows_with_hop() {
        let mut framer = Framer::new(4, 2);
        framer.push(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let windows = collect_windows(&mut framer);
        assert_eq!(
            windows,
            vec![
                vec![0.0, 1.0, 2.0, 3.0],
                vec![2.0, 3.0, 4.0, 5.0],
                vec![4.0, 5.0, 6.0, 7.0],
            ]
        );
    }

    #[test]
    fn no_partial_window_while_streaming() {
        let mut framer = Framer::new(4, 2);
        framer.push(&[0.0, 1.0, 2.0]);
        assert!(framer.next_window().is_none());
        framer.push(&[3.0]);
        assert_eq!(collect_windows(&mut framer).len(), 1);
    }

    #[test]
    fn finish_flushes_tail_once() {
        let mut framer = Framer::new(4, 2);
        framer.push(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let _ = collect_windows(&mut framer);
        assert_eq!(framer.finish(), Some(vec![2.0, 3.0, 4.0]));
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn windows_survive_compaction() {
        let mut framer = Framer::new(4, 4);
        let mut seen = Vec::new();
        for chunk in 0..64 {
            let base = chunk as f32 * 4.0;
            framer.push(&[base, base + 1.0, base + 2.0, base + 3.0]);
            while let Some(w) = framer.next_window() {
                seen.push(w[0]);
            }
        }
        let expected: Vec<f32> = (0..64).map(|c| c as f32 * 4.0).collect();
        assert_eq!(seen, expected);
    }
}
