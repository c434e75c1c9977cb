//! Sliding sample window for live recognition
//!
//! Holds the most recent stretch of canonical-rate audio. Growth past the
//! capacity drops the oldest samples, so late arrivals can never make a
//! query unbounded and recognition always works on the freshest audio.

use std::collections::VecDeque;

pub struct SampleWindow {
    samples: VecDeque<f32>,
    capacity: usize,
    sample_rate: u32,
}

impl SampleWindow {
    pub fn new(sample_rate: u32, max_secs: f64) -> Self {
        let capacity = (sample_rate as f64 * max_secs) as usize;
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sample_rate,
        }
    }

    /// Append samples, evicting the oldest past capacity.
    pub fn push(&mut self, chunk: &[f32]) {
        if chunk.len() >= self.capacity {
            // chunk alone fills the window
            self.samples.clear();
            self.samples
                .extend(chunk[chunk.len() - self.capacity..].iter().copied());
            return;
        }

        let overflow = (self.samples.len() + chunk.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.samples.drain(..overflow);
        }
        self.samples.extend(chunk.iter().copied());
    }

    /// Buffered duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Whether the window has reached its capacity.
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Contiguous copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<f32> {
        let (a, b) = self.samples.as_slices();
        let mut out = Vec::with_capacity(self.samples.len());
        out.extend_from_slice(a);
        out.extend_from_slice(b);
        out
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
