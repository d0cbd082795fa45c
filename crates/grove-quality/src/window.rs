//! Fixed-capacity ring of recent frame durations.

/// Default number of samples: one second at 60 FPS.
pub const DEFAULT_CAPACITY: usize = 60;

/// Circular buffer of frame durations in milliseconds.
///
/// Inserts are O(1): once full, the oldest sample is overwritten in place.
/// A running sum keeps the average O(1) as well; it is recomputed exactly
/// every time the write cursor wraps so float drift cannot accumulate.
#[derive(Clone, Debug)]
pub struct FrameTimeWindow {
    samples: Vec<f32>,
    capacity: usize,
    cursor: usize,
    sum: f64,
}

impl FrameTimeWindow {
    /// Create an empty window. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
            sum: 0.0,
        }
    }

    /// Record one frame duration. Returns `true` when this sample completed a
    /// full pass over the buffer (the cursor wrapped back to the start).
    ///
    /// Negative and non-finite samples are discarded.
    pub fn push(&mut self, millis: f32) -> bool {
        if !millis.is_finite() || millis < 0.0 {
            log::warn!("discarding invalid frame duration {millis}");
            return false;
        }

        if self.samples.len() < self.capacity {
            self.samples.push(millis);
        } else {
            self.sum -= f64::from(self.samples[self.cursor]);
            self.samples[self.cursor] = millis;
        }
        self.sum += f64::from(millis);

        self.cursor += 1;
        if self.cursor == self.capacity {
            self.cursor = 0;
            self.sum = self.samples.iter().map(|&s| f64::from(s)).sum();
            true
        } else {
            false
        }
    }

    /// Mean frame duration in milliseconds, `None` when empty.
    pub fn average_ms(&self) -> Option<f32> {
        if self.samples.is_empty() {
            None
        } else {
            Some((self.sum / self.samples.len() as f64) as f32)
        }
    }

    /// Rolling FPS derived from the mean duration. `None` when empty or when
    /// every sample is zero.
    pub fn average_fps(&self) -> Option<f32> {
        self.average_ms()
            .filter(|&ms| ms > 0.0)
            .map(|ms| 1000.0 / ms)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all samples, keeping the allocation.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.cursor = 0;
        self.sum = 0.0;
    }
}

impl Default for FrameTimeWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
