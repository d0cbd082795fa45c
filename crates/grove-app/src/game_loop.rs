//! Variable-timestep frame clock.
//!
//! Every frame runs exactly one scheduler tick, so there is no accumulator:
//! the clock measures (or is told) how long the last frame took, clamps
//! spikes, and hands `elapsed`/`delta` to the frame function.

use std::time::Instant;
use tracing::warn;

/// Maximum frame time clamp.
/// A frame longer than this (a debugger pause, a stalled disk) is counted as
/// this long, so time-driven systems do not jump.
pub const MAX_FRAME_TIME: f64 = 0.25; // 250ms = 4 FPS minimum

/// Frame clock driving one tick per frame.
pub struct GameLoop {
    previous_time: Instant,
    elapsed: f64,
    frame_count: u64,
    clamped_frames: u64,
}

impl GameLoop {
    /// Creates a new `GameLoop` starting from the current instant.
    pub fn new() -> Self {
        Self {
            previous_time: Instant::now(),
            elapsed: 0.0,
            frame_count: 0,
            clamped_frames: 0,
        }
    }

    /// Runs one frame timed on the wall clock.
    ///
    /// `frame_fn(elapsed, delta)` is called exactly once, with `delta` the
    /// clamped wall time since the previous call.
    pub fn tick(&mut self, frame_fn: impl FnOnce(f64, f64)) {
        let current_time = Instant::now();
        let frame_time = current_time
            .duration_since(self.previous_time)
            .as_secs_f64();
        self.previous_time = current_time;
        self.advance(frame_time, frame_fn);
    }

    /// Runs one frame with an explicit frame time in seconds.
    ///
    /// Used by the headless host, which advances a simulated clock by the
    /// synthetic cost of the previous frame.
    pub fn advance(&mut self, frame_time: f64, frame_fn: impl FnOnce(f64, f64)) {
        let mut frame_time = if frame_time.is_finite() {
            frame_time.max(0.0)
        } else {
            0.0
        };

        if frame_time > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            frame_time = MAX_FRAME_TIME;
            self.clamped_frames += 1;
        }

        self.elapsed += frame_time;
        frame_fn(self.elapsed, frame_time);
        self.frame_count += 1;
    }

    /// Returns the total number of frames run.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Returns the session time in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Returns how many frames hit [`MAX_FRAME_TIME`].
    pub fn clamped_frames(&self) -> u64 {
        self.clamped_frames
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new()
    }
}
