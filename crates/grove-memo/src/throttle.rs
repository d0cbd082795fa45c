//! Per-id cadence limiter for work that should run below the frame rate.

use rustc_hash::FxHashMap;

/// Records, per string id, the elapsed time an action last ran and reports
/// whether its interval has passed.
///
/// Lets several subsystems run at their own cadence (pathfinding at 10 Hz,
/// stats at 1 Hz) from inside a 60 Hz frame task without each one owning a
/// timer.
#[derive(Debug, Default)]
pub struct Throttle {
    last_run: FxHashMap<String, f64>,
}

impl Throttle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records `elapsed` if at least `interval` seconds
    /// have passed since `id` last ran. An id that never ran is always ready.
    ///
    /// Only allocates the first time an id is seen.
    pub fn ready(&mut self, id: &str, elapsed: f64, interval: f64) -> bool {
        match self.last_run.get_mut(id) {
            Some(last) => {
                if elapsed - *last >= interval {
                    *last = elapsed;
                    true
                } else {
                    false
                }
            }
            None => {
                self.last_run.insert(id.to_owned(), elapsed);
                true
            }
        }
    }

    /// Elapsed time at which `id` last ran, if ever.
    pub fn last_run(&self, id: &str) -> Option<f64> {
        self.last_run.get(id).copied()
    }

    /// Make `id` ready again on its next check.
    pub fn reset(&mut self, id: &str) {
        self.last_run.remove(id);
    }

    pub fn clear(&mut self) {
        self.last_run.clear();
    }

    pub fn len(&self) -> usize {
        self.last_run.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_run.is_empty()
    }
}
