//! Ordering bands for frame tasks.

/// Coarse frame phases, each mapped to an integer band.
///
/// Tasks in an earlier phase always run before tasks in a later one; inside
/// a phase, [`Phase::offset`] or registration order decides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Camera state and anything later tasks read camera-relative values from.
    PreFrame,
    /// Positioning, wandering, pathfinding decisions.
    Simulation,
    /// LOD reads, animation, environmental effects.
    Presentation,
    /// Frame-time sampling, stats, debug overlays.
    PostFrame,
}

impl Phase {
    /// Width of each phase band.
    pub const BAND: i32 = 100;

    /// First priority value of the band.
    pub const fn base(self) -> i32 {
        match self {
            Phase::PreFrame => 0,
            Phase::Simulation => Self::BAND,
            Phase::Presentation => 2 * Self::BAND,
            Phase::PostFrame => 3 * Self::BAND,
        }
    }

    /// A priority inside this phase's band. Offsets are clamped to the band.
    pub fn offset(self, offset: i32) -> Priority {
        Priority(self.base() + offset.clamp(0, Self::BAND - 1))
    }
}

/// Task priority. Lower values run first; equal values run in registration
/// order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Priority(pub i32);

impl Priority {
    pub fn value(self) -> i32 {
        self.0
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Priority(value)
    }
}

impl From<Phase> for Priority {
    fn from(phase: Phase) -> Self {
        Priority(phase.base())
    }
}
