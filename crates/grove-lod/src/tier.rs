//! Detail tiers and what each one allows downstream systems to do.

/// Detail level assigned to an entity for the current frame.
///
/// Ordered from most to least detailed, so `High < Medium < Low < Culled`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LodTier {
    /// Full fidelity.
    High,
    /// Full mesh, no fine detail animation (blink, eye tracking).
    Medium,
    /// Simplified silhouette, no secondary animation.
    Low,
    /// Skip essentially all per-entity work this frame.
    Culled,
}

impl LodTier {
    pub const ALL: [LodTier; 4] = [LodTier::High, LodTier::Medium, LodTier::Low, LodTier::Culled];

    /// Stable index usable for per-tier tallies.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_culled(self) -> bool {
        self == LodTier::Culled
    }

    /// Anything but `Culled` draws some representation.
    pub fn renders_mesh(self) -> bool {
        self != LodTier::Culled
    }

    /// `High` and `Medium` draw the full mesh; `Low` draws a silhouette.
    pub fn full_mesh(self) -> bool {
        self <= LodTier::Medium
    }

    /// Secondary animation (cloth, tails, idle fidgets).
    pub fn animates_secondary(self) -> bool {
        self <= LodTier::Medium
    }

    /// Fine detail animation such as blinking and eye tracking.
    pub fn animates_fine_detail(self) -> bool {
        self == LodTier::High
    }

    pub fn casts_shadows(self) -> bool {
        self <= LodTier::Medium
    }

    pub fn name(self) -> &'static str {
        match self {
            LodTier::High => "high",
            LodTier::Medium => "medium",
            LodTier::Low => "low",
            LodTier::Culled => "culled",
        }
    }
}

impl std::fmt::Display for LodTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
