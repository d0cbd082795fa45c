//! LOD configuration errors.

/// Rejected configuration changes. The previous configuration stays active.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LodError {
    /// Distances must satisfy `high < medium < low < cull`.
    #[error("LOD distances must be strictly increasing, got high={high} medium={medium} low={low} cull={cull}")]
    NonIncreasing {
        high: f32,
        medium: f32,
        low: f32,
        cull: f32,
    },

    /// A distance was negative, zero, NaN or infinite.
    #[error("LOD distance `{name}` must be finite and positive, got {value}")]
    InvalidDistance { name: &'static str, value: f32 },

    /// The hysteresis margin was negative or not finite.
    #[error("hysteresis margin must be finite and non-negative, got {0}")]
    InvalidMargin(f32),
}
