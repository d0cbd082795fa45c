//! Adaptive quality: frame-time sampling and slow negative feedback on LOD
//! distance thresholds.

mod controller;
mod window;

pub use controller::{
    QualityAction, QualityAdjustment, QualityConfig, QualityController, QualityError,
};
pub use window::FrameTimeWindow;
