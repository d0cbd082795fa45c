//! Level-of-detail classification: distance tiers with hysteresis, frustum
//! visibility, named presets, and a per-entity tier cache keyed by typed handles.

mod classifier;
mod config;
mod error;
mod frustum;
mod handle;
mod tier;

pub use classifier::{CameraSnapshot, ClassifierStats, LodClassifier};
pub use config::{LodConfig, LodDistances, LodDistancesPatch, LodPreset};
pub use error::LodError;
pub use frustum::Frustum;
pub use handle::{EntityId, EntityRegistry};
pub use tier::LodTier;
