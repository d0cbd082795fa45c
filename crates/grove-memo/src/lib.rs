//! Memoization helpers consumed by frame tasks: a quantized spatial boolean
//! cache, a per-id throttle, and small dirty-flag utilities.

mod dirty;
mod grid_cache;
mod throttle;

pub use dirty::{DirtyFlag, Memo};
pub use grid_cache::{CellKey, SpatialBoolCache};
pub use throttle::Throttle;
