//! Centralized per-frame dispatcher.
//!
//! Entity systems register a [`FrameTask`] once under a string id and a
//! [`Priority`]; the render host calls [`FrameScheduler::tick`] exactly once
//! per frame, which resets frame scratch state and runs every task in
//! priority order with the shared frame context.

mod error;
mod priority;
mod scheduler;
mod scratch;
mod task;

pub use error::{ScheduleError, TaskError};
pub use priority::{Phase, Priority};
pub use scheduler::{FailureHook, FrameScheduler, TaskFailure};
pub use scratch::{Recycle, ScratchPool};
pub use task::{FnTask, FrameContext, FrameTask, FrameTime};
