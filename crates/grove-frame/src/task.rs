//! The per-frame task interface and the shared frame context.

use crate::error::TaskError;

/// Timing handed to every task in a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the session started.
    pub elapsed: f64,
    /// Seconds since the previous frame.
    pub delta: f64,
    /// Index of this tick, starting at 0.
    pub frame: u64,
}

/// State shared by all tasks of one scheduler, passed mutably to each task.
pub trait FrameContext {
    /// Called once at the start of every tick, before any task runs, so tasks
    /// can assume frame-scoped scratch resources start clean.
    fn reset_scratch(&mut self);
}

impl FrameContext for () {
    fn reset_scratch(&mut self) {}
}

/// Work an entity or system wants done once per frame.
///
/// Implemented by the owning system; the scheduler only holds it between
/// registration and unregistration.
pub trait FrameTask<C> {
    fn on_tick(&mut self, ctx: &mut C, time: FrameTime) -> Result<(), TaskError>;
}

impl<C, T: FrameTask<C> + ?Sized> FrameTask<C> for Box<T> {
    fn on_tick(&mut self, ctx: &mut C, time: FrameTime) -> Result<(), TaskError> {
        (**self).on_tick(ctx, time)
    }
}

/// Adapter turning a closure into a [`FrameTask`].
pub struct FnTask<F>(pub F);

impl<C, F> FrameTask<C> for FnTask<F>
where
    F: FnMut(&mut C, FrameTime) -> Result<(), TaskError>,
{
    fn on_tick(&mut self, ctx: &mut C, time: FrameTime) -> Result<(), TaskError> {
        (self.0)(ctx, time)
    }
}
