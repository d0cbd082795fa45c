//! Scheduler errors.

/// Registration rejected synchronously; nothing was registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("frame task id must not be empty")]
    EmptyId,
}

/// A task failed during one tick. The failure is isolated to that task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The task returned an error.
    #[error("{0}")]
    Failed(String),

    /// The task panicked; the payload message is captured when it is a string.
    #[error("panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed(message.into())
    }
}
