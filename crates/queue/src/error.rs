//! Queue error types.

use thiserror::Error;

use gradetrend_core::StoreError;

/// Why a task could not be accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("task queue is not running")]
    NotRunning,

    #[error("task queue is full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("task queue is shutting down")]
    ShuttingDown,
}

/// Why a handler failed to process a task. Every variant is retried.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("data access failed: {0}")]
    Store(#[from] StoreError),

    #[error("processing failed: {0}")]
    Failed(String),
}
