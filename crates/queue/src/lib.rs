//! Bounded multi-worker task queue with linear retry backoff.

pub mod error;
pub mod handler;
pub mod metrics;
pub mod queue;
pub mod task;

pub use error::{ProcessError, QueueError};
pub use handler::TaskHandler;
pub use metrics::{QueueMetrics, QueueMetricsSnapshot};
pub use queue::{QueueSettings, QueueState, TaskQueue};
pub use task::{StatisticsRequest, Task, TaskKind, TaskPayload};
