use async_trait::async_trait;

use crate::error::ProcessError;
use crate::task::Task;

/// Executes dequeued tasks. The queue knows nothing about what a task does.
///
/// Implementations must be safe to call from several workers at once.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn process(&self, task: &Task) -> Result<(), ProcessError>;
}
