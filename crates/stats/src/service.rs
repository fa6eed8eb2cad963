//! Statistics service: the entry point request handlers use.
//!
//! Owns one [`TaskQueue`] wired to one [`StatisticsProcessor`] and exposes
//! typed enqueue operations. Enqueue errors are returned to the caller, who
//! is expected to log them and carry on; recomputation is best-effort.

use std::sync::Arc;

use gradetrend_core::{Config, CourseId, StatisticsStore, SuggestionGenerator, UserId};
use gradetrend_queue::{
    QueueError, QueueMetricsSnapshot, QueueSettings, QueueState, StatisticsRequest, Task,
    TaskPayload, TaskQueue,
};

use crate::processor::StatisticsProcessor;
use crate::trend::TrendClassifier;

pub struct StatisticsService {
    queue: TaskQueue,
}

impl StatisticsService {
    pub fn new(
        settings: QueueSettings,
        trend: TrendClassifier,
        store: Arc<dyn StatisticsStore>,
        suggestions: Arc<dyn SuggestionGenerator>,
    ) -> Self {
        let processor = Arc::new(StatisticsProcessor::new(store, suggestions, trend));
        Self {
            queue: TaskQueue::new(settings, processor),
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn StatisticsStore>,
        suggestions: Arc<dyn SuggestionGenerator>,
    ) -> Self {
        Self::new(
            QueueSettings::from(&config.queue),
            TrendClassifier::from(&config.trend),
            store,
            suggestions,
        )
    }

    pub fn start(&self) {
        self.queue.start();
    }

    pub async fn stop(&self) {
        self.queue.stop().await;
    }

    pub fn enqueue_course_statistics(
        &self,
        course_id: CourseId,
        user_id: UserId,
        user_email: &str,
    ) -> Result<(), QueueError> {
        self.queue
            .enqueue(Task::new(TaskPayload::CourseStatistics(request(
                course_id, user_id, user_email,
            ))))
    }

    pub fn enqueue_user_course_statistics(
        &self,
        course_id: CourseId,
        user_id: UserId,
        user_email: &str,
    ) -> Result<(), QueueError> {
        self.queue
            .enqueue(Task::new(TaskPayload::UserCourseStatistics(request(
                course_id, user_id, user_email,
            ))))
    }

    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    /// Tasks accepted but not yet completed or dropped.
    pub fn outstanding(&self) -> usize {
        self.queue.outstanding()
    }

    pub fn state(&self) -> QueueState {
        self.queue.state()
    }

    pub fn metrics(&self) -> QueueMetricsSnapshot {
        self.queue.metrics()
    }
}

fn request(course_id: CourseId, user_id: UserId, user_email: &str) -> StatisticsRequest {
    StatisticsRequest {
        course_id,
        user_id,
        user_email: user_email.to_string(),
    }
}
