use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use gradetrend_core::{StatisticsStore, SuggestionGenerator};
use gradetrend_queue::{ProcessError, StatisticsRequest, Task, TaskHandler, TaskPayload};

use crate::compute::{course_statistics, user_course_statistics};
use crate::trend::TrendClassifier;

/// Routes statistics tasks to their computation and persists the result.
pub struct StatisticsProcessor {
    store: Arc<dyn StatisticsStore>,
    suggestions: Arc<dyn SuggestionGenerator>,
    trend: TrendClassifier,
}

impl StatisticsProcessor {
    pub fn new(
        store: Arc<dyn StatisticsStore>,
        suggestions: Arc<dyn SuggestionGenerator>,
        trend: TrendClassifier,
    ) -> Self {
        Self {
            store,
            suggestions,
            trend,
        }
    }

    async fn course(&self, request: &StatisticsRequest) -> Result<(), ProcessError> {
        let Some(stats) = course_statistics(
            self.store.as_ref(),
            self.suggestions.as_ref(),
            &self.trend,
            request,
        )
        .await?
        else {
            return Ok(());
        };

        self.store
            .upsert_course_statistics(&stats, request.course_id)
            .await?;
        info!(
            course_id = request.course_id,
            assignments = stats.assignments.len(),
            grade = %stats.grade_tendency,
            submissions = %stats.submission_tendency,
            "Course statistics updated"
        );
        Ok(())
    }

    async fn user(&self, request: &StatisticsRequest) -> Result<(), ProcessError> {
        let Some(stats) =
            user_course_statistics(self.store.as_ref(), &self.trend, request).await?
        else {
            return Ok(());
        };

        self.store
            .upsert_user_statistics(&stats, request.course_id, request.user_id)
            .await?;
        info!(
            course_id = request.course_id,
            user_id = request.user_id,
            assignments = stats.assignments.len(),
            "User course statistics updated"
        );
        Ok(())
    }
}

#[async_trait]
impl TaskHandler for StatisticsProcessor {
    async fn process(&self, task: &Task) -> Result<(), ProcessError> {
        debug!(task_id = %task.id, kind = %task.kind(), "Computing statistics");
        match &task.payload {
            TaskPayload::CourseStatistics(request) => self.course(request).await,
            TaskPayload::UserCourseStatistics(request) => self.user(request).await,
            TaskPayload::GlobalStatistics => {
                Err(ProcessError::UnknownTaskType(task.kind().to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gradetrend_core::{
        AssignmentId, AssignmentPreview, Course, CourseId, CourseStatistics, MemoryStore,
        NoSuggestions, StoreError, Submission, UserCourseStatistics, UserId,
    };
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Wraps a [`MemoryStore`] and fails reads of submissions on demand.
    struct FlakyStore {
        inner: MemoryStore,
        fail_submissions: AtomicBool,
    }

    #[async_trait]
    impl StatisticsStore for FlakyStore {
        async fn course(&self, course_id: CourseId) -> Result<Course, StoreError> {
            self.inner.course(course_id).await
        }
        async fn assignment_previews(
            &self,
            course_id: CourseId,
            viewer: UserId,
        ) -> Result<Vec<AssignmentPreview>, StoreError> {
            self.inner.assignment_previews(course_id, viewer).await
        }
        async fn submissions(
            &self,
            course_id: CourseId,
            assignment_id: AssignmentId,
        ) -> Result<Vec<Submission>, StoreError> {
            if self.fail_submissions.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("connection reset".into()));
            }
            self.inner.submissions(course_id, assignment_id).await
        }
        async fn submission(
            &self,
            course_id: CourseId,
            assignment_id: AssignmentId,
            user_id: UserId,
        ) -> Result<Submission, StoreError> {
            self.inner.submission(course_id, assignment_id, user_id).await
        }
        async fn enrolled_student_count(&self, course_id: CourseId) -> Result<u64, StoreError> {
            self.inner.enrolled_student_count(course_id).await
        }
        async fn upsert_course_statistics(
            &self,
            stats: &CourseStatistics,
            course_id: CourseId,
        ) -> Result<(), StoreError> {
            self.inner.upsert_course_statistics(stats, course_id).await
        }
        async fn upsert_user_statistics(
            &self,
            stats: &UserCourseStatistics,
            course_id: CourseId,
            user_id: UserId,
        ) -> Result<(), StoreError> {
            self.inner.upsert_user_statistics(stats, course_id, user_id).await
        }
    }

    async fn seeded() -> Arc<FlakyStore> {
        let inner = MemoryStore::new();
        inner
            .insert_course(Course {
                id: 1,
                name: "Physics".into(),
                teacher_id: 100,
            })
            .await;
        inner.enroll(1, 7).await;
        inner
            .insert_assignment(AssignmentPreview {
                id: 1,
                course_id: 1,
                title: "Kinematics".into(),
                created_at: Utc::now(),
                published: true,
            })
            .await;
        inner
            .insert_submission(Submission {
                id: 1,
                course_id: 1,
                assignment_id: 1,
                user_id: 7,
                grade: 75.0,
                submitted_at: Utc::now(),
            })
            .await;
        Arc::new(FlakyStore {
            inner,
            fail_submissions: AtomicBool::new(false),
        })
    }

    fn processor(store: Arc<FlakyStore>) -> StatisticsProcessor {
        StatisticsProcessor::new(store, Arc::new(NoSuggestions), TrendClassifier::default())
    }

    fn request(user_id: UserId) -> StatisticsRequest {
        StatisticsRequest {
            course_id: 1,
            user_id,
            user_email: "someone@school.test".into(),
        }
    }

    #[tokio::test]
    async fn course_task_persists_statistics() {
        let store = seeded().await;
        let task = Task::new(TaskPayload::CourseStatistics(request(100)));
        processor(store.clone()).process(&task).await.unwrap();

        let stats = store.inner.course_statistics(1).await.unwrap();
        assert_eq!(stats.course_name, "Physics");
        assert_eq!(stats.average_grade, 75.0);
        assert_eq!(stats.submission_rate, 1.0);
    }

    #[tokio::test]
    async fn user_task_persists_statistics() {
        let store = seeded().await;
        let task = Task::new(TaskPayload::UserCourseStatistics(request(7)));
        processor(store.clone()).process(&task).await.unwrap();

        let stats = store.inner.user_statistics(1, 7).await.unwrap();
        assert_eq!(stats.average_grade, 75.0);
        assert!(store.inner.course_statistics(1).await.is_none());
    }

    #[tokio::test]
    async fn global_task_is_unknown() {
        let store = seeded().await;
        let task = Task::new(TaskPayload::GlobalStatistics);
        let err = processor(store).process(&task).await.unwrap_err();
        assert!(matches!(err, ProcessError::UnknownTaskType(kind) if kind == "global_statistics"));
    }

    #[tokio::test]
    async fn failed_read_leaves_previous_record_untouched() {
        let store = seeded().await;
        let processor = processor(store.clone());
        let task = Task::new(TaskPayload::CourseStatistics(request(100)));
        processor.process(&task).await.unwrap();
        let before = store.inner.course_statistics(1).await.unwrap();

        store
            .inner
            .insert_submission(Submission {
                id: 2,
                course_id: 1,
                assignment_id: 1,
                user_id: 7,
                grade: 20.0,
                submitted_at: Utc::now(),
            })
            .await;
        store.fail_submissions.store(true, Ordering::SeqCst);

        let err = processor.process(&task).await.unwrap_err();
        assert!(matches!(err, ProcessError::Store(StoreError::Backend(_))));
        assert_eq!(store.inner.course_statistics(1).await.unwrap(), before);
    }

    #[tokio::test]
    async fn missing_course_is_not_an_error() {
        let store = seeded().await;
        let mut req = request(100);
        req.course_id = 404;
        let task = Task::new(TaskPayload::CourseStatistics(req));
        processor(store.clone()).process(&task).await.unwrap();
        assert!(store.inner.course_statistics(404).await.is_none());
    }
}
