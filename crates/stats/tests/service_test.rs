//! End-to-end tests of the statistics service over an in-memory store.
//!
//! Tasks go through the real queue, workers and processor; results are read
//! back from the store once the queue reports nothing outstanding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use gradetrend_core::{
    AssignmentId, AssignmentPreview, Course, CourseId, CourseStatistics, Fixture, MemoryStore,
    NoSuggestions, StatisticsStore, StoreError, Submission, SuggestionError, SuggestionGenerator,
    Tendency, UserCourseStatistics, UserId,
};
use gradetrend_queue::{QueueError, QueueSettings, QueueState};
use gradetrend_stats::{StatisticsService, TrendClassifier};

const TIMEOUT: Duration = Duration::from_secs(5);

const FIXTURE: &str = r#"{
  "courses": [
    { "id": 1, "name": "Algebra", "teacher_id": 100 },
    { "id": 2, "name": "Biology", "teacher_id": 200 }
  ],
  "assignments": [
    { "id": 10, "course_id": 1, "title": "Equations", "created_at": "2026-03-01T09:00:00Z" },
    { "id": 11, "course_id": 1, "title": "Inequalities", "created_at": "2026-03-08T09:00:00Z" },
    { "id": 12, "course_id": 1, "title": "Functions", "created_at": "2026-03-15T09:00:00Z" },
    { "id": 13, "course_id": 1, "title": "Draft", "created_at": "2026-03-22T09:00:00Z", "published": false },
    { "id": 20, "course_id": 2, "title": "Cells", "created_at": "2026-03-02T09:00:00Z" }
  ],
  "submissions": [
    { "id": 1, "course_id": 1, "assignment_id": 10, "user_id": 1, "grade": 90.0, "submitted_at": "2026-03-02T10:00:00Z" },
    { "id": 2, "course_id": 1, "assignment_id": 10, "user_id": 2, "grade": 70.0, "submitted_at": "2026-03-02T11:00:00Z" },
    { "id": 3, "course_id": 1, "assignment_id": 11, "user_id": 1, "grade": 60.0, "submitted_at": "2026-03-09T10:00:00Z" },
    { "id": 4, "course_id": 1, "assignment_id": 12, "user_id": 1, "grade": 40.0, "submitted_at": "2026-03-16T10:00:00Z" },
    { "id": 5, "course_id": 2, "assignment_id": 20, "user_id": 3, "submitted_at": "2026-03-03T10:00:00Z" }
  ],
  "enrollments": [
    { "course_id": 1, "user_id": 1 },
    { "course_id": 1, "user_id": 2 },
    { "course_id": 2, "user_id": 3 }
  ]
}"#;

fn fast_settings(workers: usize) -> QueueSettings {
    QueueSettings {
        capacity: 32,
        workers,
        default_max_retries: 3,
        retry_backoff: Duration::from_millis(10),
    }
}

fn fixture_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::from_fixture(Fixture::from_json(FIXTURE).unwrap()))
}

async fn drained(service: &StatisticsService) {
    timeout(TIMEOUT, async {
        while service.outstanding() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("queue did not drain");
}

struct FixedSuggestion;

#[async_trait]
impl SuggestionGenerator for FixedSuggestion {
    async fn generate(
        &self,
        grade_tendency: Tendency,
        _submission_tendency: Tendency,
        _average_grade: f64,
    ) -> Result<String, SuggestionError> {
        Ok(format!("grades are {grade_tendency}"))
    }
}

#[tokio::test]
async fn course_and_user_statistics_are_persisted() {
    let store = fixture_store();
    let service = StatisticsService::new(
        fast_settings(3),
        TrendClassifier::default(),
        store.clone(),
        Arc::new(FixedSuggestion),
    );
    service.start();

    service.enqueue_course_statistics(1, 100, "teacher@school.test").unwrap();
    service.enqueue_user_course_statistics(1, 1, "ana@school.test").unwrap();
    service.enqueue_user_course_statistics(1, 2, "ben@school.test").unwrap();
    drained(&service).await;
    service.stop().await;

    let course = store.course_statistics(1).await.unwrap();
    assert_eq!(course.course_name, "Algebra");
    // The teacher sees the unpublished draft as an empty point.
    assert_eq!(course.assignments.len(), 4);
    assert_eq!(course.grade_tendency, Tendency::Decrescent);
    assert_eq!(course.suggestion, "grades are decrescent");

    let ana = store.user_statistics(1, 1).await.unwrap();
    assert_eq!(ana.assignments.len(), 3);
    assert_eq!(ana.submission_rate, 1.0);
    assert!((ana.average_grade - 190.0 / 3.0).abs() < 1e-9);
    assert_eq!(ana.grade_tendency, Tendency::Decrescent);

    let ben = store.user_statistics(1, 2).await.unwrap();
    assert_eq!(ben.average_grade, 70.0);
    assert!((ben.submission_rate - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(ben.submission_tendency, Tendency::Decrescent);

    let metrics = service.metrics();
    assert_eq!(metrics.enqueued, 3);
    assert_eq!(metrics.processed, 3);
    assert_eq!(metrics.failed_attempts, 0);
}

#[tokio::test]
async fn ungraded_course_has_zero_average() {
    let store = fixture_store();
    let service = StatisticsService::new(
        fast_settings(1),
        TrendClassifier::default(),
        store.clone(),
        Arc::new(NoSuggestions),
    );
    service.start();
    service.enqueue_course_statistics(2, 200, "teacher@school.test").unwrap();
    drained(&service).await;
    service.stop().await;

    let stats = store.course_statistics(2).await.unwrap();
    assert_eq!(stats.average_grade, 0.0);
    assert_eq!(stats.submission_rate, 1.0);
    assert_eq!(stats.suggestion, "");
}

#[tokio::test]
async fn enqueue_after_stop_is_rejected() {
    let service = StatisticsService::new(
        fast_settings(2),
        TrendClassifier::default(),
        fixture_store(),
        Arc::new(NoSuggestions),
    );
    assert_eq!(
        service.enqueue_course_statistics(1, 100, "t@school.test"),
        Err(QueueError::NotRunning)
    );

    service.start();
    assert_eq!(service.state(), QueueState::Running);
    service.stop().await;
    assert_eq!(service.state(), QueueState::Stopped);
    assert_eq!(
        service.enqueue_user_course_statistics(1, 1, "ana@school.test"),
        Err(QueueError::NotRunning)
    );
    assert_eq!(service.queue_size(), 0);
}

/// Fails the first `failures` submission reads, then delegates.
struct RecoveringStore {
    inner: MemoryStore,
    failures: AtomicUsize,
}

#[async_trait]
impl StatisticsStore for RecoveringStore {
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
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(StoreError::Backend("database is locked".into()));
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

#[tokio::test]
async fn transient_store_failure_is_retried() {
    let store = Arc::new(RecoveringStore {
        inner: MemoryStore::from_fixture(Fixture::from_json(FIXTURE).unwrap()),
        failures: AtomicUsize::new(2),
    });
    let service = StatisticsService::new(
        fast_settings(1),
        TrendClassifier::default(),
        store.clone(),
        Arc::new(NoSuggestions),
    );
    service.start();
    service.enqueue_course_statistics(2, 200, "teacher@school.test").unwrap();
    drained(&service).await;
    service.stop().await;

    assert!(store.inner.course_statistics(2).await.is_some());
    let metrics = service.metrics();
    assert_eq!(metrics.failed_attempts, 2);
    assert_eq!(metrics.retried, 2);
    assert_eq!(metrics.processed, 1);
    assert_eq!(metrics.dropped, 0);
}

#[tokio::test]
async fn persistent_failure_is_dropped_after_ceiling() {
    let store = Arc::new(RecoveringStore {
        inner: MemoryStore::from_fixture(Fixture::from_json(FIXTURE).unwrap()),
        failures: AtomicUsize::new(usize::MAX),
    });
    let service = StatisticsService::new(
        fast_settings(1),
        TrendClassifier::default(),
        store.clone(),
        Arc::new(NoSuggestions),
    );
    service.start();
    service.enqueue_course_statistics(2, 200, "teacher@school.test").unwrap();
    drained(&service).await;
    service.stop().await;

    assert!(store.inner.course_statistics(2).await.is_none());
    let metrics = service.metrics();
    assert_eq!(metrics.failed_attempts, 4);
    assert_eq!(metrics.retried, 3);
    assert_eq!(metrics.dropped, 1);
}
