//! Data-access collaborator used by the statistics computation.

use async_trait::async_trait;

use crate::entity::{
    AssignmentId, AssignmentPreview, Course, CourseId, CourseStatistics, Submission,
    UserCourseStatistics, UserId,
};
use crate::error::StoreError;

/// Everything the statistics engine needs from persistence.
///
/// Every read may fail with [`StoreError::NotFound`]; callers treat that as
/// "no data" rather than a hard failure.
#[async_trait]
pub trait StatisticsStore: Send + Sync {
    async fn course(&self, course_id: CourseId) -> Result<Course, StoreError>;

    /// Assignments of the course as seen by `viewer` (teacher or student).
    async fn assignment_previews(
        &self,
        course_id: CourseId,
        viewer: UserId,
    ) -> Result<Vec<AssignmentPreview>, StoreError>;

    async fn submissions(
        &self,
        course_id: CourseId,
        assignment_id: AssignmentId,
    ) -> Result<Vec<Submission>, StoreError>;

    async fn submission(
        &self,
        course_id: CourseId,
        assignment_id: AssignmentId,
        user_id: UserId,
    ) -> Result<Submission, StoreError>;

    async fn enrolled_student_count(&self, course_id: CourseId) -> Result<u64, StoreError>;

    /// Replace the course statistics record for `course_id`.
    async fn upsert_course_statistics(
        &self,
        stats: &CourseStatistics,
        course_id: CourseId,
    ) -> Result<(), StoreError>;

    /// Replace the statistics record for (`course_id`, `user_id`).
    async fn upsert_user_statistics(
        &self,
        stats: &UserCourseStatistics,
        course_id: CourseId,
        user_id: UserId,
    ) -> Result<(), StoreError>;
}
