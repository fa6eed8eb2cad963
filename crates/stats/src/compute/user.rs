use tracing::debug;

use gradetrend_core::error::NotFoundExt;
use gradetrend_core::{StatisticsForAssignment, StatisticsStore, StoreError, UserCourseStatistics};
use gradetrend_queue::StatisticsRequest;

use super::chronological;
use crate::trend::{mean, TrendClassifier};

/// Statistics of the requesting user in one course.
///
/// Every visible assignment yields exactly one point; an assignment the user
/// never submitted is an explicit zero point. The average grade is taken
/// over graded submissions only, the submission rate over all assignments.
pub async fn user_course_statistics(
    store: &dyn StatisticsStore,
    trend: &TrendClassifier,
    request: &StatisticsRequest,
) -> Result<Option<UserCourseStatistics>, StoreError> {
    let Some(course) = store.course(request.course_id).await.found()? else {
        debug!(course_id = request.course_id, "Course not found, nothing to compute");
        return Ok(None);
    };
    let assignments = store
        .assignment_previews(course.id, request.user_id)
        .await
        .found()?
        .unwrap_or_default();

    let mut points = Vec::with_capacity(assignments.len());
    let mut grades = Vec::new();
    let mut submitted = 0usize;
    for assignment in chronological(assignments) {
        let submission = store
            .submission(course.id, assignment.id, request.user_id)
            .await
            .found()?;

        let point = match submission {
            Some(s) => {
                submitted += 1;
                let grade = if s.is_rated() {
                    grades.push(s.grade);
                    s.grade
                } else {
                    0.0
                };
                StatisticsForAssignment {
                    date: assignment.created_at,
                    average_grade: grade,
                    submission_rate: 1.0,
                }
            }
            None => StatisticsForAssignment::empty(assignment.created_at),
        };
        points.push(point);
    }

    let submission_rate = if points.is_empty() {
        0.0
    } else {
        submitted as f64 / points.len() as f64
    };
    let summary = trend.summarize(&points);

    Ok(Some(UserCourseStatistics {
        course_id: course.id,
        user_id: request.user_id,
        course_name: course.name,
        average_grade: mean(&grades),
        submission_rate,
        grade_tendency: summary.grade_tendency,
        submission_tendency: summary.submission_tendency,
        assignments: points,
    }))
}
