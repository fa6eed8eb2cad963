use tracing::{debug, warn};

use gradetrend_core::error::NotFoundExt;
use gradetrend_core::{CourseStatistics, StatisticsStore, StoreError, SuggestionGenerator};
use gradetrend_queue::StatisticsRequest;

use super::{chronological, SubmissionTally};
use crate::trend::{mean, TrendClassifier};

/// Course-wide statistics as seen through the requesting user's assignment list.
///
/// Returns `Ok(None)` when the course does not exist. A failing suggestion
/// backend leaves the suggestion empty instead of failing the computation.
pub async fn course_statistics(
    store: &dyn StatisticsStore,
    suggestions: &dyn SuggestionGenerator,
    trend: &TrendClassifier,
    request: &StatisticsRequest,
) -> Result<Option<CourseStatistics>, StoreError> {
    let Some(course) = store.course(request.course_id).await.found()? else {
        debug!(course_id = request.course_id, "Course not found, nothing to compute");
        return Ok(None);
    };
    let students = store
        .enrolled_student_count(course.id)
        .await
        .found()?
        .unwrap_or(0);
    let assignments = store
        .assignment_previews(course.id, request.user_id)
        .await
        .found()?
        .unwrap_or_default();

    let mut points = Vec::with_capacity(assignments.len());
    let mut rated_averages = Vec::new();
    for assignment in chronological(assignments) {
        let submissions = store
            .submissions(course.id, assignment.id)
            .await
            .found()?
            .unwrap_or_default();
        let tally = SubmissionTally::from_submissions(&submissions);
        if tally.rated > 0 {
            rated_averages.push(tally.average_grade());
        }
        points.push(tally.point(assignment.created_at, students));
    }

    let rates: Vec<f64> = points.iter().map(|p| p.submission_rate).collect();
    let summary = trend.summarize(&points);

    let suggestion = match suggestions
        .generate(
            summary.grade_tendency,
            summary.submission_tendency,
            summary.average_grade,
        )
        .await
    {
        Ok(text) => text,
        Err(e) => {
            warn!(course_id = course.id, "Suggestion unavailable: {}", e);
            String::new()
        }
    };

    Ok(Some(CourseStatistics {
        course_id: course.id,
        course_name: course.name,
        average_grade: mean(&rated_averages),
        submission_rate: mean(&rates),
        grade_tendency: summary.grade_tendency,
        submission_tendency: summary.submission_tendency,
        suggestion,
        assignments: points,
    }))
}
