use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CourseId = i64;
pub type AssignmentId = i64;
pub type UserId = i64;
pub type SubmissionId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub teacher_id: UserId,
}

/// Lightweight view of an assignment, as returned to a given viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentPreview {
    pub id: AssignmentId,
    pub course_id: CourseId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Unpublished assignments are only visible to the course teacher.
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub course_id: CourseId,
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    /// 0 means not graded yet.
    #[serde(default)]
    pub grade: f64,
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    pub fn is_rated(&self) -> bool {
        self.grade > 0.0
    }
}

/// Three-way classification of a series' slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tendency {
    Crescent,
    Decrescent,
    #[default]
    Stable,
}

impl Tendency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tendency::Crescent => "crescent",
            Tendency::Decrescent => "decrescent",
            Tendency::Stable => "stable",
        }
    }
}

impl std::fmt::Display for Tendency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One point of the per-assignment time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsForAssignment {
    pub date: DateTime<Utc>,
    /// 0 when no submission is graded.
    pub average_grade: f64,
    /// In `[0, 1]`.
    pub submission_rate: f64,
}

impl StatisticsForAssignment {
    pub fn empty(date: DateTime<Utc>) -> Self {
        Self {
            date,
            average_grade: 0.0,
            submission_rate: 0.0,
        }
    }
}

/// Persisted course-wide statistics. Overwritten on every recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseStatistics {
    pub course_id: CourseId,
    pub course_name: String,
    pub average_grade: f64,
    pub submission_rate: f64,
    pub grade_tendency: Tendency,
    pub submission_tendency: Tendency,
    pub suggestion: String,
    pub assignments: Vec<StatisticsForAssignment>,
}

/// Persisted statistics for one student in one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCourseStatistics {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub course_name: String,
    pub average_grade: f64,
    pub submission_rate: f64,
    pub grade_tendency: Tendency,
    pub submission_tendency: Tendency,
    pub assignments: Vec<StatisticsForAssignment>,
}
