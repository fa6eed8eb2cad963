//! Statistics computation over the data-access collaborator.
//!
//! Both computations build the full result in memory and never write; the
//! caller persists it in one upsert.

pub mod course;
pub mod user;

use chrono::{DateTime, Utc};

use gradetrend_core::{AssignmentPreview, StatisticsForAssignment, Submission};

pub use course::course_statistics;
pub use user::user_course_statistics;

/// Per-assignment submission counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubmissionTally {
    pub submissions: u64,
    /// Submissions with a grade above zero.
    pub rated: u64,
    /// Sum of grades above zero.
    pub total_grade: f64,
}

impl SubmissionTally {
    pub fn from_submissions(submissions: &[Submission]) -> Self {
        let mut tally = Self::default();
        for submission in submissions {
            tally.submissions += 1;
            if submission.is_rated() {
                tally.rated += 1;
                tally.total_grade += submission.grade;
            }
        }
        tally
    }

    pub fn average_grade(&self) -> f64 {
        if self.rated == 0 {
            return 0.0;
        }
        self.total_grade / self.rated as f64
    }

    /// Fraction of `students` that submitted; 0 when nobody is enrolled.
    pub fn submission_rate(&self, students: u64) -> f64 {
        if students == 0 {
            return 0.0;
        }
        self.submissions as f64 / students as f64
    }

    pub fn point(&self, date: DateTime<Utc>, students: u64) -> StatisticsForAssignment {
        StatisticsForAssignment {
            date,
            average_grade: self.average_grade(),
            submission_rate: self.submission_rate(students),
        }
    }
}

/// Assignments sorted by creation time, oldest first.
pub(crate) fn chronological(mut assignments: Vec<AssignmentPreview>) -> Vec<AssignmentPreview> {
    assignments.sort_by_key(|a| a.created_at);
    assignments
}
