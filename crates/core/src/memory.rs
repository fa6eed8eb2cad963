//! In-memory [`StatisticsStore`] backed by `tokio::sync::RwLock`.
//!
//! Used by the replay binary and by tests. Data can be seeded one record at
//! a time or loaded from a JSON [`Fixture`].

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::entity::{
    AssignmentId, AssignmentPreview, Course, CourseId, CourseStatistics, Submission,
    UserCourseStatistics, UserId,
};
use crate::error::StoreError;
use crate::store::StatisticsStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub course_id: CourseId,
    pub user_id: UserId,
}

/// Serialized seed data for a [`MemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub assignments: Vec<AssignmentPreview>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
}

impl Fixture {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::Backend(format!("invalid fixture: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Backend(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }
}

#[derive(Debug, Default)]
struct Tables {
    courses: HashMap<CourseId, Course>,
    assignments: Vec<AssignmentPreview>,
    submissions: Vec<Submission>,
    enrollments: HashMap<CourseId, HashSet<UserId>>,
    course_stats: HashMap<CourseId, CourseStatistics>,
    user_stats: HashMap<(CourseId, UserId), UserCourseStatistics>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let mut tables = Tables::default();
        for course in fixture.courses {
            tables.courses.insert(course.id, course);
        }
        tables.assignments = fixture.assignments;
        tables.submissions = fixture.submissions;
        for enrollment in fixture.enrollments {
            tables
                .enrollments
                .entry(enrollment.course_id)
                .or_default()
                .insert(enrollment.user_id);
        }
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub async fn insert_course(&self, course: Course) {
        self.tables.write().await.courses.insert(course.id, course);
    }

    pub async fn insert_assignment(&self, assignment: AssignmentPreview) {
        self.tables.write().await.assignments.push(assignment);
    }

    /// Adds a submission, replacing any earlier one by the same user for the same assignment.
    pub async fn insert_submission(&self, submission: Submission) {
        let mut tables = self.tables.write().await;
        tables.submissions.retain(|s| {
            !(s.assignment_id == submission.assignment_id && s.user_id == submission.user_id)
        });
        tables.submissions.push(submission);
    }

    pub async fn enroll(&self, course_id: CourseId, user_id: UserId) {
        self.tables
            .write()
            .await
            .enrollments
            .entry(course_id)
            .or_default()
            .insert(user_id);
    }

    pub async fn course_ids(&self) -> Vec<CourseId> {
        let mut ids: Vec<_> = self.tables.read().await.courses.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub async fn enrolled_students(&self, course_id: CourseId) -> Vec<UserId> {
        let tables = self.tables.read().await;
        let mut ids: Vec<_> = tables
            .enrollments
            .get(&course_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    pub async fn course_statistics(&self, course_id: CourseId) -> Option<CourseStatistics> {
        self.tables.read().await.course_stats.get(&course_id).cloned()
    }

    pub async fn user_statistics(
        &self,
        course_id: CourseId,
        user_id: UserId,
    ) -> Option<UserCourseStatistics> {
        self.tables
            .read()
            .await
            .user_stats
            .get(&(course_id, user_id))
            .cloned()
    }

    pub async fn all_course_statistics(&self) -> Vec<CourseStatistics> {
        let mut all: Vec<_> = self.tables.read().await.course_stats.values().cloned().collect();
        all.sort_by_key(|s| s.course_id);
        all
    }

    pub async fn all_user_statistics(&self) -> Vec<UserCourseStatistics> {
        let mut all: Vec<_> = self.tables.read().await.user_stats.values().cloned().collect();
        all.sort_by_key(|s| (s.course_id, s.user_id));
        all
    }
}

#[async_trait]
impl StatisticsStore for MemoryStore {
    async fn course(&self, course_id: CourseId) -> Result<Course, StoreError> {
        self.tables
            .read()
            .await
            .courses
            .get(&course_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("course {course_id}")))
    }

    async fn assignment_previews(
        &self,
        course_id: CourseId,
        viewer: UserId,
    ) -> Result<Vec<AssignmentPreview>, StoreError> {
        let tables = self.tables.read().await;
        let course = tables
            .courses
            .get(&course_id)
            .ok_or_else(|| StoreError::NotFound(format!("course {course_id}")))?;
        let is_teacher = course.teacher_id == viewer;

        let mut previews: Vec<_> = tables
            .assignments
            .iter()
            .filter(|a| a.course_id == course_id && (is_teacher || a.published))
            .cloned()
            .collect();
        previews.sort_by_key(|a| a.created_at);
        Ok(previews)
    }

    async fn submissions(
        &self,
        course_id: CourseId,
        assignment_id: AssignmentId,
    ) -> Result<Vec<Submission>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .submissions
            .iter()
            .filter(|s| s.course_id == course_id && s.assignment_id == assignment_id)
            .cloned()
            .collect())
    }

    async fn submission(
        &self,
        course_id: CourseId,
        assignment_id: AssignmentId,
        user_id: UserId,
    ) -> Result<Submission, StoreError> {
        self.tables
            .read()
            .await
            .submissions
            .iter()
            .find(|s| {
                s.course_id == course_id && s.assignment_id == assignment_id && s.user_id == user_id
            })
            .cloned()
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "submission of user {user_id} for assignment {assignment_id}"
                ))
            })
    }

    async fn enrolled_student_count(&self, course_id: CourseId) -> Result<u64, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .enrollments
            .get(&course_id)
            .map(|set| set.len() as u64)
            .unwrap_or(0))
    }

    async fn upsert_course_statistics(
        &self,
        stats: &CourseStatistics,
        course_id: CourseId,
    ) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .course_stats
            .insert(course_id, stats.clone());
        Ok(())
    }

    async fn upsert_user_statistics(
        &self,
        stats: &UserCourseStatistics,
        course_id: CourseId,
        user_id: UserId,
    ) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .user_stats
            .insert((course_id, user_id), stats.clone());
        Ok(())
    }
}
