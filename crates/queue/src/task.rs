//! Task model: a typed payload plus retry bookkeeping.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gradetrend_core::{CourseId, UserId};

/// Discriminant of a [`TaskPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    CourseStatistics,
    UserCourseStatistics,
    /// Reserved; no handler computes it yet.
    GlobalStatistics,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::CourseStatistics => "course_statistics",
            TaskKind::UserCourseStatistics => "user_course_statistics",
            TaskKind::GlobalStatistics => "global_statistics",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the acting user whose view of the course is used.
///
/// For course statistics the acting user only decides assignment visibility;
/// for user statistics it is also the student being aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsRequest {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub user_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TaskPayload {
    CourseStatistics(StatisticsRequest),
    UserCourseStatistics(StatisticsRequest),
    GlobalStatistics,
}

impl TaskPayload {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskPayload::CourseStatistics(_) => TaskKind::CourseStatistics,
            TaskPayload::UserCourseStatistics(_) => TaskKind::UserCourseStatistics,
            TaskPayload::GlobalStatistics => TaskKind::GlobalStatistics,
        }
    }

    fn course_id(&self) -> Option<CourseId> {
        match self {
            TaskPayload::CourseStatistics(r) | TaskPayload::UserCourseStatistics(r) => {
                Some(r.course_id)
            }
            TaskPayload::GlobalStatistics => None,
        }
    }
}

/// A unit of deferred work. Owned by the queue until one worker takes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub payload: TaskPayload,
    /// Set by the queue on first successful enqueue.
    pub created_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    /// Filled with the queue default when absent.
    pub max_retries: Option<u32>,
}

impl Task {
    /// Create a task with a fresh `{kind}-{course}-{random}` identifier.
    pub fn new(payload: TaskPayload) -> Self {
        let scope = payload
            .course_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "all".to_string());
        let id = format!("{}-{}-{}", payload.kind(), scope, Uuid::new_v4().simple());
        Self {
            id,
            payload,
            created_at: None,
            retry_count: 0,
            max_retries: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn kind(&self) -> TaskKind {
        self.payload.kind()
    }
}
