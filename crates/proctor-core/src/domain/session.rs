//! Exam session lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an exam session.
///
/// `COMPLETED` and `TERMINATED` are absorbing; no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    /// Ended by the operator.
    Completed,
    /// Ended by the decision engine.
    Terminated,
}

impl SessionStatus {
    /// Whether the session is in a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Terminated)
    }

    /// Whether the session is actively being monitored.
    pub fn is_active(self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NOT_STARTED"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Terminated => write!(f, "TERMINATED"),
        }
    }
}

/// Operator-supplied parameters for a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamConfig {
    pub exam_name: String,
    pub candidate_id: String,
    pub duration_minutes: u32,
}

/// A single monitored exam session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSession {
    /// Unique identifier for this session.
    pub id: Uuid,
    pub exam_name: String,
    pub candidate_id: String,
    pub duration_minutes: u32,
    pub status: SessionStatus,
    /// Set on transition into `IN_PROGRESS`.
    pub start_time: Option<DateTime<Utc>>,
    /// Set on transition out of `IN_PROGRESS`.
    pub end_time: Option<DateTime<Utc>>,
}

impl ExamSession {
    /// Create a session already in progress, started at `now`.
    pub fn start(config: ExamConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            exam_name: config.exam_name,
            candidate_id: config.candidate_id,
            duration_minutes: config.duration_minutes,
            status: SessionStatus::InProgress,
            start_time: Some(now),
            end_time: None,
        }
    }
}
