use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::db::models::ExamSessionRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSession {
    pub id: String,
    pub user_id: String,
    pub paper_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub duration_seconds: Option<u64>,
    pub total_possible_score: f64,
    pub total_score: f64,
}

impl ExamSession {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewExamSession {
    pub user_id: String,
    pub paper_id: String,
    pub started_at: OffsetDateTime,
    pub total_possible_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionCompletion {
    pub completed_at: OffsetDateTime,
    pub duration_seconds: u64,
    pub total_score: f64,
}

impl From<ExamSessionRow> for ExamSession {
    fn from(row: ExamSessionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            paper_id: row.past_paper_id,
            started_at: row.started_at,
            completed_at: row.completed_at,
            duration_seconds: row.duration_seconds.and_then(|value| u64::try_from(value).ok()),
            total_possible_score: row.total_possible_score,
            total_score: row.total_score,
        }
    }
}
