//! Storage and identity seam used by the attempt lifecycle.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::models::GradingQuestionRow;
use crate::errors::StoreError;
use crate::repositories::{attempts, papers, questions, sessions};
use crate::schemas::attempt::AttemptResult;
use crate::schemas::paper::Paper;
use crate::schemas::question::{ExamQuestion, GradingQuestion};
use crate::schemas::session::{ExamSession, NewExamSession, SessionCompletion};

#[async_trait]
pub trait ExamBackend: Send + Sync {
    /// Id of the signed-in user, if any.
    async fn current_user(&self) -> Result<Option<String>, StoreError>;

    async fn fetch_paper(&self, paper_id: &str) -> Result<Option<Paper>, StoreError>;

    /// Questions of a paper without their answer keys, ordered by question number.
    async fn fetch_exam_questions(&self, paper_id: &str) -> Result<Vec<ExamQuestion>, StoreError>;

    /// Full records including answer keys. Unknown ids and invalid records are skipped.
    async fn fetch_grading_questions(
        &self,
        question_ids: &[String],
    ) -> Result<Vec<GradingQuestion>, StoreError>;

    async fn fetch_topic_questions(&self, topic_id: &str)
        -> Result<Vec<GradingQuestion>, StoreError>;

    async fn create_session(&self, session: NewExamSession) -> Result<ExamSession, StoreError>;

    async fn finalize_session(
        &self,
        session_id: &str,
        completion: SessionCompletion,
    ) -> Result<(), StoreError>;

    /// Persists the whole batch or nothing.
    async fn insert_attempts(&self, attempts: &[AttemptResult]) -> Result<(), StoreError>;

    async fn list_completed_sessions(&self, user_id: &str)
        -> Result<Vec<ExamSession>, StoreError>;
}

/// Converts full question rows, dropping the ones that fail validation. A dropped question is
/// graded as a missing record instead of failing the whole batch.
pub(crate) fn usable_grading_records(rows: Vec<GradingQuestionRow>) -> Vec<GradingQuestion> {
    rows.into_iter().filter_map(|row| GradingQuestion::try_from(row).ok()).collect()
}

/// Postgres-backed implementation. The user id comes from whatever authenticated the caller.
#[derive(Debug, Clone)]
pub struct PgExamBackend {
    pool: PgPool,
    user_id: Option<String>,
}

impl PgExamBackend {
    pub fn new(pool: PgPool, user_id: Option<String>) -> Self {
        Self { pool, user_id }
    }
}

#[async_trait]
impl ExamBackend for PgExamBackend {
    async fn current_user(&self) -> Result<Option<String>, StoreError> {
        Ok(self.user_id.clone())
    }

    async fn fetch_paper(&self, paper_id: &str) -> Result<Option<Paper>, StoreError> {
        papers::find_by_id(&self.pool, paper_id).await?.map(Paper::try_from).transpose()
    }

    async fn fetch_exam_questions(&self, paper_id: &str) -> Result<Vec<ExamQuestion>, StoreError> {
        questions::list_for_exam(&self.pool, paper_id)
            .await?
            .into_iter()
            .map(ExamQuestion::try_from)
            .collect()
    }

    async fn fetch_grading_questions(
        &self,
        question_ids: &[String],
    ) -> Result<Vec<GradingQuestion>, StoreError> {
        let rows = questions::list_with_answers(&self.pool, question_ids).await?;
        Ok(usable_grading_records(rows))
    }

    async fn fetch_topic_questions(
        &self,
        topic_id: &str,
    ) -> Result<Vec<GradingQuestion>, StoreError> {
        let rows = questions::list_by_topic(&self.pool, topic_id).await?;
        Ok(usable_grading_records(rows))
    }

    async fn create_session(&self, session: NewExamSession) -> Result<ExamSession, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let row = sessions::create(
            &self.pool,
            sessions::CreateSession {
                id: &id,
                user_id: &session.user_id,
                paper_id: &session.paper_id,
                started_at: session.started_at,
                total_possible_score: session.total_possible_score,
            },
        )
        .await?;
        Ok(ExamSession::from(row))
    }

    async fn finalize_session(
        &self,
        session_id: &str,
        completion: SessionCompletion,
    ) -> Result<(), StoreError> {
        let duration_seconds = i64::try_from(completion.duration_seconds).unwrap_or(i64::MAX);
        let updated = sessions::finalize(
            &self.pool,
            session_id,
            completion.completed_at,
            duration_seconds,
            completion.total_score,
        )
        .await?;

        if !updated {
            return Err(StoreError::InvalidRecord {
                entity: "exam_session",
                id: session_id.to_string(),
                reason: "missing or already completed".to_string(),
            });
        }
        Ok(())
    }

    async fn insert_attempts(&self, attempts: &[AttemptResult]) -> Result<(), StoreError> {
        attempts::insert_batch(&self.pool, attempts).await?;
        Ok(())
    }

    async fn list_completed_sessions(
        &self,
        user_id: &str,
    ) -> Result<Vec<ExamSession>, StoreError> {
        Ok(sessions::list_completed_by_user(&self.pool, user_id)
            .await?
            .into_iter()
            .map(ExamSession::from)
            .collect())
    }
}
