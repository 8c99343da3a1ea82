use sqlx::PgPool;
use time::OffsetDateTime;

use crate::db::models::ExamSessionRow;

pub(crate) const COLUMNS: &str = "\
    id, user_id, past_paper_id, started_at, completed_at, duration_seconds, \
    total_possible_score, total_score";

pub(crate) struct CreateSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) paper_id: &'a str,
    pub(crate) started_at: OffsetDateTime,
    pub(crate) total_possible_score: f64,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    session: CreateSession<'_>,
) -> Result<ExamSessionRow, sqlx::Error> {
    sqlx::query_as::<_, ExamSessionRow>(&format!(
        "INSERT INTO exam_sessions (id, user_id, past_paper_id, started_at, total_possible_score, total_score) \
         VALUES ($1, $2, $3, $4, $5, 0) RETURNING {COLUMNS}"
    ))
    .bind(session.id)
    .bind(session.user_id)
    .bind(session.paper_id)
    .bind(session.started_at)
    .bind(session.total_possible_score)
    .fetch_one(executor)
    .await
}

/// Sets the completion columns once. Returns false when the session was missing or already
/// completed.
pub(crate) async fn finalize(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    completed_at: OffsetDateTime,
    duration_seconds: i64,
    total_score: f64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_sessions \
         SET completed_at = $2, duration_seconds = $3, total_score = $4, updated_at = $2 \
         WHERE id = $1 AND completed_at IS NULL",
    )
    .bind(id)
    .bind(completed_at)
    .bind(duration_seconds)
    .bind(total_score)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub(crate) async fn list_completed_by_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<ExamSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, ExamSessionRow>(&format!(
        "SELECT {COLUMNS} FROM exam_sessions \
         WHERE user_id = $1 AND completed_at IS NOT NULL \
         ORDER BY completed_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}
