use sqlx::PgPool;

use crate::schemas::attempt::AttemptResult;

/// Writes every attempt in one transaction. Exam attempts replace any earlier row for the same
/// session and question, so a retried submission does not duplicate.
pub(crate) async fn insert_batch(
    pool: &PgPool,
    attempts: &[AttemptResult],
) -> Result<(), sqlx::Error> {
    if attempts.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for attempt in attempts {
        let id = uuid::Uuid::new_v4().to_string();
        match attempt.exam_session_id.as_deref() {
            Some(session_id) => {
                sqlx::query(
                    "INSERT INTO user_attempts \
                     (id, user_id, question_id, user_answer, is_correct, marks_awarded, exam_session_id) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) \
                     ON CONFLICT (exam_session_id, question_id) WHERE exam_session_id IS NOT NULL \
                     DO UPDATE SET user_answer = EXCLUDED.user_answer, \
                                   is_correct = EXCLUDED.is_correct, \
                                   marks_awarded = EXCLUDED.marks_awarded, \
                                   attempted_at = now()",
                )
                .bind(&id)
                .bind(&attempt.user_id)
                .bind(&attempt.question_id)
                .bind(&attempt.user_answer)
                .bind(attempt.is_correct)
                .bind(attempt.marks_awarded)
                .bind(session_id)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO user_attempts \
                     (id, user_id, question_id, user_answer, is_correct, marks_awarded) \
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(&id)
                .bind(&attempt.user_id)
                .bind(&attempt.question_id)
                .bind(&attempt.user_answer)
                .bind(attempt.is_correct)
                .bind(attempt.marks_awarded)
                .execute(&mut *tx)
                .await?;
            }
        }
    }
    tx.commit().await?;
    Ok(())
}
