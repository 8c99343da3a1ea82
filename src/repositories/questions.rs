use sqlx::PgPool;

use crate::db::models::{ExamQuestionRow, GradingQuestionRow};

const GRADING_COLUMNS: &str = "\
    q.id, q.question_text, q.question_type, q.question_number, q.marks, q.options, \
    q.correct_answer, q.sample_answer, s.name AS subject_name, t.name AS topic_name";

/// Exam-mode read through the stored procedure, which never returns answer keys.
pub(crate) async fn list_for_exam(
    pool: &PgPool,
    paper_id: &str,
) -> Result<Vec<ExamQuestionRow>, sqlx::Error> {
    sqlx::query_as::<_, ExamQuestionRow>(
        "SELECT id, question_text, question_type, question_number, marks, difficulty, options, image_url
         FROM get_questions_for_exam($1)",
    )
    .bind(paper_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_with_answers(
    pool: &PgPool,
    ids: &[String],
) -> Result<Vec<GradingQuestionRow>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, GradingQuestionRow>(&format!(
        "SELECT {GRADING_COLUMNS}
         FROM questions q
         LEFT JOIN subjects s ON s.id = q.subject_id
         LEFT JOIN topics t ON t.id = q.topic_id
         WHERE q.id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_topic(
    pool: &PgPool,
    topic_id: &str,
) -> Result<Vec<GradingQuestionRow>, sqlx::Error> {
    sqlx::query_as::<_, GradingQuestionRow>(&format!(
        "SELECT {GRADING_COLUMNS}
         FROM questions q
         LEFT JOIN subjects s ON s.id = q.subject_id
         LEFT JOIN topics t ON t.id = q.topic_id
         WHERE q.topic_id = $1
         ORDER BY q.question_number"
    ))
    .bind(topic_id)
    .fetch_all(pool)
    .await
}
