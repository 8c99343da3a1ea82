use sqlx::PgPool;

use crate::db::models::PaperRow;

pub(crate) const COLUMNS: &str =
    "id, name, subject_id, grade_level, year, duration, total_score, is_writable";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<PaperRow>, sqlx::Error> {
    sqlx::query_as::<_, PaperRow>(&format!("SELECT {COLUMNS} FROM past_papers WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}
