use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, FromRow)]
pub(crate) struct PaperRow {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) subject_id: String,
    pub(crate) grade_level: Option<String>,
    pub(crate) year: String,
    pub(crate) duration: String,
    pub(crate) total_score: f64,
    pub(crate) is_writable: bool,
}

/// Row shape of `get_questions_for_exam`: no answer key columns.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ExamQuestionRow {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: String,
    pub(crate) question_number: i32,
    pub(crate) marks: f64,
    pub(crate) difficulty: Option<String>,
    pub(crate) options: Option<Vec<String>>,
    pub(crate) image_url: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct GradingQuestionRow {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: String,
    pub(crate) question_number: i32,
    pub(crate) marks: f64,
    pub(crate) options: Option<Vec<String>>,
    pub(crate) correct_answer: Vec<String>,
    pub(crate) sample_answer: Option<String>,
    pub(crate) subject_name: Option<String>,
    pub(crate) topic_name: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ExamSessionRow {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) past_paper_id: String,
    pub(crate) started_at: OffsetDateTime,
    pub(crate) completed_at: Option<OffsetDateTime>,
    pub(crate) duration_seconds: Option<i64>,
    pub(crate) total_possible_score: f64,
    pub(crate) total_score: f64,
}
