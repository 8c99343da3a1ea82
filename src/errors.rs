use thiserror::Error;

/// Failures of the storage/auth backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid {entity} record {id}: {reason}")]
    InvalidRecord { entity: &'static str, id: String, reason: String },
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced to the caller of the attempt lifecycle.
///
/// Grading problems never show up here: they are absorbed per question and replaced by the
/// local fallback grade.
#[derive(Debug, Error)]
pub enum ExamError {
    #[error("user is not authenticated")]
    Unauthenticated,
    #[error("paper {0} not found")]
    PaperNotFound(String),
    #[error("paper {0} is not open for attempts")]
    PaperNotAttemptable(String),
    #[error("question {0} is not part of this exam")]
    UnknownQuestion(String),
    #[error("topic {0} has no questions")]
    NoQuestions(String),
    #[error("answer must not be empty")]
    EmptyAnswer,
    #[error("exam session {0} is already finalized")]
    AlreadyFinalized(String),
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ExamError {
    pub(crate) fn store(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| {
            tracing::error!(error = %source, "{context}");
            Self::Store { context, source }
        }
    }
}
