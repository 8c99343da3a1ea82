use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::backend::{ExamBackend, PgExamBackend};
use crate::services::exam_session::ExamSessionManager;
use crate::services::grading::Grader;
use crate::services::topic_practice::TopicPractice;

/// Process-wide handles. Per-user services are built on demand from these.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    grader: Arc<Grader>,
}

impl AppState {
    pub fn new(settings: Settings, db: PgPool, grader: Grader) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, grader: Arc::new(grader) }) }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub fn grader(&self) -> &Arc<Grader> {
        &self.inner.grader
    }

    /// Session manager acting on behalf of `user_id` (`None` for anonymous callers).
    pub fn exam_sessions(&self, user_id: Option<String>) -> ExamSessionManager {
        ExamSessionManager::new(
            self.backend(user_id),
            self.inner.grader.clone(),
            self.inner.settings.exam().clone(),
        )
    }

    pub fn topic_practice(&self, user_id: Option<String>) -> TopicPractice {
        TopicPractice::new(self.backend(user_id), self.inner.grader.clone())
    }

    fn backend(&self, user_id: Option<String>) -> Arc<dyn ExamBackend> {
        Arc::new(PgExamBackend::new(self.inner.db.clone(), user_id))
    }
}
