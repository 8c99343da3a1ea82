use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use time::OffsetDateTime;

use crate::core::config::ExamSettings;
use crate::core::time::{format_offset, now_utc};
use crate::errors::ExamError;
use crate::schemas::attempt::AnswerSheet;
use crate::schemas::paper::Paper;
use crate::schemas::question::ExamQuestion;
use crate::schemas::results::{SessionHistoryEntry, SubmissionSummary};
use crate::schemas::session::{ExamSession, NewExamSession};
use crate::services::backend::ExamBackend;
use crate::services::countdown::{format_remaining, CancelToken, Countdown};
use crate::services::grading::Grader;
use crate::services::submission::SubmissionOrchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    Expired,
}

impl SubmitTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmitTrigger::Manual => "manual",
            SubmitTrigger::Expired => "expired",
        }
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Completed(SubmissionSummary),
    /// Another submission already owns this attempt or it is finalized.
    Suppressed,
}

/// One in-progress exam: the persisted session plus the live answer sheet and countdown.
#[derive(Debug)]
pub struct ExamAttempt {
    session: ExamSession,
    paper: Paper,
    questions: Vec<ExamQuestion>,
    answers: Mutex<AnswerSheet>,
    remaining: Arc<AtomicU64>,
    token: CancelToken,
    submitting: AtomicBool,
    completed_at: OnceLock<OffsetDateTime>,
}

impl ExamAttempt {
    pub(crate) fn new(
        session: ExamSession,
        paper: Paper,
        questions: Vec<ExamQuestion>,
        remaining: Arc<AtomicU64>,
        token: CancelToken,
    ) -> Self {
        Self {
            session,
            paper,
            questions,
            answers: Mutex::new(AnswerSheet::new()),
            remaining,
            token,
            submitting: AtomicBool::new(false),
            completed_at: OnceLock::new(),
        }
    }

    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    pub fn paper(&self) -> &Paper {
        &self.paper
    }

    pub fn questions(&self) -> &[ExamQuestion] {
        &self.questions
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn remaining_display(&self) -> String {
        format_remaining(self.remaining_seconds())
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.get().is_some()
    }

    pub fn completed_at(&self) -> Option<OffsetDateTime> {
        self.completed_at.get().copied()
    }

    /// Records or replaces the answer to one question of this exam.
    pub fn record_answer(
        &self,
        question_id: &str,
        answer: impl Into<String>,
    ) -> Result<(), ExamError> {
        if self.is_completed() || self.submitting.load(Ordering::SeqCst) {
            return Err(ExamError::AlreadyFinalized(self.session.id.clone()));
        }
        if !self.questions.iter().any(|question| question.id == question_id) {
            return Err(ExamError::UnknownQuestion(question_id.to_string()));
        }
        self.lock_answers().set(question_id, answer);
        Ok(())
    }

    pub fn answers_snapshot(&self) -> AnswerSheet {
        self.lock_answers().clone()
    }

    fn lock_answers(&self) -> std::sync::MutexGuard<'_, AnswerSheet> {
        self.answers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim_submit(&self) -> bool {
        self.submitting.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }

    fn release_submit(&self) {
        self.submitting.store(false, Ordering::SeqCst);
    }

    pub(crate) fn mark_completed(&self, at: OffsetDateTime) -> bool {
        self.completed_at.set(at).is_ok()
    }
}

/// Starts timed attempts and owns their submission.
#[derive(Clone)]
pub struct ExamSessionManager {
    backend: Arc<dyn ExamBackend>,
    orchestrator: SubmissionOrchestrator,
    settings: ExamSettings,
}

impl ExamSessionManager {
    pub fn new(backend: Arc<dyn ExamBackend>, grader: Arc<Grader>, settings: ExamSettings) -> Self {
        let orchestrator = SubmissionOrchestrator::new(backend.clone(), grader);
        Self { backend, orchestrator, settings }
    }

    pub async fn start_session(&self, paper_id: &str) -> Result<Arc<ExamAttempt>, ExamError> {
        let user_id = self.require_user().await?;

        let paper = self
            .backend
            .fetch_paper(paper_id)
            .await
            .map_err(ExamError::store("Failed to fetch paper"))?
            .ok_or_else(|| ExamError::PaperNotFound(paper_id.to_string()))?;
        if !paper.is_writable {
            return Err(ExamError::PaperNotAttemptable(paper.id));
        }

        let questions = self
            .backend
            .fetch_exam_questions(&paper.id)
            .await
            .map_err(ExamError::store("Failed to fetch exam questions"))?;

        let started_at = now_utc();
        let session = self
            .backend
            .create_session(NewExamSession {
                user_id,
                paper_id: paper.id.clone(),
                started_at,
                total_possible_score: paper.total_score,
            })
            .await
            .map_err(ExamError::store("Failed to create exam session"))?;

        let duration_seconds = paper.duration_seconds();
        let token = CancelToken::new();
        let (countdown, expired) = Countdown::start(duration_seconds, token.clone());
        let attempt = Arc::new(ExamAttempt::new(
            session,
            paper,
            questions,
            countdown.remaining_handle(),
            token,
        ));

        tracing::info!(
            session_id = %attempt.session.id,
            paper_id = %attempt.paper.id,
            questions = attempt.questions.len(),
            duration_seconds,
            started_at = %format_offset(started_at),
            "Exam session started"
        );

        if duration_seconds > 0 {
            self.spawn_countdown(attempt.clone(), countdown, expired);
        }

        Ok(attempt)
    }

    fn spawn_countdown(
        &self,
        attempt: Arc<ExamAttempt>,
        countdown: Countdown,
        mut expired: tokio::sync::oneshot::Receiver<()>,
    ) {
        let manager = self.clone();
        let tick_interval = self.settings.tick_interval();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = countdown.token().cancelled() => break,
                    _ = interval.tick() => {
                        if countdown.tick() == 0 {
                            break;
                        }
                    }
                }
            }

            if expired.try_recv().is_err() {
                return;
            }

            tracing::info!(session_id = %attempt.session.id, "Exam time expired; auto-submitting");
            if let Err(err) = manager.submit(&attempt, SubmitTrigger::Expired).await {
                tracing::warn!(
                    session_id = %attempt.session.id,
                    error = %err,
                    "Auto-submit failed"
                );
            }
        });
    }

    /// Grades, persists and finalizes the attempt. Concurrent calls past the first are
    /// suppressed.
    pub async fn submit(
        &self,
        attempt: &ExamAttempt,
        trigger: SubmitTrigger,
    ) -> Result<SubmitOutcome, ExamError> {
        if attempt.is_completed() || !attempt.claim_submit() {
            tracing::debug!(
                session_id = %attempt.session.id,
                trigger = trigger.as_str(),
                "Submission already in progress or finished"
            );
            return Ok(SubmitOutcome::Suppressed);
        }
        attempt.token.cancel();

        let result = match self.require_user().await {
            Ok(user_id) => self.orchestrator.submit(attempt, &user_id).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(summary) => {
                metrics::counter!(
                    "submissions_total",
                    "trigger" => trigger.as_str(),
                    "status" => "completed"
                )
                .increment(1);
                tracing::info!(
                    session_id = %attempt.session.id,
                    trigger = trigger.as_str(),
                    earned_marks = summary.earned_marks,
                    total_marks = summary.total_marks,
                    elapsed_seconds = summary.elapsed_seconds,
                    "Exam submitted"
                );
                Ok(SubmitOutcome::Completed(summary))
            }
            Err(err) => {
                metrics::counter!(
                    "submissions_total",
                    "trigger" => trigger.as_str(),
                    "status" => "failed"
                )
                .increment(1);
                attempt.release_submit();
                Err(err)
            }
        }
    }

    /// Writes completion time, duration and score. Runs at most once per attempt.
    pub async fn finalize_session(
        &self,
        attempt: &ExamAttempt,
        total_score: f64,
        duration_seconds: u64,
    ) -> Result<(), ExamError> {
        self.orchestrator.finalize(attempt, total_score, duration_seconds).await
    }

    /// Completed sessions of the signed-in user, newest first.
    pub async fn history(&self) -> Result<Vec<SessionHistoryEntry>, ExamError> {
        let user_id = self.require_user().await?;
        let sessions = self
            .backend
            .list_completed_sessions(&user_id)
            .await
            .map_err(ExamError::store("Failed to list exam history"))?;
        Ok(sessions.into_iter().map(SessionHistoryEntry::from).collect())
    }

    async fn require_user(&self) -> Result<String, ExamError> {
        self.backend
            .current_user()
            .await
            .map_err(ExamError::store("Failed to resolve current user"))?
            .ok_or(ExamError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::errors::StoreError;
    use crate::schemas::results::ScoreBand;
    use crate::test_support::{exam_fixture, paper, MemoryBackend, ALWAYS_FAIL};

    fn manager(backend: Arc<MemoryBackend>) -> ExamSessionManager {
        ExamSessionManager::new(backend, Arc::new(Grader::default()), ExamSettings::default())
    }

    #[tokio::test]
    async fn unauthenticated_start_creates_nothing() {
        let backend = Arc::new(exam_fixture().signed_out());
        let err = manager(backend.clone()).start_session("p1").await.expect_err("error");
        assert!(matches!(err, ExamError::Unauthenticated));
        assert_eq!(backend.sessions_created(), 0);
    }

    #[tokio::test]
    async fn unknown_and_closed_papers_are_rejected() {
        let backend = Arc::new(exam_fixture());
        let err = manager(backend.clone()).start_session("missing").await.expect_err("error");
        assert!(matches!(err, ExamError::PaperNotFound(id) if id == "missing"));

        let mut closed = paper("closed", 60);
        closed.is_writable = false;
        let backend = Arc::new(exam_fixture().with_paper(closed));
        let err = manager(backend.clone()).start_session("closed").await.expect_err("error");
        assert!(matches!(err, ExamError::PaperNotAttemptable(_)));
        assert_eq!(backend.sessions_created(), 0);
    }

    #[tokio::test]
    async fn start_snapshots_paper_and_counts_down() {
        let backend = Arc::new(exam_fixture());
        let attempt = manager(backend.clone()).start_session("p1").await.expect("attempt");

        assert_eq!(attempt.session().total_possible_score, 10.0);
        assert_eq!(attempt.remaining_seconds(), 90 * 60);
        assert_eq!(attempt.remaining_display(), "90:00");
        assert_eq!(attempt.questions().len(), 3);
        assert!(!attempt.is_completed());
        attempt.token.cancel();
    }

    #[tokio::test]
    async fn answers_are_validated_and_overwritten() {
        let backend = Arc::new(exam_fixture());
        let attempt = manager(backend).start_session("p1").await.expect("attempt");

        attempt.record_answer("q1", "A").expect("record");
        attempt.record_answer("q1", "B").expect("record");
        assert_eq!(attempt.answers_snapshot().answer_for("q1"), "B");
        assert!(matches!(
            attempt.record_answer("nope", "x"),
            Err(ExamError::UnknownQuestion(_))
        ));
        attempt.token.cancel();
    }

    #[tokio::test]
    async fn manual_submit_grades_every_question() {
        let backend = Arc::new(exam_fixture());
        let manager = manager(backend.clone());
        let attempt = manager.start_session("p1").await.expect("attempt");
        attempt.record_answer("q1", "B").expect("record");

        let outcome = manager.submit(&attempt, SubmitTrigger::Manual).await.expect("submit");
        let SubmitOutcome::Completed(summary) = outcome else {
            panic!("expected a completed submission");
        };

        assert_eq!(summary.results.len(), 3);
        assert_eq!(summary.earned_marks, 2.0);
        assert_eq!(summary.total_marks, 10.0);
        assert!(attempt.is_completed());
        assert!(attempt.token.is_cancelled());
        assert_eq!(backend.finalize_calls(), 1);
        assert!(matches!(
            attempt.record_answer("q2", "late"),
            Err(ExamError::AlreadyFinalized(_))
        ));

        let again = manager.submit(&attempt, SubmitTrigger::Manual).await.expect("submit");
        assert!(matches!(again, SubmitOutcome::Suppressed));
        assert_eq!(backend.finalize_calls(), 1);
    }

    #[tokio::test]
    async fn simultaneous_expiry_and_manual_submit_finalize_once() {
        let backend = Arc::new(exam_fixture().with_grading_delay(Duration::from_millis(20)));
        let manager = manager(backend.clone());
        let attempt = manager.start_session("p1").await.expect("attempt");

        let (manual, expired) = tokio::join!(
            manager.submit(&attempt, SubmitTrigger::Manual),
            manager.submit(&attempt, SubmitTrigger::Expired),
        );
        let completed = [manual.expect("manual"), expired.expect("expired")]
            .into_iter()
            .filter(|outcome| matches!(outcome, SubmitOutcome::Completed(_)))
            .count();

        assert_eq!(completed, 1);
        assert_eq!(backend.finalize_calls(), 1);
        assert_eq!(backend.attempt_batches(), 1);
    }

    #[tokio::test]
    async fn countdown_expiry_auto_submits_once() {
        let backend = Arc::new(exam_fixture().with_paper(paper("short", 1)));
        let manager = ExamSessionManager::new(
            backend.clone(),
            Arc::new(Grader::default()),
            ExamSettings { tick_interval_ms: 1 },
        );
        let attempt = manager.start_session("short").await.expect("attempt");

        tokio::time::timeout(Duration::from_secs(5), async {
            while !attempt.is_completed() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("auto-submit");

        assert_eq!(attempt.remaining_seconds(), 0);
        assert_eq!(backend.finalize_calls(), 1);
        let manual = manager.submit(&attempt, SubmitTrigger::Manual).await.expect("submit");
        assert!(matches!(manual, SubmitOutcome::Suppressed));
    }

    #[tokio::test]
    async fn zero_duration_paper_has_no_countdown() {
        let backend = Arc::new(exam_fixture().with_paper(paper("untimed", 0)));
        let attempt = manager(backend).start_session("untimed").await.expect("attempt");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(attempt.remaining_seconds(), 0);
        assert!(!attempt.is_completed());
        assert!(!attempt.token.is_cancelled());
    }

    #[tokio::test]
    async fn persistence_failure_keeps_session_open_and_retry_succeeds() {
        let backend = Arc::new(exam_fixture().failing_attempt_inserts(1));
        let manager = manager(backend.clone());
        let attempt = manager.start_session("p1").await.expect("attempt");
        attempt.record_answer("q1", "B").expect("record");

        let err = manager.submit(&attempt, SubmitTrigger::Manual).await.expect_err("error");
        assert!(matches!(err, ExamError::Store { source: StoreError::Unavailable(_), .. }));
        assert!(!attempt.is_completed());
        assert_eq!(backend.finalize_calls(), 0);

        let retry = manager.submit(&attempt, SubmitTrigger::Manual).await.expect("retry");
        assert!(matches!(retry, SubmitOutcome::Completed(_)));
        assert_eq!(backend.stored_attempts().len(), 3);
        assert_eq!(backend.finalize_calls(), 1);
    }

    #[tokio::test]
    async fn second_finalize_is_rejected() {
        let backend = Arc::new(exam_fixture());
        let manager = manager(backend.clone());
        let attempt = manager.start_session("p1").await.expect("attempt");
        attempt.token.cancel();

        manager.finalize_session(&attempt, 3.0, 42).await.expect("finalize");
        let err = manager.finalize_session(&attempt, 4.0, 43).await.expect_err("error");
        assert!(matches!(err, ExamError::AlreadyFinalized(_)));
        assert_eq!(backend.finalize_calls(), 1);
    }

    #[tokio::test]
    async fn history_bands_completed_sessions() {
        let backend = Arc::new(exam_fixture());
        let sessions = manager(backend.clone());
        let attempt = sessions.start_session("p1").await.expect("attempt");
        attempt.token.cancel();
        sessions.finalize_session(&attempt, 8.0, 60).await.expect("finalize");

        let history = sessions.history().await.expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].percentage, 80.0);
        assert_eq!(history[0].band, ScoreBand::Strong);
    }

    #[tokio::test]
    async fn history_read_failure_is_a_store_error() {
        let backend = Arc::new(exam_fixture().failing_reads(ALWAYS_FAIL));
        let err = manager(backend).history().await.expect_err("error");
        assert!(matches!(err, ExamError::Store { .. }));
    }
}
