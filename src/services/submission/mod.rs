//! Turns a finished attempt into graded, persisted results and a finalized session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;

use crate::core::time::{elapsed_seconds, now_utc};
use crate::errors::ExamError;
use crate::schemas::attempt::AttemptResult;
use crate::schemas::question::GradingQuestion;
use crate::schemas::results::SubmissionSummary;
use crate::schemas::session::SessionCompletion;
use crate::services::backend::ExamBackend;
use crate::services::exam_session::ExamAttempt;
use crate::services::grading::{Grade, Grader};


#[derive(Clone)]
pub struct SubmissionOrchestrator {
    backend: Arc<dyn ExamBackend>,
    grader: Arc<Grader>,
}

impl SubmissionOrchestrator {
    pub fn new(backend: Arc<dyn ExamBackend>, grader: Arc<Grader>) -> Self {
        Self { backend, grader }
    }

    /// Grades every question of the attempt, stores the results as one batch and finalizes
    /// the session. Nothing is finalized when the batch write fails.
    pub async fn submit(
        &self,
        attempt: &ExamAttempt,
        user_id: &str,
    ) -> Result<SubmissionSummary, ExamError> {
        let timer = Instant::now();
        let session = attempt.session();
        let elapsed = elapsed_seconds(session.started_at, now_utc());
        let answers = attempt.answers_snapshot();

        let question_ids: Vec<String> =
            attempt.questions().iter().map(|question| question.id.clone()).collect();
        let records = self
            .backend
            .fetch_grading_questions(&question_ids)
            .await
            .map_err(ExamError::store("Failed to fetch questions for grading"))?;
        let records: HashMap<&str, &GradingQuestion> =
            records.iter().map(|record| (record.id.as_str(), record)).collect();

        let grading = attempt.questions().iter().map(|question| {
            let record = records.get(question.id.as_str()).copied();
            let answer = answers.answer_for(&question.id);
            async move {
                let grade = match record {
                    Some(record) => self.grader.grade(record, answer).await,
                    None => {
                        tracing::warn!(
                            session_id = %session.id,
                            question_id = %question.id,
                            "Question record missing at grading time; awarding zero marks"
                        );
                        Grade::missing_record()
                    }
                };
                AttemptResult {
                    user_id: user_id.to_string(),
                    question_id: question.id.clone(),
                    user_answer: answer.to_string(),
                    is_correct: grade.is_correct,
                    marks_awarded: grade.marks_awarded,
                    exam_session_id: Some(session.id.clone()),
                    strategy: grade.strategy,
                }
            }
        });
        let results = join_all(grading).await;

        self.backend
            .insert_attempts(&results)
            .await
            .map_err(ExamError::store("Failed to save exam attempts"))?;

        let earned_marks: f64 = results.iter().map(|result| result.marks_awarded).sum();
        self.finalize(attempt, earned_marks, elapsed).await?;

        metrics::histogram!("submission_duration_seconds").record(timer.elapsed().as_secs_f64());

        Ok(SubmissionSummary {
            paper_id: attempt.paper().id.clone(),
            paper_name: attempt.paper().name.clone(),
            session_id: session.id.clone(),
            total_marks: attempt.questions().iter().map(|question| question.marks).sum(),
            earned_marks,
            elapsed_seconds: elapsed,
            results,
        })
    }

    pub(crate) async fn finalize(
        &self,
        attempt: &ExamAttempt,
        total_score: f64,
        duration_seconds: u64,
    ) -> Result<(), ExamError> {
        let session_id = &attempt.session().id;
        if attempt.is_completed() {
            return Err(ExamError::AlreadyFinalized(session_id.clone()));
        }

        let completed_at = now_utc();
        self.backend
            .finalize_session(
                session_id,
                SessionCompletion { completed_at, duration_seconds, total_score },
            )
            .await
            .map_err(ExamError::store("Failed to finalize exam session"))?;

        if !attempt.mark_completed(completed_at) {
            return Err(ExamError::AlreadyFinalized(session_id.clone()));
        }
        Ok(())
    }
}
