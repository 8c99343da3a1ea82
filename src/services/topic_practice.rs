use std::sync::Arc;

use crate::errors::ExamError;
use crate::schemas::attempt::AttemptResult;
use crate::schemas::question::GradingQuestion;
use crate::schemas::results::PracticeResult;
use crate::services::backend::ExamBackend;
use crate::services::grading::Grader;

/// Untimed practice over a topic's questions. Answers are graded locally and never touch an
/// exam session.
#[derive(Clone)]
pub struct TopicPractice {
    backend: Arc<dyn ExamBackend>,
    grader: Arc<Grader>,
}

impl TopicPractice {
    pub fn new(backend: Arc<dyn ExamBackend>, grader: Arc<Grader>) -> Self {
        Self { backend, grader }
    }

    pub async fn load_questions(&self, topic_id: &str) -> Result<Vec<GradingQuestion>, ExamError> {
        let mut questions = self
            .backend
            .fetch_topic_questions(topic_id)
            .await
            .map_err(ExamError::store("Failed to fetch topic questions"))?;
        if questions.is_empty() {
            return Err(ExamError::NoQuestions(topic_id.to_string()));
        }
        questions.sort_by_key(|question| question.question_number);
        Ok(questions)
    }

    /// Grades one answer. The attempt is stored only for signed-in users.
    pub async fn submit_answer(
        &self,
        question: &GradingQuestion,
        answer: &str,
    ) -> Result<PracticeResult, ExamError> {
        if answer.trim().is_empty() {
            return Err(ExamError::EmptyAnswer);
        }

        let grade = self.grader.grade_practice(question, answer);
        let user_id = self
            .backend
            .current_user()
            .await
            .map_err(ExamError::store("Failed to resolve current user"))?;

        match user_id {
            Some(user_id) => {
                let attempt = AttemptResult {
                    user_id,
                    question_id: question.id.clone(),
                    user_answer: answer.to_string(),
                    is_correct: grade.is_correct,
                    marks_awarded: grade.marks_awarded,
                    exam_session_id: None,
                    strategy: grade.strategy,
                };
                self.backend
                    .insert_attempts(std::slice::from_ref(&attempt))
                    .await
                    .map_err(ExamError::store("Failed to save practice attempt"))?;
            }
            None => {
                tracing::debug!(question_id = %question.id, "Anonymous practice answer not stored");
            }
        }

        Ok(PracticeResult {
            question_id: question.id.clone(),
            user_answer: answer.to_string(),
            is_correct: grade.is_correct,
            marks_awarded: grade.marks_awarded,
            max_marks: question.marks,
        })
    }
}
