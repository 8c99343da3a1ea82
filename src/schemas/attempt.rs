use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::services::grading::GradingStrategy;

/// How one question was graded within one submission. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub user_id: String,
    pub question_id: String,
    pub user_answer: String,
    pub is_correct: bool,
    pub marks_awarded: f64,
    pub exam_session_id: Option<String>,
    pub strategy: GradingStrategy,
}

/// Student answers keyed by question id. Last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    answers: HashMap<String, String>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, question_id: impl Into<String>, answer: impl Into<String>) {
        self.answers.insert(question_id.into(), answer.into());
    }

    /// The recorded answer, or an empty string for unanswered questions.
    pub fn answer_for(&self, question_id: &str) -> &str {
        self.answers.get(question_id).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins_and_missing_is_empty() {
        let mut sheet = AnswerSheet::new();
        sheet.set("q1", "A");
        sheet.set("q1", "C");
        assert_eq!(sheet.answer_for("q1"), "C");
        assert_eq!(sheet.answer_for("q2"), "");
        assert_eq!(sheet.len(), 1);
    }
}
