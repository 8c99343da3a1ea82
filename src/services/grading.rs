use serde::{Deserialize, Serialize};

use crate::core::config::Settings;
use crate::schemas::question::{GradingQuestion, QuestionType};
use crate::services::essay_grading::{EssayGradingClient, EssayRequest};

const PARTIAL_CREDIT: f64 = 0.5;
const PRACTICE_CORRECT_RATIO: f64 = 0.7;
const EXTERNAL_PASS_PERCENTAGE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingStrategy {
    ExactMatch,
    ExternalEssay,
    LocalKeyword,
    /// Keyword match after the external grader failed for this question.
    LocalFallback,
    /// No usable answer key was available, so nothing was graded.
    Ungraded,
}

impl GradingStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            GradingStrategy::ExactMatch => "exact_match",
            GradingStrategy::ExternalEssay => "external_essay",
            GradingStrategy::LocalKeyword => "local_keyword",
            GradingStrategy::LocalFallback => "local_fallback",
            GradingStrategy::Ungraded => "ungraded",
        }
    }
}

/// First-choice strategy for a question type.
pub fn select_strategy(question_type: QuestionType, external_configured: bool) -> GradingStrategy {
    match question_type {
        QuestionType::MultipleChoice => GradingStrategy::ExactMatch,
        _ if external_configured => GradingStrategy::ExternalEssay,
        _ => GradingStrategy::LocalKeyword,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grade {
    pub is_correct: bool,
    pub marks_awarded: f64,
    pub strategy: GradingStrategy,
}

impl Grade {
    fn new(
        is_correct: bool,
        marks_awarded: f64,
        max_marks: f64,
        strategy: GradingStrategy,
    ) -> Self {
        let max_marks = max_marks.max(0.0);
        let marks_awarded =
            if marks_awarded.is_finite() { marks_awarded.clamp(0.0, max_marks) } else { 0.0 };
        Self { is_correct, marks_awarded, strategy }
    }

    /// Zero-mark grade for a question whose full record could not be loaded.
    pub fn missing_record() -> Self {
        Self { is_correct: false, marks_awarded: 0.0, strategy: GradingStrategy::Ungraded }
    }
}

/// Picks and runs the grading strategy per question. External failures never escape: they are
/// replaced by the local keyword fallback for that question only.
#[derive(Debug, Clone, Default)]
pub struct Grader {
    essay: Option<EssayGradingClient>,
}

impl Grader {
    pub fn new(essay: Option<EssayGradingClient>) -> Self {
        Self { essay }
    }

    /// External grading is enabled when either a grading endpoint or a generative key is set.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let configured =
            settings.grading().api_url.is_some() || settings.generative().is_configured();
        if !configured {
            tracing::info!("No essay grading service configured; using local keyword matching");
            return Ok(Self::default());
        }

        let client = EssayGradingClient::from_settings(settings.grading(), settings.generative())?;
        Ok(Self::new(Some(client)))
    }

    pub fn external_configured(&self) -> bool {
        self.essay.is_some()
    }

    pub fn essay_client(&self) -> Option<&EssayGradingClient> {
        self.essay.as_ref()
    }

    /// Exam-mode grading of one answer.
    pub async fn grade(&self, question: &GradingQuestion, answer: &str) -> Grade {
        let strategy = select_strategy(question.question_type, self.external_configured());
        let grade = match (strategy, &self.essay) {
            (GradingStrategy::ExactMatch, _) => exact_match(question, answer),
            (GradingStrategy::ExternalEssay, Some(client)) => {
                self.grade_external(client, question, answer).await
            }
            _ => keyword_match(question, answer, 1.0, GradingStrategy::LocalKeyword),
        };

        metrics::counter!(
            "grading_outcomes_total",
            "strategy" => grade.strategy.as_str(),
            "status" => if grade.is_correct { "correct" } else { "incorrect" }
        )
        .increment(1);
        grade
    }

    /// Practice-mode grading: MCQ exact match, otherwise the key-word ratio heuristic.
    pub fn grade_practice(&self, question: &GradingQuestion, answer: &str) -> Grade {
        match question.question_type {
            QuestionType::MultipleChoice => exact_match(question, answer),
            _ => keyword_ratio(question, answer),
        }
    }

    async fn grade_external(
        &self,
        client: &EssayGradingClient,
        question: &GradingQuestion,
        answer: &str,
    ) -> Grade {
        let request = EssayRequest::for_question(question, answer);
        match client.grade_essay(&request).await {
            Ok(grade) => Grade::new(
                grade.percentage >= EXTERNAL_PASS_PERCENTAGE,
                grade.total_marks,
                question.marks,
                GradingStrategy::ExternalEssay,
            ),
            Err(failure) => {
                tracing::warn!(
                    question_id = %question.id,
                    code = %failure.code,
                    error = %failure.message,
                    "Essay grading failed; falling back to keyword matching"
                );
                keyword_match(question, answer, PARTIAL_CREDIT, GradingStrategy::LocalFallback)
            }
        }
    }
}

fn exact_match(question: &GradingQuestion, answer: &str) -> Grade {
    let is_correct = question.correct_answer.iter().any(|accepted| accepted == answer);
    let marks = if is_correct { question.marks } else { 0.0 };
    Grade::new(is_correct, marks, question.marks, GradingStrategy::ExactMatch)
}

/// Correct when the answer contains any accepted answer, case-insensitively. A match earns
/// `credit * marks`.
fn keyword_match(
    question: &GradingQuestion,
    answer: &str,
    credit: f64,
    strategy: GradingStrategy,
) -> Grade {
    let answer = answer.trim().to_lowercase();
    let is_correct = question.correct_answer.iter().any(|accepted| {
        let accepted = accepted.trim().to_lowercase();
        !accepted.is_empty() && answer.contains(accepted.as_str())
    });
    let marks = if is_correct { question.marks * credit } else { 0.0 };
    Grade::new(is_correct, marks, question.marks, strategy)
}

fn keyword_ratio(question: &GradingQuestion, answer: &str) -> Grade {
    let answer = answer.to_lowercase();
    let reference =
        question.correct_answer.first().map(|value| value.to_lowercase()).unwrap_or_default();
    let keywords: Vec<&str> =
        reference.split(' ').filter(|word| word.chars().count() > 3).collect();

    let ratio = if keywords.is_empty() {
        0.0
    } else {
        let matched = keywords.iter().filter(|word| answer.contains(*word)).count();
        matched as f64 / keywords.len() as f64
    };

    Grade::new(
        ratio >= PRACTICE_CORRECT_RATIO,
        question.marks * ratio,
        question.marks,
        GradingStrategy::LocalKeyword,
    )
}
