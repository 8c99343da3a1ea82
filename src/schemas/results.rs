use serde::{Deserialize, Serialize};

use crate::schemas::attempt::AttemptResult;
use crate::schemas::session::ExamSession;

const PASS_PERCENTAGE: f64 = 50.0;
const STRONG_PERCENTAGE: f64 = 70.0;

/// Handed to the results view once a submission has been graded, persisted and finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionSummary {
    pub paper_id: String,
    pub paper_name: String,
    pub session_id: String,
    pub results: Vec<AttemptResult>,
    pub earned_marks: f64,
    pub total_marks: f64,
    pub elapsed_seconds: u64,
}

impl SubmissionSummary {
    /// Whole-number percentage, as shown on the completion screen.
    pub fn percentage(&self) -> u32 {
        if self.total_marks <= 0.0 {
            return 0;
        }
        (self.earned_marks / self.total_marks * 100.0).round().max(0.0) as u32
    }

    pub fn passed(&self) -> bool {
        f64::from(self.percentage()) >= PASS_PERCENTAGE
    }

    pub fn incorrect_question_ids(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|result| !result.is_correct)
            .map(|result| result.question_id.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    NeedsWork,
    Fair,
    Strong,
}

impl ScoreBand {
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage < PASS_PERCENTAGE {
            ScoreBand::NeedsWork
        } else if percentage >= STRONG_PERCENTAGE {
            ScoreBand::Strong
        } else {
            ScoreBand::Fair
        }
    }
}

/// One completed exam in the user's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHistoryEntry {
    pub session: ExamSession,
    pub percentage: f64,
    pub band: ScoreBand,
}

impl From<ExamSession> for SessionHistoryEntry {
    fn from(session: ExamSession) -> Self {
        let percentage = if session.total_possible_score > 0.0 {
            session.total_score / session.total_possible_score * 100.0
        } else {
            0.0
        };
        Self { band: ScoreBand::for_percentage(percentage), percentage, session }
    }
}

/// Outcome of a single topic-practice answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeResult {
    pub question_id: String,
    pub user_answer: String,
    pub is_correct: bool,
    pub marks_awarded: f64,
    pub max_marks: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PracticeSummary {
    pub correct_answers: usize,
    pub marks_earned: f64,
    pub marks_possible: f64,
}

impl PracticeSummary {
    pub fn from_results(results: &[PracticeResult]) -> Self {
        Self {
            correct_answers: results.iter().filter(|result| result.is_correct).count(),
            marks_earned: results.iter().map(|result| result.marks_awarded).sum(),
            marks_possible: results.iter().map(|result| result.max_marks).sum(),
        }
    }
}
