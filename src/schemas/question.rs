use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{ExamQuestionRow, GradingQuestionRow};
use crate::errors::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "MCQ")]
    MultipleChoice,
    ShortAnswer,
    Essay,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "MCQ",
            QuestionType::ShortAnswer => "ShortAnswer",
            QuestionType::Essay => "Essay",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MCQ" => Some(QuestionType::MultipleChoice),
            "ShortAnswer" => Some(QuestionType::ShortAnswer),
            "Essay" => Some(QuestionType::Essay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "Easy" => Some(Difficulty::Easy),
            "Medium" => Some(Difficulty::Medium),
            "Hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// A question as delivered during an exam: the answer key is never part of this shape.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExamQuestion {
    pub id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub question_number: i32,
    #[validate(range(min = 0.0, message = "marks must be non-negative"))]
    pub marks: f64,
    pub difficulty: Option<Difficulty>,
    pub options: Option<Vec<String>>,
    pub image_url: Option<String>,
}

/// Full question record with the answer key, fetched only after submission or in practice mode.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GradingQuestion {
    pub id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub question_number: i32,
    #[validate(range(min = 0.0, message = "marks must be non-negative"))]
    pub marks: f64,
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1, message = "correct_answer must not be empty"))]
    pub correct_answer: Vec<String>,
    pub sample_answer: Option<String>,
    pub subject_name: Option<String>,
    pub topic_name: Option<String>,
}

impl TryFrom<ExamQuestionRow> for ExamQuestion {
    type Error = StoreError;

    fn try_from(row: ExamQuestionRow) -> Result<Self, Self::Error> {
        let question_type = parse_question_type(&row.id, &row.question_type)?;
        let question = Self {
            question_type,
            question_text: row.question_text,
            question_number: row.question_number,
            marks: row.marks,
            difficulty: row.difficulty.as_deref().and_then(Difficulty::parse),
            options: row.options,
            image_url: row.image_url,
            id: row.id,
        };
        question.validate().map_err(|err| invalid(&question.id, err.to_string()))?;
        check_marks_finite(&question.id, question.marks)?;
        check_options(&question.id, question.question_type, question.options.as_deref())?;
        Ok(question)
    }
}

impl TryFrom<GradingQuestionRow> for GradingQuestion {
    type Error = StoreError;

    fn try_from(row: GradingQuestionRow) -> Result<Self, Self::Error> {
        let question_type = parse_question_type(&row.id, &row.question_type)?;
        let question = Self {
            question_type,
            question_text: row.question_text,
            question_number: row.question_number,
            marks: row.marks,
            options: row.options,
            correct_answer: row.correct_answer,
            sample_answer: row.sample_answer.filter(|answer| !answer.trim().is_empty()),
            subject_name: row.subject_name,
            topic_name: row.topic_name,
            id: row.id,
        };
        question.validate().map_err(|err| invalid(&question.id, err.to_string()))?;
        check_marks_finite(&question.id, question.marks)?;
        check_options(&question.id, question.question_type, question.options.as_deref())?;
        Ok(question)
    }
}

fn parse_question_type(id: &str, value: &str) -> Result<QuestionType, StoreError> {
    QuestionType::parse(value)
        .ok_or_else(|| invalid(id, format!("unknown question_type {value:?}")))
}

fn check_marks_finite(id: &str, marks: f64) -> Result<(), StoreError> {
    if marks.is_finite() {
        return Ok(());
    }
    Err(invalid(id, "marks must be a finite number".to_string()))
}

fn check_options(
    id: &str,
    question_type: QuestionType,
    options: Option<&[String]>,
) -> Result<(), StoreError> {
    if question_type != QuestionType::MultipleChoice {
        return Ok(());
    }
    match options {
        Some(options) if !options.is_empty() => Ok(()),
        _ => Err(invalid(id, "multiple-choice question requires options".to_string())),
    }
}

fn invalid(id: &str, reason: String) -> StoreError {
    tracing::warn!(question_id = id, reason = %reason, "Rejected question record");
    StoreError::InvalidRecord { entity: "question", id: id.to_string(), reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grading_row() -> GradingQuestionRow {
        GradingQuestionRow {
            id: "q1".to_string(),
            question_text: "Name the capital of Zambia".to_string(),
            question_type: "ShortAnswer".to_string(),
            question_number: 1,
            marks: 2.0,
            options: None,
            correct_answer: vec!["Lusaka".to_string()],
            sample_answer: Some("  ".to_string()),
            subject_name: Some("Geography".to_string()),
            topic_name: None,
        }
    }

    #[test]
    fn question_type_wire_names() {
        assert_eq!(QuestionType::parse("MCQ"), Some(QuestionType::MultipleChoice));
        assert_eq!(QuestionType::parse("Multiple Choice"), None);
        assert_eq!(QuestionType::Essay.as_str(), "Essay");
        let encoded = serde_json::to_string(&QuestionType::MultipleChoice).unwrap();
        assert_eq!(encoded, "\"MCQ\"");
    }

    #[test]
    fn grading_row_converts_and_drops_blank_sample() {
        let question = GradingQuestion::try_from(grading_row()).expect("valid row");
        assert_eq!(question.question_type, QuestionType::ShortAnswer);
        assert!(question.sample_answer.is_none());
    }

    #[test]
    fn grading_row_rejects_empty_answer_key() {
        let mut row = grading_row();
        row.correct_answer.clear();
        assert!(matches!(
            GradingQuestion::try_from(row),
            Err(StoreError::InvalidRecord { entity: "question", .. })
        ));
    }

    #[test]
    fn grading_row_rejects_negative_or_nan_marks() {
        let mut row = grading_row();
        row.marks = -1.0;
        assert!(GradingQuestion::try_from(row).is_err());

        let mut row = grading_row();
        row.marks = f64::NAN;
        assert!(GradingQuestion::try_from(row).is_err());
    }

    #[test]
    fn multiple_choice_requires_options() {
        let mut row = grading_row();
        row.question_type = "MCQ".to_string();
        assert!(GradingQuestion::try_from(row.clone()).is_err());

        row.options = Some(vec!["A".to_string(), "B".to_string()]);
        assert!(GradingQuestion::try_from(row).is_ok());
    }

    #[test]
    fn exam_row_rejects_unknown_type() {
        let row = ExamQuestionRow {
            id: "q9".to_string(),
            question_text: "?".to_string(),
            question_type: "TrueFalse".to_string(),
            question_number: 9,
            marks: 1.0,
            difficulty: Some("Hard".to_string()),
            options: None,
            image_url: None,
        };
        assert!(ExamQuestion::try_from(row).is_err());
    }
}
