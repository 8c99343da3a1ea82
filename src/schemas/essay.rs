//! Wire format of the essay grading service and of the JSON the generative fallback is asked
//! to produce. Both share the `score` / `feedback` shapes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EssayKind {
    ShortEssay,
    LongEssay,
}

impl EssayKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EssayKind::ShortEssay => "short_essay",
            EssayKind::LongEssay => "long_essay",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeEssayRequest {
    pub question_type: EssayKind,
    pub question: EssayQuestionPayload,
    pub student_answer: String,
    pub reference_answer: ReferenceAnswerPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct EssayQuestionPayload {
    pub text: String,
    pub max_marks: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    KeyPoints,
    ModelEssay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReferenceContent {
    Points(Vec<String>),
    Text(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceAnswerPayload {
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    pub content: ReferenceContent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradeEssayResponse {
    #[serde(default)]
    pub success: bool,
    pub score: Option<ScorePayload>,
    pub feedback: Option<EssayFeedback>,
    pub error: Option<ErrorPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScorePayload {
    pub total_marks: f64,
    pub max_marks: Option<f64>,
    pub percentage: Option<f64>,
    pub breakdown: Option<ScoreBreakdown>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub content: Option<BreakdownItem>,
    pub structure: Option<BreakdownItem>,
    pub language: Option<BreakdownItem>,
    pub relevance: Option<BreakdownItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownItem {
    pub marks: f64,
    pub max: f64,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EssayFeedback {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorPayload {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
}

/// Error envelope returned by the service on non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: Option<ErrorPayload>,
}
