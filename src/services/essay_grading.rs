use std::borrow::Cow;
use std::fmt;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::{GenerativeSettings, GradingSettings};
use crate::schemas::essay::{
    EssayFeedback, EssayKind, EssayQuestionPayload, ErrorEnvelope, GradeEssayRequest,
    GradeEssayResponse, ReferenceAnswerPayload, ReferenceContent, ReferenceKind, ScoreBreakdown,
};
use crate::schemas::question::{GradingQuestion, QuestionType};

const SHORT_ESSAY_MAX_MARKS: f64 = 10.0;

const GENERATIVE_SYSTEM_PROMPT: &str = "You are an experienced exam marker for the Zambian school curriculum. \
You must grade the student's answer fairly and consistently using the marking guide provided. \
Return ONLY valid JSON with this shape (no extra text, no markdown):
{
  \"score\": {
    \"total_marks\": number,
    \"max_marks\": number,
    \"percentage\": number,
    \"breakdown\"?: {
      \"content\"?: { \"marks\": number, \"max\": number, \"feedback\": string },
      \"structure\"?: { \"marks\": number, \"max\": number, \"feedback\": string },
      \"language\"?: { \"marks\": number, \"max\": number, \"feedback\": string },
      \"relevance\"?: { \"marks\": number, \"max\": number, \"feedback\": string }
    }
  },
  \"feedback\"?: {
    \"summary\": string,
    \"strengths\"?: string[],
    \"improvements\"?: string[]
  }
}";

/// Marking guide handed to the grader: a list of key points or a model answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceAnswer {
    Points(Vec<String>),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct EssayRequest {
    pub question_text: String,
    pub question_type: QuestionType,
    pub max_marks: f64,
    pub student_answer: String,
    pub reference: ReferenceAnswer,
    pub subject: Option<String>,
    pub topic: Option<String>,
}

impl EssayRequest {
    /// Uses the sample answer as the marking guide when present, the accepted answers otherwise.
    pub fn for_question(question: &GradingQuestion, student_answer: &str) -> Self {
        let reference = match &question.sample_answer {
            Some(sample) => ReferenceAnswer::Text(sample.clone()),
            None => ReferenceAnswer::Points(question.correct_answer.clone()),
        };
        Self {
            question_text: question.question_text.clone(),
            question_type: question.question_type,
            max_marks: question.marks,
            student_answer: student_answer.to_string(),
            reference,
            subject: question.subject_name.clone(),
            topic: question.topic_name.clone(),
        }
    }

    pub fn essay_kind(&self) -> EssayKind {
        let short = self.question_type == QuestionType::ShortAnswer
            || self.max_marks <= SHORT_ESSAY_MAX_MARKS;
        if short {
            EssayKind::ShortEssay
        } else {
            EssayKind::LongEssay
        }
    }

    fn reference_payload(&self) -> ReferenceAnswerPayload {
        match self.essay_kind() {
            EssayKind::ShortEssay => ReferenceAnswerPayload {
                kind: ReferenceKind::KeyPoints,
                content: match &self.reference {
                    ReferenceAnswer::Points(points) => ReferenceContent::Points(points.clone()),
                    ReferenceAnswer::Text(text) => ReferenceContent::Points(vec![text.clone()]),
                },
            },
            EssayKind::LongEssay => ReferenceAnswerPayload {
                kind: ReferenceKind::ModelEssay,
                content: match &self.reference {
                    ReferenceAnswer::Points(points) => ReferenceContent::Points(points.clone()),
                    ReferenceAnswer::Text(text) => ReferenceContent::Text(text.clone()),
                },
            },
        }
    }

    fn to_payload(&self) -> GradeEssayRequest {
        GradeEssayRequest {
            question_type: self.essay_kind(),
            question: EssayQuestionPayload {
                text: self.question_text.clone(),
                max_marks: self.max_marks,
                subject: self.subject.clone(),
                topic: self.topic.clone(),
            },
            student_answer: self.student_answer.clone(),
            reference_answer: self.reference_payload(),
        }
    }

    fn reference_text(&self) -> String {
        match &self.reference {
            ReferenceAnswer::Points(points) => points.join("\n- "),
            ReferenceAnswer::Text(text) => text.clone(),
        }
    }

    fn generative_prompt(&self) -> String {
        let mut lines = vec![format!("Question type: {}.", self.essay_kind().as_str())];
        if let Some(subject) = &self.subject {
            lines.push(format!("Subject: {subject}."));
        }
        if let Some(topic) = &self.topic {
            lines.push(format!("Topic: {topic}."));
        }
        lines.push(format!("Maximum marks: {}.", self.max_marks));
        lines.extend([
            String::new(),
            "Question:".to_string(),
            self.question_text.clone(),
            String::new(),
            "Marking guide / reference answer (use this to decide marks):".to_string(),
            self.reference_text(),
            String::new(),
            "Student's answer (grade this):".to_string(),
            self.student_answer.clone(),
            String::new(),
            "Important marking rules:".to_string(),
            "- Award partial marks when the student shows partial understanding.".to_string(),
            "- Do NOT exceed the maximum marks.".to_string(),
            "- Be consistent and fair; avoid being too strict or too generous.".to_string(),
            "- Consider content accuracy first, then structure, language, and relevance."
                .to_string(),
            String::new(),
            "Now respond ONLY with JSON matching the shape described above. \
             Do not include any explanation outside the JSON object."
                .to_string(),
        ]);
        lines.join("\n")
    }
}

/// A successful grade, already clamped to `[0, max_marks]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EssayGrade {
    pub total_marks: f64,
    pub max_marks: f64,
    pub percentage: f64,
    pub breakdown: Option<ScoreBreakdown>,
    pub feedback: Option<EssayFeedback>,
}

impl EssayGrade {
    fn clamped(total_marks: f64, max_marks: f64) -> Self {
        let max_marks = max_marks.max(0.0);
        let total_marks =
            if total_marks.is_finite() { total_marks.clamp(0.0, max_marks) } else { 0.0 };
        let percentage = if max_marks > 0.0 { total_marks / max_marks * 100.0 } else { 0.0 };
        Self { total_marks, max_marks, percentage, breakdown: None, feedback: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCode {
    Http(u16),
    /// Code echoed from the service's error body.
    Service(String),
    Network,
    Timeout,
    InvalidResponse,
    NoGenerativeKey,
    GenerativeNoJson,
    GenerativeMissingScore,
    GenerativeError,
}

impl FailureCode {
    pub fn as_code(&self) -> Cow<'_, str> {
        match self {
            FailureCode::Http(status) => Cow::Owned(format!("HTTP_{status}")),
            FailureCode::Service(code) => Cow::Borrowed(code),
            FailureCode::Network => Cow::Borrowed("NETWORK_ERROR"),
            FailureCode::Timeout => Cow::Borrowed("TIMEOUT"),
            FailureCode::InvalidResponse => Cow::Borrowed("INVALID_RESPONSE"),
            FailureCode::NoGenerativeKey => Cow::Borrowed("NO_GENERATIVE_API_KEY"),
            FailureCode::GenerativeNoJson => Cow::Borrowed("GENERATIVE_NO_JSON"),
            FailureCode::GenerativeMissingScore => Cow::Borrowed("GENERATIVE_MISSING_SCORE"),
            FailureCode::GenerativeError => Cow::Borrowed("GENERATIVE_GRADING_ERROR"),
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_code())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct GradingFailure {
    pub code: FailureCode,
    pub message: String,
    pub details: Option<String>,
}

impl GradingFailure {
    fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), details: None }
    }

    fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(FailureCode::Timeout, "grading request timed out")
        } else {
            Self::new(FailureCode::Network, err.to_string())
        }
    }
}

/// Client for the essay grading service, falling back to a generative-text model when no
/// service endpoint is configured.
#[derive(Debug, Clone)]
pub struct EssayGradingClient {
    client: Client,
    api_url: Option<String>,
    api_key: Option<String>,
    use_preview: bool,
    generative_key: Option<String>,
    generative_base_url: String,
    generative_model: String,
}

impl EssayGradingClient {
    pub fn from_settings(
        grading: &GradingSettings,
        generative: &GenerativeSettings,
    ) -> Result<Self> {
        let timeout = grading.request_timeout();
        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: grading.api_url.clone(),
            api_key: grading.api_key.clone().filter(|key| !key.is_empty()),
            use_preview: grading.use_preview,
            generative_key: generative.api_key.clone().filter(|key| !key.is_empty()),
            generative_base_url: generative.base_url.trim_end_matches('/').to_string(),
            generative_model: generative.model.clone(),
        })
    }

    pub fn has_endpoint(&self) -> bool {
        self.api_url.is_some()
    }

    pub async fn grade_essay(&self, request: &EssayRequest) -> Result<EssayGrade, GradingFailure> {
        let timer = Instant::now();
        let result = match &self.api_url {
            Some(api_url) => self.grade_with_service(api_url, request).await,
            None => self.grade_with_generative(request).await,
        };

        tracing::debug!(
            essay_kind = request.essay_kind().as_str(),
            service = if self.has_endpoint() { "endpoint" } else { "generative" },
            duration_seconds = timer.elapsed().as_secs_f64(),
            ok = result.is_ok(),
            "Essay grading finished"
        );
        result
    }

    /// `GET {base}/health`; any failure reads as unhealthy.
    pub async fn check_health(&self) -> bool {
        let Some(api_url) = &self.api_url else {
            return false;
        };

        let response = match self.client.get(format!("{api_url}/health")).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Essay grading health check failed");
                return false;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Essay grading health check failed");
                return false;
            }
        };

        match response.json::<Value>().await {
            Ok(body) => body.get("status").and_then(Value::as_str) == Some("healthy"),
            Err(_) => false,
        }
    }

    async fn grade_with_service(
        &self,
        api_url: &str,
        request: &EssayRequest,
    ) -> Result<EssayGrade, GradingFailure> {
        let url = if self.use_preview {
            format!("{api_url}/functions/v1/grade-essay/preview")
        } else {
            format!("{api_url}/functions/v1/grade-essay")
        };

        let mut builder = self.client.post(&url).json(&request.to_payload());
        if !self.use_preview {
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }
        }

        let response = builder.send().await.map_err(|err| GradingFailure::from_transport(&err))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|err| GradingFailure::from_transport(&err))?;

        if !status.is_success() {
            return Err(service_error(status, &bytes));
        }

        let body: GradeEssayResponse = serde_json::from_slice(&bytes).map_err(|err| {
            GradingFailure::new(FailureCode::InvalidResponse, format!("undecodable body: {err}"))
        })?;

        if !body.success {
            let payload = body.error.unwrap_or_default();
            return Err(GradingFailure {
                code: payload
                    .code
                    .map(FailureCode::Service)
                    .unwrap_or(FailureCode::InvalidResponse),
                message: payload
                    .message
                    .unwrap_or_else(|| "grading was not successful".to_string()),
                details: payload.details,
            });
        }

        let score = body.score.ok_or_else(|| {
            GradingFailure::new(FailureCode::InvalidResponse, "response is missing a score")
        })?;

        let mut grade = EssayGrade::clamped(score.total_marks, request.max_marks);
        grade.breakdown = score.breakdown;
        grade.feedback = body.feedback;
        Ok(grade)
    }

    async fn grade_with_generative(
        &self,
        request: &EssayRequest,
    ) -> Result<EssayGrade, GradingFailure> {
        let Some(key) = &self.generative_key else {
            return Err(GradingFailure::new(
                FailureCode::NoGenerativeKey,
                "generative API key is not configured",
            ));
        };

        let url = format!(
            "{}/v1/models/{}:generateContent",
            self.generative_base_url, self.generative_model
        );
        let payload = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {"text": GENERATIVE_SYSTEM_PROMPT},
                    {"text": request.generative_prompt()}
                ]
            }]
        });

        let generative_error =
            |message: String| GradingFailure::new(FailureCode::GenerativeError, message);

        let response = self
            .client
            .post(&url)
            .query(&[("key", key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|err| generative_error(err.to_string()))?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = body
                .pointer("/error/message")
                .or_else(|| body.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("generative API error: {}", status.as_u16()));
            return Err(generative_error(message));
        }

        let reply = reply_text(&body);
        let Some(object) = extract_json_object(&reply) else {
            return Err(GradingFailure::new(
                FailureCode::GenerativeNoJson,
                "reply did not contain a JSON object",
            ));
        };
        let parsed: Value = serde_json::from_str(object).map_err(|err| {
            GradingFailure::new(FailureCode::GenerativeNoJson, format!("unparseable JSON: {err}"))
        })?;

        let Some(total_marks) = parsed.pointer("/score/total_marks").and_then(Value::as_f64) else {
            return Err(GradingFailure::new(
                FailureCode::GenerativeMissingScore,
                "reply JSON is missing score.total_marks",
            ));
        };

        let mut grade = EssayGrade::clamped(total_marks, request.max_marks);
        grade.breakdown = parsed
            .pointer("/score/breakdown")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok());
        grade.feedback =
            parsed.get("feedback").cloned().and_then(|value| serde_json::from_value(value).ok());
        Ok(grade)
    }
}

fn service_error(status: StatusCode, bytes: &[u8]) -> GradingFailure {
    let payload = serde_json::from_slice::<ErrorEnvelope>(bytes).ok().and_then(|body| body.error);
    let (code, message, details) = match payload {
        Some(payload) => (payload.code, payload.message, payload.details),
        None => (None, None, None),
    };
    GradingFailure {
        code: code.map(FailureCode::Service).unwrap_or(FailureCode::Http(status.as_u16())),
        message: message.unwrap_or_else(|| format!("API returned status {}", status.as_u16())),
        details,
    }
}

/// Text parts of the first candidate, joined by newlines.
fn reply_text(body: &Value) -> String {
    body.pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .map(|part| part.get("text").and_then(Value::as_str).unwrap_or(""))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// First balanced `{...}` in `text`, skipping braces inside JSON strings.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
