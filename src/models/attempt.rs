// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Outcome of one test case of a coding question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub passed: bool,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    /// Set when the sandbox could not run this case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Graded answer to a single question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: Uuid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_index: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_code: Option<String>,

    /// True only when the question earned its full weight.
    pub correct: bool,

    pub score: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_case_results: Vec<TestCaseResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_hint: Option<String>,
}

/// Represents the 'attempts' table. Written once per submission, never updated.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attempt {
    pub id: i64,
    pub student_id: i64,
    pub module_id: i64,
    /// The quiz actually administered (override or master).
    pub quiz_id: i64,
    pub answers: Json<Vec<AnswerRecord>>,
    pub score: i64,
    pub passed: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One submitted answer. MCQ answers carry `chosen_index`, coding answers `submitted_code`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = validate_answer_shape))]
pub struct SubmittedAnswer {
    pub question_id: Uuid,

    /// Index of the chosen option; numbers and numeric strings are accepted.
    #[serde(default)]
    pub chosen_index: Option<serde_json::Value>,

    #[validate(length(max = 65536))]
    #[serde(default)]
    pub submitted_code: Option<String>,
}

fn validate_answer_shape(answer: &SubmittedAnswer) -> Result<(), ValidationError> {
    match (&answer.chosen_index, &answer.submitted_code) {
        (Some(_), Some(_)) => Err(ValidationError::new("answer_has_both_index_and_code")),
        (None, None) => Err(ValidationError::new("answer_is_empty")),
        _ => Ok(()),
    }
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    /// Quiz the client was shown; rejected if it is no longer the student's effective quiz.
    #[serde(default)]
    pub quiz_id: Option<i64>,

    #[validate(length(max = 100), nested)]
    pub answers: Vec<SubmittedAnswer>,
}

/// Result returned to the caller after a submission.
#[derive(Debug, Serialize)]
pub struct AttemptOutcome {
    pub attempt: Attempt,
    pub score: i64,
    pub passed: bool,
    pub remedial_available: bool,
}

/// Compact attempt view handed to the report generator.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttemptSummary {
    pub module_id: i64,
    pub module_title: String,
    pub score: i64,
    pub passed: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Per-student aggregate for the teacher dashboard.
#[derive(Debug, Serialize, FromRow)]
pub struct StudentSummary {
    pub student_id: i64,
    pub attempts_count: i64,
    pub avg_score: i64,
    pub passed_modules_count: i64,
    pub last_attempt_at: Option<String>,
}
