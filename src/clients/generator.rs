// src/clients/generator.rs

//! Content generation client.
//!
//! The core only relies on the `ContentGenerator` contract; `LlmContentGenerator`
//! talks to an OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;

use crate::{
    config::{Config, QUIZ_QUESTION_COUNT},
    models::{
        attempt::AttemptSummary,
        lesson::Lesson,
        quiz::{Language, Question},
    },
};

/// Errors raised by a content generator. Translated to `AppError::GenerationFailed`
/// at the service boundary.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("generator request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generator returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generator returned no content")]
    Empty,

    #[error("generator output is malformed: {0}")]
    Malformed(String),
}

/// First test case a coding submission failed, used to ask for a hint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedCase {
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
}

/// Produces lessons, quizzes, hints and reports.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_lesson(
        &self,
        topic: &str,
        context: Option<&str>,
    ) -> Result<Lesson, GeneratorError>;

    /// Builds quiz questions for a lesson. With a language hint the quiz mixes
    /// multiple-choice and coding questions.
    async fn generate_quiz(
        &self,
        lesson: &Lesson,
        language: Option<Language>,
    ) -> Result<Vec<Question>, GeneratorError>;

    async fn generate_remedial_lesson(
        &self,
        failed_questions: &[String],
        module_title: &str,
        language: Option<Language>,
    ) -> Result<Lesson, GeneratorError>;

    async fn generate_hint(
        &self,
        problem_statement: &str,
        submitted_code: &str,
        failed_case: &FailedCase,
        language: Language,
    ) -> Result<String, GeneratorError>;

    /// Returns an analysis JSON object for a student's attempt history.
    async fn generate_report(
        &self,
        student_id: i64,
        attempts: &[AttemptSummary],
    ) -> Result<serde_json::Value, GeneratorError>;
}

const LESSON_SCHEMA: &str = "Respond with a single JSON object only, no prose, with keys: \
title (string), sections (array of {heading, body, code_sample?}), key_takeaways (array of strings).";

/// Coding questions per quiz when the subject has a programming language.
const CODING_QUESTIONS_PER_QUIZ: usize = 3;

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuizPayload {
    questions: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl QuizPayload {
    /// Provider ids are discarded so every question gets a fresh one.
    fn into_questions(self) -> Result<Vec<Question>, GeneratorError> {
        self.questions
            .into_iter()
            .map(|mut question| {
                question.remove("id");
                serde_json::from_value(serde_json::Value::Object(question))
                    .map_err(|e| GeneratorError::Malformed(e.to_string()))
            })
            .collect()
    }
}

pub struct LlmContentGenerator {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl LlmContentGenerator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GeneratorError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GeneratorError> {
        Self::new(
            config.generator_base_url.clone(),
            config.generator_api_key.clone(),
            config.generator_model.clone(),
            config.generator_timeout,
        )
    }

    async fn complete(&self, system: &str, user: String) -> Result<String, GeneratorError> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GeneratorError::Empty)
    }

    async fn complete_json<T: DeserializeOwned>(
        &self,
        system: &str,
        user: String,
    ) -> Result<T, GeneratorError> {
        let text = self.complete(system, user).await?;
        let object = extract_json_object(&text)?;
        serde_json::from_str(object).map_err(|e| GeneratorError::Malformed(e.to_string()))
    }

    async fn complete_lesson(&self, system: &str, user: String) -> Result<Lesson, GeneratorError> {
        let lesson: Lesson = self.complete_json(system, user).await?;
        lesson.check().map_err(GeneratorError::Malformed)?;
        Ok(lesson)
    }
}

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn generate_lesson(
        &self,
        topic: &str,
        context: Option<&str>,
    ) -> Result<Lesson, GeneratorError> {
        let system = format!(
            "You are an expert computer science tutor. Write a concise lesson (500-800 words). {}",
            LESSON_SCHEMA
        );
        let user = format!(
            "Create a lesson for the topic: \"{}\". Context: {}.",
            topic,
            context.unwrap_or("none")
        );
        self.complete_lesson(&system, user).await
    }

    async fn generate_quiz(
        &self,
        lesson: &Lesson,
        language: Option<Language>,
    ) -> Result<Vec<Question>, GeneratorError> {
        let mix = match language {
            Some(lang) => format!(
                "{} questions must be \"mcq\" and {} must be \"coding\" in {}.",
                QUIZ_QUESTION_COUNT - CODING_QUESTIONS_PER_QUIZ,
                CODING_QUESTIONS_PER_QUIZ,
                lang
            ),
            None => "All questions must be \"mcq\".".to_string(),
        };
        let system = format!(
            "You are a quiz generator. Respond with a JSON object only, with key \"questions\": \
             an array of exactly {} objects. An mcq object has: type=\"mcq\", text, options \
             (3-4 strings), correct_index (0-based integer), explanation. A coding object has: \
             type=\"coding\", text, problem_statement, language, starter_code, test_cases \
             (array of {{input, expected_output}} read from stdin / written to stdout), explanation.",
            QUIZ_QUESTION_COUNT
        );
        let user = format!(
            "Create the quiz for this lesson. {}\nLesson: {}",
            mix,
            serde_json::to_string(lesson).map_err(|e| GeneratorError::Malformed(e.to_string()))?
        );

        let payload: QuizPayload = self.complete_json(&system, user).await?;
        payload.into_questions()
    }

    async fn generate_remedial_lesson(
        &self,
        failed_questions: &[String],
        module_title: &str,
        language: Option<Language>,
    ) -> Result<Lesson, GeneratorError> {
        let system = format!(
            "You are a patient tutor. Write a simpler remedial lesson focused on the student's \
             mistakes: common misconceptions, step-by-step examples and two micro-exercises. {}",
            LESSON_SCHEMA
        );
        let user = format!(
            "Module: \"{}\". Language: {}. The student answered these questions incorrectly: {}",
            module_title,
            language.map(Language::as_str).unwrap_or("none"),
            serde_json::to_string(failed_questions)
                .map_err(|e| GeneratorError::Malformed(e.to_string()))?
        );
        self.complete_lesson(&system, user).await
    }

    async fn generate_hint(
        &self,
        problem_statement: &str,
        submitted_code: &str,
        failed_case: &FailedCase,
        language: Language,
    ) -> Result<String, GeneratorError> {
        let system = "You are a programming tutor. Give one short hint (at most three sentences) \
                      that points the student towards the bug without writing the solution.";
        let user = format!(
            "Problem: {}\nLanguage: {}\nStudent code:\n{}\nFailing case input: {:?}\nExpected: {:?}\nActual: {:?}",
            problem_statement,
            language,
            submitted_code,
            failed_case.input,
            failed_case.expected_output,
            failed_case.actual_output
        );
        let hint = self.complete(system, user).await?;
        Ok(hint.trim().to_string())
    }

    async fn generate_report(
        &self,
        student_id: i64,
        attempts: &[AttemptSummary],
    ) -> Result<serde_json::Value, GeneratorError> {
        let system = "You are an educational analyst. Respond with a JSON object only, with keys: \
                      title, summary, strengths (array), weaknesses (array), recommendations (array).";
        let user = format!(
            "Create a performance report for student #{}. Attempts: {}",
            student_id,
            serde_json::to_string(attempts).map_err(|e| GeneratorError::Malformed(e.to_string()))?
        );
        let report: serde_json::Value = self.complete_json(system, user).await?;
        if !report.is_object() {
            return Err(GeneratorError::Malformed(
                "report is not a JSON object".to_string(),
            ));
        }
        Ok(report)
    }
}

/// Slices the outermost JSON object out of a model reply that may carry prose
/// or code fences around it.
pub fn extract_json_object(text: &str) -> Result<&str, GeneratorError> {
    match (text.find('{'), text.rfind('}')) {
        (Some(first), Some(last)) if last > first => Ok(&text[first..=last]),
        _ => Err(GeneratorError::Malformed(
            "no JSON object found in output".to_string(),
        )),
    }
}
