// src/services/generation.rs

use std::{collections::HashSet, future::Future, sync::Arc, time::Duration};

use crate::{
    clients::generator::{ContentGenerator, FailedCase, GeneratorError},
    config::{HINT_FALLBACK, QUIZ_QUESTION_COUNT},
    error::AppError,
    models::{
        attempt::AttemptSummary,
        lesson::Lesson,
        quiz::{Language, Question},
    },
};

/// Boundary around the content generator.
///
/// Applies the call timeout, re-validates whatever comes back, and turns
/// provider errors into `AppError::GenerationFailed`.
#[derive(Clone)]
pub struct Generation {
    generator: Arc<dyn ContentGenerator>,
    timeout: Duration,
}

impl Generation {
    pub fn new(generator: Arc<dyn ContentGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub async fn lesson(&self, topic: &str, context: Option<&str>) -> Result<Lesson, AppError> {
        let lesson = self
            .call("lesson", self.generator.generate_lesson(topic, context))
            .await?;
        checked_lesson(lesson)
    }

    pub async fn remedial_lesson(
        &self,
        failed_questions: &[String],
        module_title: &str,
        language: Option<Language>,
    ) -> Result<Lesson, AppError> {
        let lesson = self
            .call(
                "remedial lesson",
                self.generator
                    .generate_remedial_lesson(failed_questions, module_title, language),
            )
            .await?;
        checked_lesson(lesson)
    }

    /// Quiz questions for a lesson. Anything but exactly `QUIZ_QUESTION_COUNT`
    /// questions with distinct ids is rejected.
    pub async fn quiz(
        &self,
        lesson: &Lesson,
        language: Option<Language>,
    ) -> Result<Vec<Question>, AppError> {
        let questions = self
            .call("quiz", self.generator.generate_quiz(lesson, language))
            .await?;
        if questions.len() != QUIZ_QUESTION_COUNT {
            return Err(AppError::GenerationFailed(format!(
                "quiz has {} questions, expected {}",
                questions.len(),
                QUIZ_QUESTION_COUNT
            )));
        }
        let mut seen = HashSet::with_capacity(questions.len());
        if let Some(duplicate) = questions
            .iter()
            .map(Question::id)
            .find(|id| !seen.insert(*id))
        {
            return Err(AppError::GenerationFailed(format!(
                "quiz repeats question id {}",
                duplicate
            )));
        }
        Ok(questions)
    }

    /// Never fails: a missing hint degrades to `HINT_FALLBACK`.
    pub async fn hint(
        &self,
        problem_statement: &str,
        submitted_code: &str,
        failed_case: &FailedCase,
        language: Language,
    ) -> String {
        let result = self
            .call(
                "hint",
                self.generator
                    .generate_hint(problem_statement, submitted_code, failed_case, language),
            )
            .await;

        match result {
            Ok(hint) if !hint.trim().is_empty() => hint,
            Ok(_) => HINT_FALLBACK.to_string(),
            Err(e) => {
                tracing::debug!("Using fallback hint: {}", e);
                HINT_FALLBACK.to_string()
            }
        }
    }

    pub async fn report(
        &self,
        student_id: i64,
        attempts: &[AttemptSummary],
    ) -> Result<serde_json::Value, AppError> {
        let report = self
            .call("report", self.generator.generate_report(student_id, attempts))
            .await?;
        if !report.is_object() {
            return Err(AppError::GenerationFailed(
                "report is not a JSON object".to_string(),
            ));
        }
        Ok(report)
    }

    async fn call<T, F>(&self, what: &str, request: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, GeneratorError>>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!("Generator {} request failed: {}", what, e);
                Err(AppError::GenerationFailed(format!("{}: {}", what, e)))
            }
            Err(_) => {
                tracing::warn!("Generator {} request timed out after {:?}", what, self.timeout);
                Err(AppError::GenerationFailed(format!(
                    "{} timed out after {:?}",
                    what, self.timeout
                )))
            }
        }
    }
}

fn checked_lesson(lesson: Lesson) -> Result<Lesson, AppError> {
    lesson.check().map_err(AppError::GenerationFailed)?;
    Ok(lesson)
}
