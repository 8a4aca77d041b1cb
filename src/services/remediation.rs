// src/services/remediation.rs

use sqlx::{SqlitePool, types::Json};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::{AnswerRecord, AttemptOutcome, SubmitQuizRequest},
        progress::{ModuleOverride, StudentProgress},
        quiz::Quiz,
        subject::Module,
    },
    services::{generation::Generation, grader::MasteryGrader},
    store::{
        attempts::{self, NewAttempt},
        progress::ProgressStore,
        quizzes, subjects,
    },
};

/// Records attempts and drives the pass/fail branches that follow them.
#[derive(Clone)]
pub struct RemediationOrchestrator {
    pool: SqlitePool,
    progress: ProgressStore,
    grader: MasteryGrader,
    generation: Generation,
}

impl RemediationOrchestrator {
    pub fn new(pool: SqlitePool, grader: MasteryGrader, generation: Generation) -> Self {
        Self {
            progress: ProgressStore::new(pool.clone()),
            pool,
            grader,
            generation,
        }
    }

    /// Grades a submission, persists the attempt, then either marks the module
    /// mastered or installs a fresh remedial override.
    ///
    /// The attempt is stored before remediation starts, so a failed generation
    /// still leaves it on record and returns `GenerationFailed`.
    pub async fn record_attempt(
        &self,
        student_id: i64,
        module_id: i64,
        request: SubmitQuizRequest,
    ) -> Result<AttemptOutcome, AppError> {
        request.validate()?;

        let (module, progress) = self.module_and_progress(student_id, module_id).await?;
        let quiz = self.effective_quiz(&module, &progress).await?;

        if request.quiz_id.is_some_and(|shown| shown != quiz.id) {
            return Err(AppError::Conflict(
                "This quiz has been replaced, reload the module and try again".to_string(),
            ));
        }

        let grade = self.grader.grade_submission(&quiz, &request.answers).await;

        let attempt = attempts::insert_attempt(
            &self.pool,
            NewAttempt {
                student_id,
                module_id: module.id,
                quiz_id: quiz.id,
                answers: &grade.answer_records,
                score: grade.aggregate_score,
                passed: grade.passed,
            },
        )
        .await?;

        tracing::info!(
            student_id,
            module_id = module.id,
            attempt_id = attempt.id,
            score = attempt.score,
            passed = attempt.passed,
            "Attempt recorded"
        );

        if grade.passed {
            let mut tx = self.pool.begin().await?;
            ProgressStore::add_completed(&mut tx, progress.id, module.id).await?;
            ProgressStore::remove_override(&mut tx, progress.id, module.id).await?;
            tx.commit().await?;

            return Ok(AttemptOutcome {
                score: attempt.score,
                passed: true,
                remedial_available: false,
                attempt,
            });
        }

        let failed = failed_question_texts(&quiz, &attempt.answers);
        if let Err(e) = self.install_remedial(&module, progress.id, &failed).await {
            tracing::error!(
                attempt_id = attempt.id,
                module_id = module.id,
                "Remedial content generation failed: {}",
                e
            );
            return Err(match e {
                AppError::GenerationFailed(msg) => AppError::GenerationFailed(format!(
                    "attempt {} recorded, remedial content unavailable: {}",
                    attempt.id, msg
                )),
                other => other,
            });
        }

        Ok(AttemptOutcome {
            score: attempt.score,
            passed: false,
            remedial_available: true,
            attempt,
        })
    }

    /// Regenerates the remedial override from the student's latest failed attempt.
    pub async fn retry_remediation(
        &self,
        student_id: i64,
        module_id: i64,
    ) -> Result<ModuleOverride, AppError> {
        let (module, progress) = self.module_and_progress(student_id, module_id).await?;

        if progress.is_completed(module.id) {
            return Err(AppError::BadRequest(
                "Module already mastered, nothing to remediate".to_string(),
            ));
        }

        let latest = attempts::latest_for(&self.pool, student_id, module.id)
            .await?
            .ok_or(AppError::NotFound(
                "No attempt found for this module".to_string(),
            ))?;
        if latest.passed {
            return Err(AppError::BadRequest(
                "Latest attempt passed, nothing to remediate".to_string(),
            ));
        }

        let quiz = quizzes::find_quiz(&self.pool, latest.quiz_id)
            .await?
            .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

        let failed = failed_question_texts(&quiz, &latest.answers);
        self.install_remedial(&module, progress.id, &failed).await
    }

    async fn module_and_progress(
        &self,
        student_id: i64,
        module_id: i64,
    ) -> Result<(Module, StudentProgress), AppError> {
        let module = subjects::find_module(&self.pool, module_id)
            .await?
            .ok_or(AppError::NotFound("Module not found".to_string()))?;

        let progress = self
            .progress
            .find_progress(student_id, module.subject_id)
            .await?
            .ok_or(AppError::NotEnrolled(
                "Enroll in this subject before taking its quizzes".to_string(),
            ))?;

        Ok((module, progress))
    }

    /// Override quiz if the student has one, otherwise the module's master quiz.
    async fn effective_quiz(
        &self,
        module: &Module,
        progress: &StudentProgress,
    ) -> Result<Quiz, AppError> {
        let quiz_id = match progress.override_for(module.id) {
            Some(module_override) => module_override.quiz_id,
            None => module.quiz_id.ok_or(AppError::NotFound(
                "Quiz not found for this module, open the module first".to_string(),
            ))?,
        };

        quizzes::find_quiz(&self.pool, quiz_id)
            .await?
            .ok_or(AppError::NotFound("Quiz not found".to_string()))
    }

    /// Generates remedial content, then stores its quiz and the override in one
    /// transaction. Nothing is written if generation fails.
    async fn install_remedial(
        &self,
        module: &Module,
        progress_id: i64,
        failed_questions: &[String],
    ) -> Result<ModuleOverride, AppError> {
        let subject = subjects::find_subject(&self.pool, module.subject_id)
            .await?
            .ok_or(AppError::NotFound("Subject not found".to_string()))?;
        let language = subject.language_hint();

        tracing::info!(
            module_id = module.id,
            progress_id,
            failed = failed_questions.len(),
            "Generating remedial content"
        );

        let lesson = self
            .generation
            .remedial_lesson(failed_questions, &module.title, language)
            .await?;
        let questions = self.generation.quiz(&lesson, language).await?;

        let mut tx = self.pool.begin().await?;
        let quiz = quizzes::insert_quiz(&mut *tx, module.id, &questions).await?;
        let module_override = ModuleOverride {
            module_id: module.id,
            content: Json(lesson),
            quiz_id: quiz.id,
        };
        ProgressStore::upsert_override(&mut tx, progress_id, &module_override).await?;
        tx.commit().await?;

        Ok(module_override)
    }
}

/// Texts of questions that did not earn full weight, in quiz order.
/// Unanswered questions are included.
pub fn failed_question_texts(quiz: &Quiz, records: &[AnswerRecord]) -> Vec<String> {
    quiz.questions
        .iter()
        .filter(|q| {
            !records
                .iter()
                .any(|r| r.question_id == q.id() && r.correct)
        })
        .map(|q| q.text().to_string())
        .collect()
}
