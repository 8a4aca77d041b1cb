// src/services/resolver.rs

use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{lesson::Lesson, quiz::Quiz, subject::Module},
    services::{generation::Generation, locks::GenerationLocks},
    store::{
        progress::ProgressStore,
        quizzes,
        subjects::{self, attach_master_content},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Master,
    Override,
}

/// What a student sees for a module: their override if any, otherwise the master.
#[derive(Debug, Clone)]
pub struct ModuleView {
    pub module_id: i64,
    pub title: String,
    pub content: Lesson,
    pub quiz: Quiz,
    pub is_completed: bool,
    pub source: ContentSource,
}

#[derive(Clone)]
pub struct ModuleContentResolver {
    pool: SqlitePool,
    progress: ProgressStore,
    generation: Generation,
    locks: Arc<GenerationLocks>,
}

impl ModuleContentResolver {
    pub fn new(pool: SqlitePool, generation: Generation, locks: Arc<GenerationLocks>) -> Self {
        Self {
            progress: ProgressStore::new(pool.clone()),
            pool,
            generation,
            locks,
        }
    }

    pub async fn resolve_module_view(
        &self,
        student_id: i64,
        module_id: i64,
    ) -> Result<ModuleView, AppError> {
        let module = subjects::find_module(&self.pool, module_id)
            .await?
            .ok_or(AppError::NotFound("Module not found".to_string()))?;

        let progress = self
            .progress
            .find_progress(student_id, module.subject_id)
            .await?
            .ok_or(AppError::NotEnrolled(
                "Enroll in this subject before opening its modules".to_string(),
            ))?;

        let is_completed = progress.is_completed(module.id);

        if let Some(module_override) = progress.override_for(module.id) {
            let quiz = quizzes::find_quiz(&self.pool, module_override.quiz_id)
                .await?
                .ok_or(AppError::InternalServerError(format!(
                    "Override quiz {} is missing",
                    module_override.quiz_id
                )))?;

            return Ok(ModuleView {
                module_id: module.id,
                title: module.title,
                content: module_override.content.0.clone(),
                quiz,
                is_completed,
                source: ContentSource::Override,
            });
        }

        let module = if module.is_generated() {
            module
        } else {
            self.ensure_master_content(module.id).await?
        };

        let (Some(content), Some(quiz_id)) = (module.content, module.quiz_id) else {
            return Err(AppError::InternalServerError(format!(
                "Module {} has no master content after generation",
                module.id
            )));
        };

        let quiz = quizzes::find_quiz(&self.pool, quiz_id)
            .await?
            .ok_or(AppError::InternalServerError(format!(
                "Master quiz {} is missing",
                quiz_id
            )))?;

        Ok(ModuleView {
            module_id: module.id,
            title: module.title,
            content: content.0,
            quiz,
            is_completed,
            source: ContentSource::Master,
        })
    }

    /// Returns the module with its master lesson and quiz attached, generating
    /// them first if needed. At most one caller per module generates; the
    /// others wait on the lock and then read the winner's content.
    pub async fn ensure_master_content(&self, module_id: i64) -> Result<Module, AppError> {
        let _guard = self.locks.acquire(module_id).await;

        let module = subjects::find_module(&self.pool, module_id)
            .await?
            .ok_or(AppError::NotFound("Module not found".to_string()))?;
        if module.is_generated() {
            return Ok(module);
        }

        let subject = subjects::find_subject(&self.pool, module.subject_id)
            .await?
            .ok_or(AppError::NotFound("Subject not found".to_string()))?;
        let language = subject.language_hint();

        let context = match language {
            Some(language) => format!(
                "Subject: {}. Module: {}. Use {} for all code examples.",
                subject.title, module.title, language
            ),
            None => format!("Subject: {}. Module: {}.", subject.title, module.title),
        };

        tracing::info!(module_id, "Generating master content");
        let lesson = self
            .generation
            .lesson(&module.seed_topic, Some(&context))
            .await?;
        let questions = self.generation.quiz(&lesson, language).await?;

        let mut tx = self.pool.begin().await?;
        let quiz = quizzes::insert_quiz(&mut *tx, module.id, &questions).await?;
        if attach_master_content(&mut *tx, module.id, &lesson, quiz.id).await? {
            tx.commit().await?;
            tracing::info!(module_id, quiz_id = quiz.id, "Master content attached");
        } else {
            tx.rollback().await?;
            tracing::info!(module_id, "Master content already attached by another writer");
        }

        subjects::find_module(&self.pool, module_id)
            .await?
            .filter(Module::is_generated)
            .ok_or(AppError::GenerationFailed(format!(
                "Module {} is still without content",
                module_id
            )))
    }
}
