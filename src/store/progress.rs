// src/store/progress.rs

use sqlx::{SqliteConnection, SqlitePool, types::Json};

use crate::{
    error::AppError,
    models::progress::{ModuleOverride, ProgressRow, StudentProgress},
    store::subjects,
};

/// Per (student, subject) progress: completed modules and personal overrides.
///
/// Mutations that must land together take a connection so callers can run
/// them inside one transaction.
#[derive(Clone)]
pub struct ProgressStore {
    pool: SqlitePool,
}

impl ProgressStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the progress record, or returns the existing one untouched.
    pub async fn enroll(&self, student_id: i64, subject_id: i64) -> Result<StudentProgress, AppError> {
        subjects::find_subject(&self.pool, subject_id)
            .await?
            .ok_or(AppError::NotFound("Subject not found".to_string()))?;

        let inserted = sqlx::query(
            "INSERT INTO student_progress (student_id, subject_id, created_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(student_id, subject_id) DO NOTHING",
        )
        .bind(student_id)
        .bind(subject_id)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 1 {
            tracing::info!(student_id, subject_id, "Student enrolled");
        }

        self.get_progress(student_id, subject_id).await
    }

    /// Fails with `NotFound` when the student never enrolled.
    pub async fn get_progress(
        &self,
        student_id: i64,
        subject_id: i64,
    ) -> Result<StudentProgress, AppError> {
        self.find_progress(student_id, subject_id)
            .await?
            .ok_or(AppError::NotFound(
                "Student has not started this subject yet".to_string(),
            ))
    }

    pub async fn find_progress(
        &self,
        student_id: i64,
        subject_id: i64,
    ) -> Result<Option<StudentProgress>, AppError> {
        let row = sqlx::query_as::<_, ProgressRow>(
            "SELECT id, student_id, subject_id, created_at
             FROM student_progress
             WHERE student_id = ?1 AND subject_id = ?2",
        )
        .bind(student_id)
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let completed = sqlx::query_scalar::<_, i64>(
            "SELECT module_id FROM completed_modules WHERE progress_id = ?1",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let overrides = sqlx::query_as::<_, ModuleOverride>(
            "SELECT module_id, content, quiz_id FROM module_overrides WHERE progress_id = ?1",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(StudentProgress::from_parts(row, completed, overrides)))
    }

    /// Adds a module to the completed set. Adding it twice is a no-op.
    pub async fn add_completed(
        conn: &mut SqliteConnection,
        progress_id: i64,
        module_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO completed_modules (progress_id, module_id, completed_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(progress_id, module_id) DO NOTHING",
        )
        .bind(progress_id)
        .bind(module_id)
        .bind(chrono::Utc::now())
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Installs the override for its module, replacing any previous one.
    pub async fn upsert_override(
        conn: &mut SqliteConnection,
        progress_id: i64,
        module_override: &ModuleOverride,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO module_overrides (progress_id, module_id, content, quiz_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(progress_id, module_id) DO UPDATE SET
                content = excluded.content,
                quiz_id = excluded.quiz_id,
                updated_at = excluded.updated_at",
        )
        .bind(progress_id)
        .bind(module_override.module_id)
        .bind(Json(&module_override.content.0))
        .bind(module_override.quiz_id)
        .bind(chrono::Utc::now())
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn remove_override(
        conn: &mut SqliteConnection,
        progress_id: i64,
        module_id: i64,
    ) -> Result<bool, AppError> {
        let removed = sqlx::query(
            "DELETE FROM module_overrides WHERE progress_id = ?1 AND module_id = ?2",
        )
        .bind(progress_id)
        .bind(module_id)
        .execute(conn)
        .await?
        .rows_affected();
        Ok(removed > 0)
    }
}
