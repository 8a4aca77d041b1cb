// src/services/reports.rs

use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::report::Report,
    services::generation::Generation,
    store::{attempts, reports, subjects},
};

/// Generator-backed progress reports.
#[derive(Clone)]
pub struct ReportService {
    pool: SqlitePool,
    generation: Generation,
}

impl ReportService {
    pub fn new(pool: SqlitePool, generation: Generation) -> Self {
        Self { pool, generation }
    }

    /// Analyses a student's attempts in one subject and stores the result.
    pub async fn generate_report(&self, student_id: i64, subject_id: i64) -> Result<Report, AppError> {
        subjects::find_subject(&self.pool, subject_id)
            .await?
            .ok_or(AppError::NotFound("Subject not found".to_string()))?;

        let summaries = attempts::summaries_for_subject(&self.pool, student_id, subject_id).await?;
        if summaries.is_empty() {
            return Err(AppError::NotFound(
                "No attempts found for this student in this subject".to_string(),
            ));
        }

        let content = self.generation.report(student_id, &summaries).await?;
        let report = reports::insert_report(&self.pool, student_id, subject_id, &content).await?;

        tracing::info!(student_id, subject_id, report_id = report.id, "Report generated");
        Ok(report)
    }

    pub async fn list_reports(&self, student_id: i64) -> Result<Vec<Report>, AppError> {
        reports::list_for_student(&self.pool, student_id).await
    }
}
