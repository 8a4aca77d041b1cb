// src/models/report.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// Represents the 'reports' table. Generated on demand, never updated.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Report {
    pub id: i64,
    pub student_id: i64,
    pub subject_id: i64,
    /// Analysis object produced by the content generator.
    pub content: Json<serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for requesting a report.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateReportRequest {
    #[validate(range(min = 1))]
    pub student_id: i64,
    #[validate(range(min = 1))]
    pub subject_id: i64,
}
