// src/handlers/teacher.rs

use axum::{Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{error::AppError, store::attempts};

/// Per-student attempt aggregates for the teacher dashboard.
pub async fn students_progress(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let summaries = attempts::student_summaries(&pool).await?;
    Ok(Json(summaries))
}
