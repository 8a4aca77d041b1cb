// src/handlers/subject.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{error::AppError, store::subjects};

/// Lists all subjects with their module outlines, in display order.
pub async fn list_subjects(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let subjects = subjects::list_subjects(&pool).await?;
    Ok(Json(subjects))
}

pub async fn get_subject(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let subject = subjects::find_subject_detail(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Subject not found".to_string()))?;
    Ok(Json(subject))
}
