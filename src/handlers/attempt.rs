// src/handlers/attempt.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{error::AppError, store::attempts, utils::jwt::Claims};

/// The caller's own attempts, newest first.
pub async fn my_attempts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = attempts::list_by_student(&pool, claims.user_id()?).await?;
    Ok(Json(attempts))
}

/// Staff only.
pub async fn user_attempts(
    State(pool): State<SqlitePool>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = attempts::list_by_student(&pool, user_id).await?;
    Ok(Json(attempts))
}

/// Staff only.
pub async fn module_attempts(
    State(pool): State<SqlitePool>,
    Path(module_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = attempts::list_by_module(&pool, module_id).await?;
    Ok(Json(attempts))
}
