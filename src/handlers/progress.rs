// src/handlers/progress.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{error::AppError, store::progress::ProgressStore, utils::jwt::Claims};

/// Enrolls the caller in a subject. Calling it again returns the existing progress.
pub async fn enroll(
    State(store): State<ProgressStore>,
    Extension(claims): Extension<Claims>,
    Path(subject_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let progress = store.enroll(claims.user_id()?, subject_id).await?;
    Ok(Json(progress))
}

pub async fn get_progress(
    State(store): State<ProgressStore>,
    Extension(claims): Extension<Claims>,
    Path(subject_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let progress = store.get_progress(claims.user_id()?, subject_id).await?;
    Ok(Json(progress))
}
