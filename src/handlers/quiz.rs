// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    handlers::module::ModuleViewResponse,
    models::attempt::SubmitQuizRequest,
    services::{remediation::RemediationOrchestrator, resolver::ModuleContentResolver},
    utils::jwt::Claims,
};

/// Grades a quiz submission for a module.
/// On failure the response says whether a remedial version is ready.
pub async fn submit_quiz(
    State(orchestrator): State<RemediationOrchestrator>,
    Extension(claims): Extension<Claims>,
    Path(module_id): Path<i64>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = orchestrator
        .record_attempt(claims.user_id()?, module_id, req)
        .await?;
    Ok(Json(outcome))
}

/// Retries remedial generation after a failed attempt and returns the new module view.
pub async fn remediate(
    State(orchestrator): State<RemediationOrchestrator>,
    State(resolver): State<ModuleContentResolver>,
    Extension(claims): Extension<Claims>,
    Path(module_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    orchestrator.retry_remediation(student_id, module_id).await?;

    let view = resolver.resolve_module_view(student_id, module_id).await?;
    Ok(Json(ModuleViewResponse::from(view)))
}
