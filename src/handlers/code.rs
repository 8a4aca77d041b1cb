// src/handlers/code.rs

use axum::{Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    clients::sandbox::SandboxError,
    error::AppError,
    models::code::{ExecuteCodeRequest, ExecuteCodeResponse},
    state::AppState,
};

/// Runs code once in the sandbox (playground). Not graded, nothing is stored.
pub async fn execute_code(
    State(state): State<AppState>,
    Json(req): Json<ExecuteCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let timeout = state.config.sandbox_timeout;
    let result = tokio::time::timeout(
        timeout,
        state.runner.run(req.language, &req.source_code, &req.stdin),
    )
    .await
    .unwrap_or(Err(SandboxError::Timeout(timeout)))
    .map_err(|e| AppError::ExecutionFailed(e.to_string()))?;

    Ok(Json(ExecuteCodeResponse {
        output: result.combined_output(),
        status: result.status,
        time: result.time,
        memory: result.memory,
    }))
}
