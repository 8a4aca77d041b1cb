// src/handlers/report.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError, models::report::GenerateReportRequest, services::reports::ReportService,
    utils::jwt::Claims,
};

/// Generates and stores a progress report. Students may only report on themselves.
pub async fn generate_report(
    State(service): State<ReportService>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GenerateReportRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    claims.ensure_self_or_staff(req.student_id)?;

    let report = service.generate_report(req.student_id, req.subject_id).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list_reports(
    State(service): State<ReportService>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    claims.ensure_self_or_staff(user_id)?;

    let reports = service.list_reports(user_id).await?;
    Ok(Json(reports))
}
