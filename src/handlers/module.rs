// src/handlers/module.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    error::AppError,
    models::{lesson::Lesson, quiz::PublicQuiz},
    services::resolver::{ContentSource, ModuleContentResolver, ModuleView},
    utils::jwt::Claims,
};

/// Module view as sent to the student. Answer keys and hidden tests are stripped.
#[derive(Debug, Serialize)]
pub struct ModuleViewResponse {
    pub module_id: i64,
    pub title: String,
    pub content: Lesson,
    pub quiz: PublicQuiz,
    pub is_completed: bool,
    pub source: ContentSource,
}

impl From<ModuleView> for ModuleViewResponse {
    fn from(view: ModuleView) -> Self {
        Self {
            quiz: PublicQuiz::from(&view.quiz),
            module_id: view.module_id,
            title: view.title,
            content: view.content,
            is_completed: view.is_completed,
            source: view.source,
        }
    }
}

/// Returns the student's view of a module, generating master content on first access.
pub async fn get_module(
    State(resolver): State<ModuleContentResolver>,
    Extension(claims): Extension<Claims>,
    Path(module_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let view = resolver
        .resolve_module_view(claims.user_id()?, module_id)
        .await?;
    Ok(Json(ModuleViewResponse::from(view)))
}
