// src/store/quizzes.rs

use sqlx::{Executor, Sqlite, types::Json};

use crate::{
    error::AppError,
    models::quiz::{Question, Quiz},
};

pub async fn insert_quiz<'e, E>(
    executor: E,
    module_id: i64,
    questions: &[Question],
) -> Result<Quiz, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    if questions.is_empty() {
        return Err(AppError::BadRequest(
            "A quiz needs at least one question".to_string(),
        ));
    }

    let quiz = sqlx::query_as::<_, Quiz>(
        "INSERT INTO quizzes (module_id, questions, created_at)
         VALUES (?1, ?2, ?3)
         RETURNING id, module_id, questions, created_at",
    )
    .bind(module_id)
    .bind(Json(questions))
    .bind(chrono::Utc::now())
    .fetch_one(executor)
    .await?;
    Ok(quiz)
}

pub async fn find_quiz<'e, E>(executor: E, id: i64) -> Result<Option<Quiz>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let quiz = sqlx::query_as::<_, Quiz>(
        "SELECT id, module_id, questions, created_at FROM quizzes WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(quiz)
}

/// Number of quiz records (master and override) created for a module.
pub async fn count_for_module<'e, E>(executor: E, module_id: i64) -> Result<i64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quizzes WHERE module_id = ?1")
        .bind(module_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}
