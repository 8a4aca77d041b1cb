// src/store/attempts.rs

use sqlx::{Executor, Sqlite, SqlitePool, types::Json};

use crate::{
    error::AppError,
    models::attempt::{AnswerRecord, Attempt, AttemptSummary, StudentSummary},
};

const ATTEMPT_COLUMNS: &str =
    "id, student_id, module_id, quiz_id, answers, score, passed, created_at";

/// Fields of an attempt before it is persisted.
#[derive(Debug)]
pub struct NewAttempt<'a> {
    pub student_id: i64,
    pub module_id: i64,
    pub quiz_id: i64,
    pub answers: &'a [AnswerRecord],
    pub score: i64,
    pub passed: bool,
}

pub async fn insert_attempt<'e, E>(executor: E, attempt: NewAttempt<'_>) -> Result<Attempt, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let saved = sqlx::query_as::<_, Attempt>(&format!(
        "INSERT INTO attempts (student_id, module_id, quiz_id, answers, score, passed, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         RETURNING {}",
        ATTEMPT_COLUMNS
    ))
    .bind(attempt.student_id)
    .bind(attempt.module_id)
    .bind(attempt.quiz_id)
    .bind(Json(attempt.answers))
    .bind(attempt.score)
    .bind(attempt.passed)
    .bind(chrono::Utc::now())
    .fetch_one(executor)
    .await?;
    Ok(saved)
}

/// Attempts of one student, newest first.
pub async fn list_by_student(pool: &SqlitePool, student_id: i64) -> Result<Vec<Attempt>, AppError> {
    let attempts = sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {} FROM attempts WHERE student_id = ?1 ORDER BY created_at DESC, id DESC",
        ATTEMPT_COLUMNS
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await?;
    Ok(attempts)
}

/// Attempts on one module by any student, newest first.
pub async fn list_by_module(pool: &SqlitePool, module_id: i64) -> Result<Vec<Attempt>, AppError> {
    let attempts = sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {} FROM attempts WHERE module_id = ?1 ORDER BY created_at DESC, id DESC",
        ATTEMPT_COLUMNS
    ))
    .bind(module_id)
    .fetch_all(pool)
    .await?;
    Ok(attempts)
}

pub async fn latest_for<'e, E>(
    executor: E,
    student_id: i64,
    module_id: i64,
) -> Result<Option<Attempt>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let attempt = sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {} FROM attempts
         WHERE student_id = ?1 AND module_id = ?2
         ORDER BY id DESC
         LIMIT 1",
        ATTEMPT_COLUMNS
    ))
    .bind(student_id)
    .bind(module_id)
    .fetch_optional(executor)
    .await?;
    Ok(attempt)
}

/// Attempt summaries of a student within one subject, oldest first.
pub async fn summaries_for_subject(
    pool: &SqlitePool,
    student_id: i64,
    subject_id: i64,
) -> Result<Vec<AttemptSummary>, AppError> {
    let summaries = sqlx::query_as::<_, AttemptSummary>(
        "SELECT a.module_id, m.title AS module_title, a.score, a.passed, a.created_at
         FROM attempts a
         JOIN modules m ON m.id = a.module_id
         WHERE a.student_id = ?1 AND m.subject_id = ?2
         ORDER BY a.id",
    )
    .bind(student_id)
    .bind(subject_id)
    .fetch_all(pool)
    .await?;
    Ok(summaries)
}

/// Per-student aggregates over all attempts, most recently active first.
pub async fn student_summaries(pool: &SqlitePool) -> Result<Vec<StudentSummary>, AppError> {
    let summaries = sqlx::query_as::<_, StudentSummary>(
        "SELECT
            student_id,
            COUNT(*) AS attempts_count,
            CAST(ROUND(AVG(score)) AS INTEGER) AS avg_score,
            COUNT(DISTINCT CASE WHEN passed THEN module_id END) AS passed_modules_count,
            MAX(created_at) AS last_attempt_at
         FROM attempts
         GROUP BY student_id
         ORDER BY MAX(id) DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(summaries)
}
