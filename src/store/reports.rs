// src/store/reports.rs

use sqlx::{Executor, Sqlite, SqlitePool, types::Json};

use crate::{error::AppError, models::report::Report};

pub async fn insert_report<'e, E>(
    executor: E,
    student_id: i64,
    subject_id: i64,
    content: &serde_json::Value,
) -> Result<Report, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let report = sqlx::query_as::<_, Report>(
        "INSERT INTO reports (student_id, subject_id, content, created_at)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id, student_id, subject_id, content, created_at",
    )
    .bind(student_id)
    .bind(subject_id)
    .bind(Json(content))
    .bind(chrono::Utc::now())
    .fetch_one(executor)
    .await?;
    Ok(report)
}

/// Reports of one student, newest first.
pub async fn list_for_student(pool: &SqlitePool, student_id: i64) -> Result<Vec<Report>, AppError> {
    let reports = sqlx::query_as::<_, Report>(
        "SELECT id, student_id, subject_id, content, created_at
         FROM reports
         WHERE student_id = ?1
         ORDER BY id DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;
    Ok(reports)
}
