// src/store/subjects.rs

use sqlx::{Executor, Sqlite, SqlitePool, types::Json};

use crate::{
    error::AppError,
    models::{
        lesson::Lesson,
        subject::{Module, ModuleOutline, Subject, SubjectDetail},
    },
};

const MODULE_COLUMNS: &str =
    "id, subject_id, position, title, seed_topic, content, quiz_id, created_at";

/// Lists all subjects with their modules in sequence order.
pub async fn list_subjects(pool: &SqlitePool) -> Result<Vec<SubjectDetail>, AppError> {
    let subjects = sqlx::query_as::<_, Subject>(
        "SELECT id, key, title, display_order, created_at
         FROM subjects
         ORDER BY display_order, title",
    )
    .fetch_all(pool)
    .await?;

    let mut details = Vec::with_capacity(subjects.len());
    for subject in subjects {
        let modules = module_outline(pool, subject.id).await?;
        details.push(SubjectDetail { subject, modules });
    }
    Ok(details)
}

pub async fn find_subject<'e, E>(executor: E, id: i64) -> Result<Option<Subject>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let subject = sqlx::query_as::<_, Subject>(
        "SELECT id, key, title, display_order, created_at FROM subjects WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(subject)
}

pub async fn find_subject_detail(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<SubjectDetail>, AppError> {
    let Some(subject) = find_subject(pool, id).await? else {
        return Ok(None);
    };
    let modules = module_outline(pool, subject.id).await?;
    Ok(Some(SubjectDetail { subject, modules }))
}

async fn module_outline(pool: &SqlitePool, subject_id: i64) -> Result<Vec<ModuleOutline>, AppError> {
    let modules = sqlx::query_as::<_, ModuleOutline>(
        "SELECT id, position, title, seed_topic, (content IS NOT NULL) AS has_content
         FROM modules
         WHERE subject_id = ?1
         ORDER BY position",
    )
    .bind(subject_id)
    .fetch_all(pool)
    .await?;
    Ok(modules)
}

pub async fn find_module<'e, E>(executor: E, id: i64) -> Result<Option<Module>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let module = sqlx::query_as::<_, Module>(&format!(
        "SELECT {} FROM modules WHERE id = ?1",
        MODULE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(module)
}

/// Inserts a subject unless its key already exists. Returns the new id, or `None` if skipped.
pub async fn insert_subject_if_absent<'e, E>(
    executor: E,
    key: &str,
    title: &str,
    display_order: i64,
) -> Result<Option<i64>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO subjects (key, title, display_order, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(key) DO NOTHING
         RETURNING id",
    )
    .bind(key)
    .bind(title)
    .bind(display_order)
    .bind(chrono::Utc::now())
    .fetch_optional(executor)
    .await?;
    Ok(id)
}

pub async fn insert_module<'e, E>(
    executor: E,
    subject_id: i64,
    position: i64,
    title: &str,
    seed_topic: &str,
) -> Result<i64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO modules (subject_id, position, title, seed_topic, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING id",
    )
    .bind(subject_id)
    .bind(position)
    .bind(title)
    .bind(seed_topic)
    .bind(chrono::Utc::now())
    .fetch_one(executor)
    .await?;
    Ok(id)
}

/// Compare-and-set of the master lesson and quiz.
///
/// Only succeeds while the module is still ungenerated; returns `false` when
/// another writer attached content first.
pub async fn attach_master_content<'e, E>(
    executor: E,
    module_id: i64,
    lesson: &Lesson,
    quiz_id: i64,
) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE modules
         SET content = ?1, quiz_id = ?2
         WHERE id = ?3 AND (content IS NULL OR quiz_id IS NULL)",
    )
    .bind(Json(lesson))
    .bind(quiz_id)
    .bind(module_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}
