// src/models/subject.rs

use serde::Serialize;
use sqlx::{prelude::FromRow, types::Json};

use crate::models::{lesson::Lesson, quiz::Language};

/// Represents the 'subjects' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subject {
    pub id: i64,

    /// Unique slug (e.g., "cpp", "dsa").
    pub key: String,

    pub title: String,

    pub display_order: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Subject {
    /// Language used for coding questions and remedial material in this subject.
    pub fn language_hint(&self) -> Option<Language> {
        Language::from_subject_key(&self.key)
    }
}

/// Represents the 'modules' table: the shared master record.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Module {
    pub id: i64,
    pub subject_id: i64,

    /// Sequence within the subject. Stored as `position` since ORDER is reserved.
    #[serde(rename = "order")]
    pub position: i64,

    pub title: String,

    /// Topic string handed to the content generator.
    pub seed_topic: String,

    /// Generated lesson, absent until first access.
    pub content: Option<Json<Lesson>>,

    pub quiz_id: Option<i64>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Module {
    /// Master content is usable only when both the lesson and the quiz are attached.
    pub fn is_generated(&self) -> bool {
        self.content.is_some() && self.quiz_id.is_some()
    }
}

/// Module listing entry without the lesson payload.
#[derive(Debug, Serialize, FromRow)]
pub struct ModuleOutline {
    pub id: i64,
    #[serde(rename = "order")]
    pub position: i64,
    pub title: String,
    pub seed_topic: String,
    pub has_content: bool,
}

/// Subject with its ordered module outline.
#[derive(Debug, Serialize)]
pub struct SubjectDetail {
    #[serde(flatten)]
    pub subject: Subject,
    pub modules: Vec<ModuleOutline>,
}
