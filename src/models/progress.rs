// src/models/progress.rs

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};
use sqlx::{FromRow, types::Json};

use crate::models::lesson::Lesson;

/// Student-specific replacement of a module's lesson and quiz.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ModuleOverride {
    pub module_id: i64,
    pub content: Json<Lesson>,
    pub quiz_id: i64,
}

/// Row shape of the 'student_progress' table.
#[derive(Debug, Clone, FromRow)]
pub struct ProgressRow {
    pub id: i64,
    pub student_id: i64,
    pub subject_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A student's progress in one subject.
///
/// Overrides are keyed by module id, so a module can never carry two of them.
/// They serialize as a list for clients.
#[derive(Debug, Clone, Serialize)]
pub struct StudentProgress {
    pub id: i64,
    pub student_id: i64,
    pub subject_id: i64,
    pub completed_modules: BTreeSet<i64>,
    #[serde(serialize_with = "overrides_as_list")]
    pub module_overrides: BTreeMap<i64, ModuleOverride>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl StudentProgress {
    pub fn from_parts(
        row: ProgressRow,
        completed: impl IntoIterator<Item = i64>,
        overrides: impl IntoIterator<Item = ModuleOverride>,
    ) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            subject_id: row.subject_id,
            completed_modules: completed.into_iter().collect(),
            module_overrides: overrides.into_iter().map(|o| (o.module_id, o)).collect(),
            created_at: row.created_at,
        }
    }

    pub fn is_completed(&self, module_id: i64) -> bool {
        self.completed_modules.contains(&module_id)
    }

    pub fn override_for(&self, module_id: i64) -> Option<&ModuleOverride> {
        self.module_overrides.get(&module_id)
    }
}

fn overrides_as_list<S: Serializer>(
    overrides: &BTreeMap<i64, ModuleOverride>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(overrides.values())
}
