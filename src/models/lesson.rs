// src/models/lesson.rs

use serde::{Deserialize, Serialize};

/// Generated lesson payload, stored as JSON on a module or an override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub title: String,
    pub sections: Vec<LessonSection>,
    #[serde(default)]
    pub key_takeaways: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonSection {
    pub heading: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_sample: Option<String>,
}

impl Lesson {
    /// A lesson needs a title and at least one section with a body.
    pub fn check(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("lesson has an empty title".to_string());
        }
        if self.sections.is_empty() {
            return Err("lesson has no sections".to_string());
        }
        if self.sections.iter().any(|s| s.body.trim().is_empty()) {
            return Err("lesson has a section without a body".to_string());
        }
        Ok(())
    }
}
