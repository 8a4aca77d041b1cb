// src/models/code.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{clients::sandbox::ExecutionStatus, models::quiz::Language};

/// DTO for running code in the playground.
#[derive(Debug, Deserialize, Validate)]
pub struct ExecuteCodeRequest {
    pub language: Language,

    #[validate(length(min = 1, max = 65536))]
    pub source_code: String,

    #[validate(length(max = 65536))]
    #[serde(default)]
    pub stdin: String,
}

#[derive(Debug, Serialize)]
pub struct ExecuteCodeResponse {
    /// Stdout followed by runtime errors, compiler output and sandbox messages.
    pub output: String,
    pub status: ExecutionStatus,
    pub time: Option<String>,
    pub memory: Option<i64>,
}
