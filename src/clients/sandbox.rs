// src/clients/sandbox.rs

//! Code execution sandbox client (Judge0 compatible).

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::{config::Config, models::quiz::Language};

/// Judge0 status id for a run that finished and produced output.
pub const STATUS_ACCEPTED: i64 = 3;

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("sandbox request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sandbox returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("sandbox timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub id: i64,
    pub description: String,
}

/// Structured result of one sandboxed run, with decoded outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub message: Option<String>,
    pub status: ExecutionStatus,
    pub time: Option<String>,
    pub memory: Option<i64>,
}

impl ExecutionResult {
    pub fn accepted(&self) -> bool {
        self.status.id == STATUS_ACCEPTED
    }

    /// Stdout followed by any runtime error, compiler output and sandbox message.
    pub fn combined_output(&self) -> String {
        let mut output = String::new();
        if let Some(stdout) = &self.stdout {
            output.push_str(stdout);
        }
        if let Some(stderr) = &self.stderr {
            output.push_str("\nRuntime Error:\n");
            output.push_str(stderr);
        }
        if let Some(compile) = &self.compile_output {
            output.push_str("\nCompilation Error:\n");
            output.push_str(compile);
        }
        if let Some(message) = &self.message {
            output.push_str("\nMessage:\n");
            output.push_str(message);
        }
        output.trim().to_string()
    }
}

/// Runs one (language, code, stdin) triple.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    async fn run(
        &self,
        language: Language,
        source_code: &str,
        stdin: &str,
    ) -> Result<ExecutionResult, SandboxError>;
}

#[derive(Debug, Deserialize)]
struct Judge0Response {
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    message: Option<String>,
    status: ExecutionStatus,
    time: Option<String>,
    memory: Option<i64>,
}

pub struct Judge0Runner {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl Judge0Runner {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SandboxError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SandboxError> {
        Self::new(
            config.judge0_url.clone(),
            config.judge0_api_key.clone(),
            config.sandbox_timeout,
        )
    }
}

#[async_trait]
impl CodeRunner for Judge0Runner {
    async fn run(
        &self,
        language: Language,
        source_code: &str,
        stdin: &str,
    ) -> Result<ExecutionResult, SandboxError> {
        let body = json!({
            "language_id": language.judge0_id(),
            "source_code": STANDARD.encode(source_code),
            "stdin": STANDARD.encode(stdin),
        });

        let mut request = self
            .client
            .post(&self.url)
            .query(&[("base64_encoded", "true"), ("wait", "true")])
            .json(&body);

        if let Some(key) = &self.api_key {
            request = request.header("X-RapidAPI-Key", key);
            if let Some(host) = Url::parse(&self.url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
            {
                request = request.header("X-RapidAPI-Host", host);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SandboxError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Judge0Response = response.json().await?;
        Ok(ExecutionResult {
            stdout: decode_base64(raw.stdout),
            stderr: decode_base64(raw.stderr),
            compile_output: decode_base64(raw.compile_output),
            message: decode_base64(raw.message),
            status: raw.status,
            time: raw.time,
            memory: raw.memory,
        })
    }
}

/// Decodes a base64 field from Judge0, keeping the raw text when it is not valid base64.
fn decode_base64(field: Option<String>) -> Option<String> {
    let raw = field?;
    if raw.is_empty() {
        return None;
    }
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    match STANDARD.decode(compact) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(_) => Some(raw),
    }
}
