// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

/// Minimum aggregate score (inclusive) required to master a module.
pub const MASTERY_THRESHOLD: i64 = 90;

/// Points awarded for a fully correct question, regardless of its type.
pub const QUESTION_WEIGHT: i64 = 10;

/// Number of questions every generated quiz must contain.
pub const QUIZ_QUESTION_COUNT: usize = 10;

/// Hint shown when the hint service cannot produce one.
pub const HINT_FALLBACK: &str =
    "Check the failing test case carefully: compare your output format and edge cases with the expected output.";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub port: u16,

    /// Base URL of an OpenAI-compatible chat completions API.
    pub generator_base_url: String,
    pub generator_api_key: Option<String>,
    pub generator_model: String,
    pub generator_timeout: Duration,

    /// Judge0 submissions endpoint.
    pub judge0_url: String,
    pub judge0_api_key: Option<String>,
    pub sandbox_timeout: Duration,

    /// Insert the built-in subject catalog at start-up.
    pub seed_subjects: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let port = parsed("PORT", 3000)?;

        let generator_base_url = url_var("GENERATOR_BASE_URL", "https://api.openai.com/v1")?;
        let generator_api_key = env::var("GENERATOR_API_KEY").ok();
        let generator_model =
            env::var("GENERATOR_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let generator_timeout = Duration::from_secs(parsed("GENERATOR_TIMEOUT_SECS", 90)?);

        let judge0_url = url_var(
            "JUDGE0_URL",
            "https://judge0-ce.p.rapidapi.com/submissions",
        )?;
        let judge0_api_key = env::var("JUDGE0_API_KEY").ok();
        let sandbox_timeout = Duration::from_secs(parsed("SANDBOX_TIMEOUT_SECS", 15)?);

        let seed_subjects = parsed("SEED_SUBJECTS", false)?;

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            port,
            generator_base_url,
            generator_api_key,
            generator_model,
            generator_timeout,
            judge0_url,
            judge0_api_key,
            sandbox_timeout,
            seed_subjects,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

fn url_var(key: &'static str, default: &str) -> Result<String, ConfigError> {
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    if Url::parse(&value).is_err() {
        return Err(ConfigError::Invalid { key, value });
    }
    Ok(value.trim_end_matches('/').to_string())
}
