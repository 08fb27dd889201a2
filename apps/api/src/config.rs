use anyhow::{bail, Context, Result};

use crate::llm_client::ModelChoice;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MAX_CVS: usize = 10;
/// Per-document character budget; longer documents are cut from the end.
const DEFAULT_MAX_PROMPT_CHARS: usize = 38_000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub port: u16,
    pub rust_log: String,
    pub max_upload_bytes: usize,
    pub default_model: ModelChoice,
    pub limits: PipelineLimits,
}

/// The subset of configuration the matching pipeline depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineLimits {
    pub max_cvs: usize,
    pub max_prompt_chars: usize,
    /// Reject competency lists that break the count/weight rules instead of only warning.
    pub strict_competencies: bool,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            max_cvs: DEFAULT_MAX_CVS,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            strict_competencies: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let default_model = match std::env::var("DEFAULT_MODEL") {
            Ok(key) => match ModelChoice::from_key(&key) {
                Some(model) => model,
                None => bail!(
                    "DEFAULT_MODEL '{key}' is not one of: {}",
                    ModelChoice::keys().join(", ")
                ),
            },
            Err(_) => ModelChoice::default(),
        };

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string()),
            port: parse_env("PORT", 7860)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            default_model,
            limits: PipelineLimits {
                max_cvs: parse_env("MAX_CVS", DEFAULT_MAX_CVS)?,
                max_prompt_chars: parse_env("MAX_PROMPT_CHARS", DEFAULT_MAX_PROMPT_CHARS)?,
                strict_competencies: parse_env("STRICT_COMPETENCY_VALIDATION", true)?,
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
