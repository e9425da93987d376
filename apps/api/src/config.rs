use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key guarding `/v1/*`. Left optional so a missing secret
    /// surfaces as a 500 on every protected request instead of a crash loop.
    pub service_api_key: Option<String>,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub port: u16,
    pub rust_log: String,
    pub profiles_path: Option<PathBuf>,
    pub analysis_workers: usize,
    pub pdf_download_timeout_secs: u64,
    pub callback_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            service_api_key: optional_env("SERVICE_API_KEY"),
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_model: optional_env("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            openai_base_url: optional_env("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            profiles_path: optional_env("PROFILES_PATH").map(PathBuf::from),
            analysis_workers: parse_env::<usize>("ANALYSIS_WORKERS", 4)
                .context("ANALYSIS_WORKERS must be a positive integer")?
                .max(1),
            pdf_download_timeout_secs: parse_env("PDF_DOWNLOAD_TIMEOUT_SECS", 30)
                .context("PDF_DOWNLOAD_TIMEOUT_SECS must be a number of seconds")?,
            callback_timeout_secs: parse_env("CALLBACK_TIMEOUT_SECS", 10)
                .context("CALLBACK_TIMEOUT_SECS must be a number of seconds")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    optional_env(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads a variable, treating blank values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Invalid value '{raw}' for '{key}'")),
        None => Ok(default),
    }
}
