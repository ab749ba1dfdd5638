use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::gemini::DEFAULT_BASE_URL;
use crate::llm_client::mock::DEFAULT_MOCK_DELAY;

/// Application configuration loaded from environment variables.
/// Everything has a default, so an empty environment yields a runnable
/// mock-backed, in-memory server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Live model credentials; `None` selects the mock backend.
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub mock_delay: Duration,
    /// Postgres connection string; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let mock_delay = match optional_env("MOCK_DELAY_MS") {
            Some(ms) => Duration::from_millis(
                ms.parse::<u64>()
                    .context("MOCK_DELAY_MS must be a whole number of milliseconds")?,
            ),
            None => DEFAULT_MOCK_DELAY,
        };

        Ok(Config {
            gemini_api_key: optional_env("GEMINI_API_KEY").or_else(|| optional_env("GOOGLE_API_KEY")),
            gemini_base_url: optional_env("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            mock_delay,
            database_url: optional_env("DATABASE_URL"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Reads a variable, treating unset and blank the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
