//! LLM client: the single point of entry for all generative-model calls.
//!
//! ARCHITECTURAL RULE: No other module may call the Gemini API directly.
//! Flows receive an `Arc<dyn ModelInvoker>` chosen once at startup:
//! `GeminiClient` when an API key is configured, `MockModel` otherwise.
//!
//! Model: gemini-2.5-flash, fixed for every live call.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::flows::schema::Schema;

pub mod gemini;
pub mod mock;
pub mod prompts;

pub use gemini::GeminiClient;
pub use mock::MockModel;

/// The model used for all live LLM calls.
pub const MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model invocation failed: {cause}")]
    Invocation { cause: String },

    #[error("model output is not valid JSON")]
    OutputParse { raw: String },
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Invocation {
            cause: e.to_string(),
        }
    }
}

/// What a backend handed back: free text, or JSON when an output schema was requested.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    Text(String),
    Structured(Value),
}

/// Gemini's harm categories. The full wire set is declared; flows pick from it.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    HarmCategoryHarassment,
    HarmCategoryHateSpeech,
    HarmCategorySexuallyExplicit,
    HarmCategoryDangerousContent,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Per-call generation options. Passed by reference into every `generate`
/// call; backends never keep it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelConfig {
    pub safety_settings: Vec<SafetySetting>,
    pub temperature: Option<f32>,
}

impl ModelConfig {
    pub fn with_safety(mut self, category: HarmCategory, threshold: HarmBlockThreshold) -> Self {
        self.safety_settings.push(SafetySetting {
            category,
            threshold,
        });
        self
    }
}

/// A generative-model backend.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Sends `prompt` to the model. When `output` is given the backend asks for
    /// JSON matching it and returns `RawResult::Structured`.
    async fn generate(
        &self,
        prompt: &str,
        output: Option<&Schema>,
        config: &ModelConfig,
    ) -> Result<RawResult, LlmError>;

    /// Short backend label for logs and the health endpoint.
    fn backend(&self) -> &'static str;
}

/// Chooses the backend for the lifetime of the process.
pub fn select_invoker(
    api_key: Option<String>,
    base_url: &str,
    mock_delay: Duration,
) -> Result<Arc<dyn ModelInvoker>, LlmError> {
    match api_key.filter(|key| !key.trim().is_empty()) {
        Some(key) => {
            info!("LLM client initialized (model: {MODEL})");
            Ok(Arc::new(GeminiClient::new(key, base_url)?))
        }
        None => {
            warn!(
                "No Gemini API key configured; AI flows will use the mock backend ({}ms delay)",
                mock_delay.as_millis()
            );
            Ok(Arc::new(MockModel::new(mock_delay)))
        }
    }
}

/// Parses model text as JSON, tolerating markdown code fences.
pub fn parse_structured(text: &str) -> Result<Value, LlmError> {
    serde_json::from_str(strip_json_fences(text)).map_err(|_| LlmError::OutputParse {
        raw: text.to_string(),
    })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
