//! Live backend over the Gemini `generateContent` REST endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::prompts::JSON_ONLY_SYSTEM;
use super::{parse_structured, LlmError, ModelConfig, ModelInvoker, RawResult, SafetySetting, MODEL};
use crate::flows::schema::Schema;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "no_settings")]
    safety_settings: &'a [SafetySetting],
}

fn no_settings(settings: &&[SafetySetting]) -> bool {
    settings.is_empty()
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl GenerationConfig {
    fn build(output: Option<&Schema>, config: &ModelConfig) -> Option<Self> {
        if output.is_none() && config.temperature.is_none() {
            return None;
        }
        Some(Self {
            response_mime_type: output.map(|_| "application/json"),
            response_schema: output.map(Schema::response_schema),
            temperature: config.temperature,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Gemini REST client. Cheap to clone; shares one connection pool.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: &str) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key,
            endpoint: format!(
                "{}/models/{MODEL}:generateContent",
                base_url.trim_end_matches('/')
            ),
        })
    }
}

#[async_trait]
impl ModelInvoker for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        output: Option<&Schema>,
        config: &ModelConfig,
    ) -> Result<RawResult, LlmError> {
        let request_body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: output.map(|_| Content {
                role: None,
                parts: vec![Part {
                    text: JSON_ONLY_SYSTEM,
                }],
            }),
            generation_config: GenerationConfig::build(output, config),
            safety_settings: &config.safety_settings,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Invocation {
                cause: format!("Gemini API returned {}: {message}", status.as_u16()),
            });
        }

        let body: GenerateContentResponse = response.json().await?;

        if let Some(reason) = body
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(LlmError::Invocation {
                cause: format!("prompt blocked: {reason}"),
            });
        }

        if let Some(usage) = &body.usage_metadata {
            debug!(
                "LLM call succeeded: prompt_tokens={:?}, candidate_tokens={:?}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        let text = body.text().ok_or_else(|| LlmError::Invocation {
            cause: match body.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
                Some(reason) => format!("model returned no text (finish reason {reason})"),
                None => "model returned no candidates".to_string(),
            },
        })?;

        match output {
            Some(_) => parse_structured(&text).map(RawResult::Structured),
            None => Ok(RawResult::Text(text)),
        }
    }

    fn backend(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::schema::Field;
    use crate::llm_client::{HarmBlockThreshold, HarmCategory};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/models/gemini-2.5-flash:generateContent";

    fn text_reply(text: &str) -> Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 7 }
        })
    }

    async fn setup() -> (MockServer, GeminiClient) {
        let server = MockServer::start().await;
        let client = GeminiClient::new("test-key".to_string(), &server.uri()).unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn test_text_generation_sends_prompt_and_safety_settings() {
        let (server, client) = setup().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }],
                "safetySettings": [{
                    "category": "HARM_CATEGORY_DANGEROUS_CONTENT",
                    "threshold": "BLOCK_ONLY_HIGH"
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("Hi there")))
            .expect(1)
            .mount(&server)
            .await;

        let config = ModelConfig::default().with_safety(
            HarmCategory::HarmCategoryDangerousContent,
            HarmBlockThreshold::BlockOnlyHigh,
        );
        let result = client.generate("hello", None, &config).await.unwrap();
        assert_eq!(result, RawResult::Text("Hi there".to_string()));
    }

    #[tokio::test]
    async fn test_structured_generation_requests_json_and_parses() {
        let (server, client) = setup().await;
        let schema = Schema::object(vec![Field::string("optimizedResumeSuggestions", "tips")]);

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(body_partial_json(json!({
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseSchema": { "type": "OBJECT" }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(
                "```json\n{\"optimizedResumeSuggestions\": \"Add Rust keywords\"}\n```",
            )))
            .mount(&server)
            .await;

        let result = client
            .generate("optimize", Some(&schema), &ModelConfig::default())
            .await
            .unwrap();
        assert_eq!(
            result,
            RawResult::Structured(json!({ "optimizedResumeSuggestions": "Add Rust keywords" }))
        );
    }

    #[tokio::test]
    async fn test_malformed_structured_output_is_parse_error() {
        let (server, client) = setup().await;
        let schema = Schema::object(vec![Field::string("answer", "")]);

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("not json at all")))
            .mount(&server)
            .await;

        let err = client
            .generate("q", Some(&schema), &ModelConfig::default())
            .await
            .unwrap_err();
        match err {
            LlmError::OutputParse { raw } => assert_eq!(raw, "not json at all"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_api_error_is_not_retried() {
        let (server, client) = setup().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client
            .generate("q", None, &ModelConfig::default())
            .await
            .unwrap_err();
        match err {
            LlmError::Invocation { cause } => {
                assert!(cause.contains("503"));
                assert!(cause.contains("The model is overloaded."));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_invocation_error() {
        let (server, client) = setup().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let err = client
            .generate("q", None, &ModelConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Invocation { cause } if cause.contains("SAFETY")));
    }

    #[test]
    fn test_response_text_joins_parts() {
        let body: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello, " }, { "text": "world" }] } }]
        }))
        .unwrap();
        assert_eq!(body.text().as_deref(), Some("Hello, world"));
    }

    #[test]
    fn test_generation_config_omitted_for_plain_text() {
        assert!(GenerationConfig::build(None, &ModelConfig::default()).is_none());
    }
}
