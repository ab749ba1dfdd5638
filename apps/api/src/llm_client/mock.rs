//! Offline stand-in for the Gemini backend.
//!
//! Used when no API key is configured. Every call waits a fixed delay and then
//! echoes the prompt; structured requests get a value synthesized from the
//! output schema so downstream validation still passes.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::prompts::mock_reply;
use super::{LlmError, ModelConfig, ModelInvoker, RawResult};
use crate::flows::schema::{Field, FieldKind, Schema};

/// Delay applied before every mock reply unless configured otherwise.
pub const DEFAULT_MOCK_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct MockModel {
    delay: Duration,
}

impl MockModel {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_DELAY)
    }
}

#[async_trait]
impl ModelInvoker for MockModel {
    async fn generate(
        &self,
        prompt: &str,
        output: Option<&Schema>,
        _config: &ModelConfig,
    ) -> Result<RawResult, LlmError> {
        tokio::time::sleep(self.delay).await;

        let reply = mock_reply(prompt);
        Ok(match output {
            Some(schema) => RawResult::Structured(synthesize(schema, &reply)),
            None => RawResult::Text(reply),
        })
    }

    fn backend(&self) -> &'static str {
        "mock"
    }
}

fn synthesize(schema: &Schema, reply: &str) -> Value {
    match schema {
        Schema::Text { .. } => Value::String(reply.to_string()),
        Schema::Object { fields } => {
            let object: Map<String, Value> = fields
                .iter()
                .map(|field| (field.name.clone(), placeholder(field, reply)))
                .collect();
            Value::Object(object)
        }
    }
}

fn placeholder(field: &Field, reply: &str) -> Value {
    match &field.kind {
        FieldKind::String => Value::String(reply.to_string()),
        FieldKind::Number => json!(field.min_value.unwrap_or(0.0)),
        FieldKind::StringArray => {
            let count = field.min_items.unwrap_or(1).max(1);
            (1..=count)
                .map(|i| Value::String(format!("Mock item {i}: {reply}")))
                .collect()
        }
        FieldKind::Enum(variants) => variants
            .first()
            .map(|v| Value::String(v.clone()))
            .unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::prompts::MOCK_REPLY_PREFIX;

    #[tokio::test(start_paused = true)]
    async fn test_text_reply_echoes_prompt_after_delay() {
        let model = MockModel::default();
        let started = tokio::time::Instant::now();

        let result = model
            .generate("hello", None, &ModelConfig::default())
            .await
            .unwrap();

        assert!(started.elapsed() >= DEFAULT_MOCK_DELAY);
        match result {
            RawResult::Text(text) => {
                assert!(text.starts_with(MOCK_REPLY_PREFIX));
                assert!(text.contains("\"hello\""));
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_structured_reply_satisfies_schema() {
        let schema = Schema::object(vec![
            Field::string("summary", "").min_length(10),
            Field::string_array("questions", "").items(5, 7),
            Field::number("score", "").min_value(1.0),
            Field::one_of("tone", "", &["formal", "casual"]),
        ]);
        let model = MockModel::new(Duration::ZERO);

        let result = model
            .generate("Describe the role", Some(&schema), &ModelConfig::default())
            .await
            .unwrap();

        let RawResult::Structured(value) = result else {
            panic!("expected structured output");
        };
        schema.validate(&value).unwrap();
        assert_eq!(value["questions"].as_array().unwrap().len(), 5);
        assert_eq!(value["tone"], "formal");
        assert!(value["summary"].as_str().unwrap().contains("Describe the role"));
    }

    #[tokio::test]
    async fn test_replies_are_deterministic() {
        let model = MockModel::new(Duration::ZERO);
        let config = ModelConfig::default();
        let first = model.generate("same", None, &config).await.unwrap();
        let second = model.generate("same", None, &config).await.unwrap();
        assert_eq!(first, second);
    }
}
