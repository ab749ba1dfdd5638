//! AI flows: named, schema-typed wrappers around a single model call.
//!
//! Pipeline per invocation:
//! validate input → render prompt → `ModelInvoker::generate` → validate output.
//!
//! A failure at any stage ends the invocation; nothing is retried and nothing
//! is carried over to the next call. Definitions live in a `FlowRegistry`
//! that is built once at startup and only read afterwards.

pub mod definitions;
pub mod handlers;
pub mod prompts;
pub mod schema;
pub mod template;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::bail;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::{parse_structured, LlmError, ModelConfig, ModelInvoker, RawResult};
use schema::{Constraint, Schema, ValidationError, TEXT_FIELD};
use template::{render, MissingVariableError};

/// Template variable that receives a flow input declared as `Schema::Text`.
pub const INPUT_VARIABLE: &str = "input";

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Unknown flow '{0}'")]
    UnknownFlow(String),

    #[error("Invalid flow input: {0}")]
    InputValidation(ValidationError),

    #[error(transparent)]
    MissingVariable(#[from] MissingVariableError),

    #[error("Model invocation failed: {cause}")]
    ModelInvocation { cause: String },

    #[error("Model output could not be parsed as JSON")]
    OutputParse { raw: String },

    #[error("Invalid flow output: {0}")]
    OutputValidation(ValidationError),
}

impl From<LlmError> for FlowError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Invocation { cause } => FlowError::ModelInvocation { cause },
            LlmError::OutputParse { raw } => FlowError::OutputParse { raw },
        }
    }
}

/// Where an invocation currently is. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    Idle,
    ValidatingInput,
    Rendering,
    Invoking,
    ValidatingOutput,
    Done,
    Failed,
}

impl fmt::Display for FlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FlowStage::Idle => "idle",
            FlowStage::ValidatingInput => "validating-input",
            FlowStage::Rendering => "rendering",
            FlowStage::Invoking => "invoking",
            FlowStage::ValidatingOutput => "validating-output",
            FlowStage::Done => "done",
            FlowStage::Failed => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct FlowDefinition {
    pub name: &'static str,
    pub input_schema: Schema,
    pub output_schema: Schema,
    pub prompt_template: &'static str,
    pub model_config: ModelConfig,
}

/// Read-only catalogue of flows keyed by name.
#[derive(Debug, Default)]
pub struct FlowRegistry {
    flows: HashMap<&'static str, FlowDefinition>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition. Names are unique for the life of the process, and
    /// every template placeholder must be bound by the input schema.
    pub fn register(&mut self, definition: FlowDefinition) -> anyhow::Result<()> {
        if self.flows.contains_key(definition.name) {
            bail!("flow '{}' is already registered", definition.name);
        }
        for name in template::placeholders(definition.prompt_template) {
            let bound = if definition.input_schema.is_structured() {
                definition.input_schema.fields().iter().any(|f| f.name == name)
            } else {
                name == INPUT_VARIABLE
            };
            if !bound {
                bail!(
                    "flow '{}' template references undeclared variable '{name}'",
                    definition.name
                );
            }
        }
        self.flows.insert(definition.name, definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FlowDefinition> {
        self.flows.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.flows.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Entry point used by handlers: the registry plus the backend chosen at startup.
#[derive(Clone)]
pub struct Flows {
    registry: Arc<FlowRegistry>,
    invoker: Arc<dyn ModelInvoker>,
}

impl Flows {
    pub fn new(registry: Arc<FlowRegistry>, invoker: Arc<dyn ModelInvoker>) -> Self {
        Self { registry, invoker }
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &'static str {
        self.invoker.backend()
    }

    /// Runs the named flow against a JSON input.
    pub async fn invoke(&self, name: &str, input: Value) -> Result<Value, FlowError> {
        let definition = self
            .registry
            .get(name)
            .ok_or_else(|| FlowError::UnknownFlow(name.to_string()))?;
        run(definition, self.invoker.as_ref(), input).await
    }

    /// Typed variant of [`Flows::invoke`].
    pub async fn invoke_typed<I, O>(&self, name: &str, input: &I) -> Result<O, FlowError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let input = serde_json::to_value(input).map_err(|e| {
            FlowError::InputValidation(ValidationError {
                field: TEXT_FIELD.to_string(),
                constraint: Constraint::Type,
                message: e.to_string(),
            })
        })?;
        let output = self.invoke(name, input).await?;
        serde_json::from_value(output).map_err(|e| {
            FlowError::OutputValidation(ValidationError {
                field: TEXT_FIELD.to_string(),
                constraint: Constraint::Type,
                message: e.to_string(),
            })
        })
    }
}

/// Tracks one invocation through its stages and logs each transition.
struct FlowRun {
    flow: &'static str,
    stage: FlowStage,
}

impl FlowRun {
    fn start(flow: &'static str) -> Self {
        Self {
            flow,
            stage: FlowStage::Idle,
        }
    }

    fn enter(&mut self, next: FlowStage) {
        debug!(flow = self.flow, from = %self.stage, to = %next, "flow stage");
        self.stage = next;
    }

    fn fail(&mut self, error: FlowError) -> FlowError {
        warn!(flow = self.flow, stage = %self.stage, "flow failed: {error}");
        self.stage = FlowStage::Failed;
        error
    }
}

/// Executes one definition end to end.
pub async fn run(
    definition: &FlowDefinition,
    invoker: &dyn ModelInvoker,
    input: Value,
) -> Result<Value, FlowError> {
    let mut tracker = FlowRun::start(definition.name);

    tracker.enter(FlowStage::ValidatingInput);
    if let Err(e) = definition.input_schema.validate(&input) {
        return Err(tracker.fail(FlowError::InputValidation(e)));
    }

    tracker.enter(FlowStage::Rendering);
    let variables = bind_variables(input);
    let prompt = render(definition.prompt_template, &variables).map_err(|e| tracker.fail(e.into()))?;

    tracker.enter(FlowStage::Invoking);
    let output_hint = definition
        .output_schema
        .is_structured()
        .then_some(&definition.output_schema);
    let raw = invoker
        .generate(&prompt, output_hint, &definition.model_config)
        .await
        .map_err(|e| tracker.fail(e.into()))?;

    tracker.enter(FlowStage::ValidatingOutput);
    let output = into_value(raw, &definition.output_schema).map_err(|e| tracker.fail(e))?;
    if let Err(e) = definition.output_schema.validate(&output) {
        return Err(tracker.fail(FlowError::OutputValidation(e)));
    }

    tracker.enter(FlowStage::Done);
    Ok(output)
}

fn bind_variables(input: Value) -> Map<String, Value> {
    match input {
        Value::Object(fields) => fields,
        other => {
            let mut variables = Map::new();
            variables.insert(INPUT_VARIABLE.to_string(), other);
            variables
        }
    }
}

fn into_value(raw: RawResult, schema: &Schema) -> Result<Value, FlowError> {
    match raw {
        RawResult::Structured(value) => Ok(value),
        RawResult::Text(text) if schema.is_structured() => Ok(parse_structured(&text)?),
        RawResult::Text(text) => Ok(Value::String(text)),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedInvoker;
    use super::*;
    use schema::Field;
    use serde_json::json;

    fn greeting_flow() -> FlowDefinition {
        FlowDefinition {
            name: "greeting",
            input_schema: Schema::object(vec![Field::string("name", "Who to greet").min_length(2)]),
            output_schema: Schema::object(vec![Field::string("message", "The greeting").min_length(1)]),
            prompt_template: "Greet {{{name}}} warmly.",
            model_config: ModelConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_happy_path_renders_and_validates() {
        let invoker = ScriptedInvoker::replying(RawResult::Structured(json!({ "message": "Hi Ada" })));
        let output = run(&greeting_flow(), &invoker, json!({ "name": "Ada" }))
            .await
            .unwrap();

        assert_eq!(output, json!({ "message": "Hi Ada" }));
        assert_eq!(invoker.prompts.lock().unwrap()[0], "Greet Ada warmly.");
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_model() {
        let invoker = ScriptedInvoker::replying(RawResult::Structured(json!({ "message": "x" })));
        let err = run(&greeting_flow(), &invoker, json!({ "name": "A" }))
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::InputValidation(ref e) if e.field == "name"));
        assert_eq!(invoker.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_template_variable_stops_before_model() {
        let mut flow = greeting_flow();
        flow.prompt_template = "Greet {{{name}}} from {{{company}}}.";
        let invoker = ScriptedInvoker::replying(RawResult::Structured(json!({ "message": "x" })));

        let err = run(&flow, &invoker, json!({ "name": "Ada" })).await.unwrap_err();

        match err {
            FlowError::MissingVariable(e) => assert_eq!(e.name, "company"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(invoker.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_failure_propagates_unchanged() {
        let invoker = ScriptedInvoker::failing("connection reset");
        let err = run(&greeting_flow(), &invoker, json!({ "name": "Ada" }))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::ModelInvocation { ref cause } if cause == "connection reset"));
        assert_eq!(invoker.call_count(), 1);
    }

    #[tokio::test]
    async fn test_output_not_matching_schema_is_terminal() {
        let invoker = ScriptedInvoker::replying(RawResult::Structured(json!({ "greeting": "Hi" })));
        let err = run(&greeting_flow(), &invoker, json!({ "name": "Ada" }))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::OutputValidation(ref e) if e.field == "message"));
        assert_eq!(invoker.call_count(), 1);
    }

    #[tokio::test]
    async fn test_text_reply_for_structured_schema_is_parsed() {
        let invoker = ScriptedInvoker::replying(RawResult::Text("{\"message\": \"Hello\"}".to_string()));
        let output = run(&greeting_flow(), &invoker, json!({ "name": "Ada" }))
            .await
            .unwrap();
        assert_eq!(output["message"], "Hello");

        let invoker = ScriptedInvoker::replying(RawResult::Text("Hello there".to_string()));
        let err = run(&greeting_flow(), &invoker, json!({ "name": "Ada" }))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::OutputParse { ref raw } if raw == "Hello there"));
    }

    #[tokio::test]
    async fn test_text_input_binds_to_input_variable() {
        let flow = FlowDefinition {
            name: "echo",
            input_schema: Schema::text("prompt", Some(1)),
            output_schema: Schema::text("reply", None),
            prompt_template: "{{{input}}}",
            model_config: ModelConfig::default(),
        };
        let invoker = ScriptedInvoker::replying(RawResult::Text("pong".to_string()));

        let output = run(&flow, &invoker, json!("ping")).await.unwrap();

        assert_eq!(output, json!("pong"));
        assert_eq!(invoker.prompts.lock().unwrap()[0], "ping");
    }

    #[test]
    fn test_registry_rejects_duplicate_names() {
        let mut registry = FlowRegistry::new();
        registry.register(greeting_flow()).unwrap();
        assert!(registry.register(greeting_flow()).is_err());
        assert_eq!(registry.names(), vec!["greeting"]);
    }

    #[test]
    fn test_register_rejects_unbound_placeholders() {
        let mut flow = greeting_flow();
        flow.prompt_template = "Greet {{{name}}} from {{{company}}}.";
        let err = FlowRegistry::new().register(flow).unwrap_err();
        assert!(err.to_string().contains("company"));
    }

    #[tokio::test]
    async fn test_unknown_flow() {
        let flows = Flows::new(
            Arc::new(FlowRegistry::new()),
            Arc::new(ScriptedInvoker::failing("unused")),
        );
        let err = flows.invoke("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, FlowError::UnknownFlow(ref name) if name == "nope"));
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(FlowStage::ValidatingInput.to_string(), "validating-input");
        assert_eq!(FlowStage::Failed.to_string(), "error");
    }
}
