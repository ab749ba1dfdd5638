//! Declarative value schemas shared by flow inputs, flow outputs and form bodies.
//!
//! A schema is either a bare string (`Schema::Text`) or an ordered list of
//! object fields (`Schema::Object`). Validation walks fields in declaration
//! order and stops at the first failure so error reports are reproducible.
//! Unknown fields are ignored and passed through untouched.

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Field name reported when a `Schema::Text` value fails validation.
pub const TEXT_FIELD: &str = "value";

/// Which rule a value broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Required,
    Type,
    MinLength,
    MinValue,
    ItemType,
    MinItems,
    MaxItems,
    OneOf,
}

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub constraint: Constraint,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Number,
    StringArray,
    Enum(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub description: String,
    pub optional: bool,
    pub min_length: Option<usize>,
    pub min_value: Option<f64>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

impl Field {
    fn new(name: &str, kind: FieldKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            optional: false,
            min_length: None,
            min_value: None,
            min_items: None,
            max_items: None,
        }
    }

    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, FieldKind::String, description)
    }

    pub fn number(name: &str, description: &str) -> Self {
        Self::new(name, FieldKind::Number, description)
    }

    pub fn string_array(name: &str, description: &str) -> Self {
        Self::new(name, FieldKind::StringArray, description)
    }

    pub fn one_of(name: &str, description: &str, variants: &[&str]) -> Self {
        let variants = variants.iter().map(|v| v.to_string()).collect();
        Self::new(name, FieldKind::Enum(variants), description)
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Minimum number of characters for string fields.
    pub fn min_length(mut self, chars: usize) -> Self {
        self.min_length = Some(chars);
        self
    }

    pub fn min_value(mut self, min: f64) -> Self {
        self.min_value = Some(min);
        self
    }

    pub fn min_items(mut self, min: usize) -> Self {
        self.min_items = Some(min);
        self
    }

    /// Inclusive bounds on the number of items in a string array.
    pub fn items(mut self, min: usize, max: usize) -> Self {
        self.min_items = Some(min);
        self.max_items = Some(max);
        self
    }

    fn fail(&self, constraint: Constraint, message: String) -> ValidationError {
        ValidationError {
            field: self.name.clone(),
            constraint,
            message,
        }
    }

    fn check(&self, value: Option<&Value>) -> Result<(), ValidationError> {
        // null counts as absent, matching how store patches clear fields
        let value = match value {
            None | Some(Value::Null) if self.optional => return Ok(()),
            None | Some(Value::Null) => {
                return Err(self.fail(Constraint::Required, format!("{} is required", self.name)))
            }
            Some(v) => v,
        };

        match &self.kind {
            FieldKind::String => {
                let text = value.as_str().ok_or_else(|| {
                    self.fail(Constraint::Type, format!("{} must be a string", self.name))
                })?;
                check_length(&self.name, text, self.min_length)
            }
            FieldKind::Number => {
                let number = value.as_f64().ok_or_else(|| {
                    self.fail(Constraint::Type, format!("{} must be a number", self.name))
                })?;
                match self.min_value {
                    Some(min) if number < min => Err(self.fail(
                        Constraint::MinValue,
                        format!("{} must be at least {min}", self.name),
                    )),
                    _ => Ok(()),
                }
            }
            FieldKind::StringArray => {
                let items = value.as_array().ok_or_else(|| {
                    self.fail(Constraint::Type, format!("{} must be an array", self.name))
                })?;
                if let Some(index) = items.iter().position(|item| !item.is_string()) {
                    return Err(self.fail(
                        Constraint::ItemType,
                        format!("{}[{index}] must be a string", self.name),
                    ));
                }
                if let Some(min) = self.min_items.filter(|min| items.len() < *min) {
                    return Err(self.fail(
                        Constraint::MinItems,
                        format!("{} must contain at least {min} items, got {}", self.name, items.len()),
                    ));
                }
                if let Some(max) = self.max_items.filter(|max| items.len() > *max) {
                    return Err(self.fail(
                        Constraint::MaxItems,
                        format!("{} must contain at most {max} items, got {}", self.name, items.len()),
                    ));
                }
                Ok(())
            }
            FieldKind::Enum(variants) => {
                let text = value.as_str().ok_or_else(|| {
                    self.fail(Constraint::Type, format!("{} must be a string", self.name))
                })?;
                if variants.iter().any(|v| v == text) {
                    Ok(())
                } else {
                    Err(self.fail(
                        Constraint::OneOf,
                        format!("{} must be one of: {}", self.name, variants.join(", ")),
                    ))
                }
            }
        }
    }

    fn response_schema(&self) -> Value {
        let mut schema = match &self.kind {
            FieldKind::String => json!({ "type": "STRING" }),
            FieldKind::Number => json!({ "type": "NUMBER" }),
            FieldKind::StringArray => {
                let mut array = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
                if let Some(min) = self.min_items {
                    array["minItems"] = json!(min);
                }
                if let Some(max) = self.max_items {
                    array["maxItems"] = json!(max);
                }
                array
            }
            FieldKind::Enum(variants) => {
                json!({ "type": "STRING", "format": "enum", "enum": variants })
            }
        };
        if !self.description.is_empty() {
            schema["description"] = json!(self.description);
        }
        schema
    }
}

fn check_length(field: &str, text: &str, min_length: Option<usize>) -> Result<(), ValidationError> {
    match min_length {
        Some(min) if text.chars().count() < min => Err(ValidationError {
            field: field.to_string(),
            constraint: Constraint::MinLength,
            message: format!("{field} must be at least {min} characters"),
        }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone)]
pub enum Schema {
    /// The whole value is a single string.
    Text {
        description: String,
        min_length: Option<usize>,
    },
    Object {
        fields: Vec<Field>,
    },
}

impl Schema {
    pub fn text(description: &str, min_length: Option<usize>) -> Self {
        Schema::Text {
            description: description.to_string(),
            min_length,
        }
    }

    pub fn object(fields: Vec<Field>) -> Self {
        Schema::Object { fields }
    }

    /// True when the schema describes a JSON object rather than free text.
    pub fn is_structured(&self) -> bool {
        matches!(self, Schema::Object { .. })
    }

    pub fn fields(&self) -> &[Field] {
        match self {
            Schema::Object { fields } => fields,
            Schema::Text { .. } => &[],
        }
    }

    /// Checks `value` against the schema and hands it back unchanged.
    pub fn validate<'a>(&self, value: &'a Value) -> Result<&'a Value, ValidationError> {
        match self {
            Schema::Text { min_length, .. } => {
                let text = value.as_str().ok_or_else(|| ValidationError {
                    field: TEXT_FIELD.to_string(),
                    constraint: Constraint::Type,
                    message: "expected a string".to_string(),
                })?;
                check_length(TEXT_FIELD, text, *min_length)?;
            }
            Schema::Object { fields } => {
                let object = value.as_object().ok_or_else(|| ValidationError {
                    field: TEXT_FIELD.to_string(),
                    constraint: Constraint::Type,
                    message: "expected a JSON object".to_string(),
                })?;
                for field in fields {
                    field.check(object.get(&field.name))?;
                }
            }
        }
        Ok(value)
    }

    /// Renders the schema in the OpenAPI subset accepted as a Gemini
    /// `responseSchema`.
    pub fn response_schema(&self) -> Value {
        match self {
            Schema::Text { description, .. } => {
                json!({ "type": "STRING", "description": description })
            }
            Schema::Object { fields } => {
                let properties: Map<String, Value> = fields
                    .iter()
                    .map(|f| (f.name.clone(), f.response_schema()))
                    .collect();
                let required: Vec<&str> = fields
                    .iter()
                    .filter(|f| !f.optional)
                    .map(|f| f.name.as_str())
                    .collect();
                let ordering: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
                json!({
                    "type": "OBJECT",
                    "properties": properties,
                    "required": required,
                    "propertyOrdering": ordering,
                })
            }
        }
    }
}
