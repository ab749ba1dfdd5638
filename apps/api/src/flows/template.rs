//! Prompt template rendering with `{{{name}}}` placeholders.
//!
//! Values are inserted verbatim (no escaping). Substituted text is never
//! rescanned, so user input containing braces cannot inject placeholders.

use serde_json::{Map, Value};
use thiserror::Error;

const OPEN: &str = "{{{";
const CLOSE: &str = "}}}";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("prompt variable '{name}' has no value")]
pub struct MissingVariableError {
    pub name: String,
}

/// Substitutes every placeholder in `template` with its variable.
///
/// A placeholder with no variable, or one bound to `null`, is an error.
/// An unterminated `{{{` is copied through literally.
pub fn render(template: &str, variables: &Map<String, Value>) -> Result<String, MissingVariableError> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };

        rendered.push_str(&rest[..start]);

        let name = after_open[..end].trim();
        let value = variables
            .get(name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| MissingVariableError {
                name: name.to_string(),
            })?;
        push_value(&mut rendered, value);

        rest = &after_open[end + CLOSE.len()..];
    }

    rendered.push_str(rest);
    Ok(rendered)
}

/// Names of all placeholders in order of appearance (duplicates kept).
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };
        names.push(after_open[..end].trim());
        rest = &after_open[end + CLOSE.len()..];
    }
    names
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Array(items) if items.iter().all(Value::is_string) => {
            let joined: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            out.push_str(&joined.join(", "));
        }
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test variables must be an object"),
        }
    }

    #[test]
    fn test_substitutes_values_verbatim() {
        let template = "Role: '{{{jobTitle}}}'\n\nJob Description:\n{{{jobDescription}}}";
        let rendered = render(
            template,
            &vars(json!({
                "jobTitle": "Staff <Rust> & Go Engineer",
                "jobDescription": "Own the \"core\" platform."
            })),
        )
        .unwrap();

        assert!(rendered.contains("Staff <Rust> & Go Engineer"));
        assert!(rendered.contains("Own the \"core\" platform."));
        assert!(!rendered.contains("{{{"));
        assert!(!rendered.contains("}}}"));
    }

    #[test]
    fn test_missing_variable_is_named() {
        let err = render(
            "{{{jobTitle}}} / {{{jobDescription}}}",
            &vars(json!({ "jobTitle": "Engineer" })),
        )
        .unwrap_err();
        assert_eq!(err.name, "jobDescription");
    }

    #[test]
    fn test_null_variable_counts_as_missing() {
        let err = render("{{{resume}}}", &vars(json!({ "resume": null }))).unwrap_err();
        assert_eq!(err.name, "resume");
    }

    #[test]
    fn test_inner_whitespace_is_trimmed() {
        let rendered = render("Hi {{{ name }}}!", &vars(json!({ "name": "Ada" }))).unwrap();
        assert_eq!(rendered, "Hi Ada!");
    }

    #[test]
    fn test_non_string_values() {
        let rendered = render(
            "{{{skills}}} | {{{salary}}} | {{{remote}}}",
            &vars(json!({ "skills": ["Rust", "SQL"], "salary": 120000, "remote": true })),
        )
        .unwrap();
        assert_eq!(rendered, "Rust, SQL | 120000 | true");
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let rendered = render(
            "{{{a}}}",
            &vars(json!({ "a": "{{{b}}}" })),
        )
        .unwrap();
        assert_eq!(rendered, "{{{b}}}");
    }

    #[test]
    fn test_unterminated_marker_is_literal() {
        let rendered = render("open {{{ never closed", &Map::new()).unwrap();
        assert_eq!(rendered, "open {{{ never closed");
    }

    #[test]
    fn test_template_without_placeholders() {
        assert_eq!(render("plain", &Map::new()).unwrap(), "plain");
    }

    #[test]
    fn test_placeholders_in_order() {
        assert_eq!(
            placeholders("{{{a}}} then {{{ b }}} then {{{a}}}"),
            vec!["a", "b", "a"]
        );
    }
}
