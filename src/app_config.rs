//! Application configuration document.
//!
//! The survey front end is driven by a single YAML document passed in the
//! `CONFIG` environment variable. It is parsed once at startup into an
//! [`AppConfig`] and shared read-only with every request handler.
//!
//! ```yaml
//! title: Team retrospective
//! questions:
//!   - id: mood
//!     text: How did the sprint go?
//!     kind: scale
//! ```
//!
//! Only `title` and `questions` are required. Other top-level keys are kept
//! so they can be inspected, but no endpoint exposes them.

use serde_json::{Map, Value};

use crate::error::AppConfigError;

/// Name of the environment variable holding the YAML document.
pub const CONFIG_ENV_VAR: &str = "CONFIG";

/// Immutable application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    title: String,
    questions: Value,
    extra: Map<String, Value>,
}

impl AppConfig {
    /// Build a configuration directly from its required values.
    pub fn new(title: impl Into<String>, questions: Value) -> Self {
        Self {
            title: title.into(),
            questions,
            extra: Map::new(),
        }
    }

    /// Load the configuration from the `CONFIG` environment variable.
    pub fn from_env() -> Result<Self, AppConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(document) => Self::from_yaml(&document),
            Err(_) => Err(AppConfigError::Missing),
        }
    }

    /// Parse a YAML document.
    ///
    /// Merge keys (`<<: *anchor`) are resolved before the document is turned
    /// into JSON values. Scalar mapping keys are taken as strings and tags
    /// are dropped.
    pub fn from_yaml(document: &str) -> Result<Self, AppConfigError> {
        let mut yaml: serde_yaml::Value = serde_yaml::from_str(document)?;
        yaml.apply_merge()?;
        let value = yaml_to_json(yaml)?;

        let mut mapping = match value {
            Value::Object(mapping) => mapping,
            Value::Null => {
                return Err(AppConfigError::Invalid("document is empty".to_string()));
            }
            other => {
                return Err(AppConfigError::Invalid(format!(
                    "expected a mapping at the top level, got {}",
                    json_kind(&other)
                )));
            }
        };

        let title = match mapping.remove("title") {
            Some(Value::String(title)) => title,
            Some(other) => {
                return Err(AppConfigError::Invalid(format!(
                    "'title' must be a string, got {}",
                    json_kind(&other)
                )));
            }
            None => return Err(AppConfigError::MissingKey("title")),
        };

        let questions = mapping
            .remove("questions")
            .ok_or(AppConfigError::MissingKey("questions"))?;

        Ok(Self {
            title,
            questions,
            extra: mapping,
        })
    }

    /// Survey title shown by the front end.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Question definitions, returned to clients untouched.
    pub fn questions(&self) -> &Value {
        &self.questions
    }

    /// Look up a top-level key other than `title` and `questions`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Number of questions when `questions` is a sequence or mapping.
    pub fn question_count(&self) -> Option<usize> {
        match &self.questions {
            Value::Array(items) => Some(items.len()),
            Value::Object(items) => Some(items.len()),
            _ => None,
        }
    }
}

/// Convert a YAML value into the JSON value served to clients.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, AppConfigError> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => yaml_number(&n)?,
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>, AppConfigError>>()?,
        ),
        Yaml::Mapping(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_number(n: &serde_yaml::Number) -> Result<Value, AppConfigError> {
    if let Some(i) = n.as_i64() {
        Ok(Value::from(i))
    } else if let Some(u) = n.as_u64() {
        Ok(Value::from(u))
    } else {
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| AppConfigError::Invalid(format!("{} has no JSON representation", n)))
    }
}

fn yaml_key(key: serde_yaml::Value) -> Result<String, AppConfigError> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Null => Ok("null".to_string()),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        Yaml::Sequence(_) | Yaml::Mapping(_) => Err(AppConfigError::Invalid(
            "mapping keys must be scalars".to_string(),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

// =============================================================================
// Tests
// =============================================================================
