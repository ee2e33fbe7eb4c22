//! Declared configuration schemas for extensions.
//!
//! An extension declares the shape of its configuration once; the runtime
//! validates every incoming document against it before any apply. A
//! partially-valid document is never applied.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The primitive type of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigFieldKind {
    /// UTF-8 string.
    String,
    /// 64-bit integer.
    Integer,
    /// Boolean.
    Boolean,
    /// 64-bit float.
    Float,
}

impl ConfigFieldKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Float => value.is_number(),
        }
    }
}

impl std::fmt::Display for ConfigFieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Boolean => write!(f, "boolean"),
            Self::Float => write!(f, "float"),
        }
    }
}

/// One field of a declared configuration schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigField {
    /// Field name.
    pub name: String,
    /// Expected type.
    pub kind: ConfigFieldKind,
    /// Whether the field must be present.
    pub required: bool,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

/// The full declared schema of an extension's configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSchema {
    /// Declared fields.
    pub fields: Vec<ConfigField>,
}

impl ConfigSchema {
    /// Start building a schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field to the schema.
    pub fn field(
        mut self,
        name: impl Into<String>,
        kind: ConfigFieldKind,
        required: bool,
        description: impl Into<String>,
    ) -> Self {
        self.fields.push(ConfigField {
            name: name.into(),
            kind,
            required,
            description: description.into(),
        });
        self
    }

    /// Validate a configuration document against the schema.
    ///
    /// Returns the full list of violations; an empty list means the document
    /// is valid. Unknown fields are rejected so typos surface immediately.
    pub fn validate(&self, value: &Value) -> Vec<String> {
        let mut errors = Vec::new();

        let Some(obj) = value.as_object() else {
            return vec!["configuration must be a JSON object".to_string()];
        };

        for field in &self.fields {
            match obj.get(&field.name) {
                None if field.required => {
                    errors.push(format!("missing required field '{}'", field.name));
                }
                Some(v) if !v.is_null() && !field.kind.matches(v) => {
                    errors.push(format!(
                        "field '{}' must be of type {}",
                        field.name, field.kind
                    ));
                }
                _ => {}
            }
        }

        for key in obj.keys() {
            if !self.fields.iter().any(|f| &f.name == key) {
                errors.push(format!("unknown field '{key}'"));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ConfigSchema {
        ConfigSchema::new()
            .field("delivery_url", ConfigFieldKind::String, true, "target URL")
            .field("retry_limit", ConfigFieldKind::Integer, false, "retries")
    }

    #[test]
    fn valid_document_has_no_errors() {
        let errors = schema().validate(&json!({
            "delivery_url": "https://example.com/hook",
            "retry_limit": 3,
        }));
        assert!(errors.is_empty());
    }

    #[test]
    fn missing_required_field_is_named() {
        let errors = schema().validate(&json!({ "retry_limit": 3 }));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("delivery_url"));
    }

    #[test]
    fn wrong_type_is_reported() {
        let errors = schema().validate(&json!({
            "delivery_url": "https://example.com/hook",
            "retry_limit": "three",
        }));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("retry_limit"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let errors = schema().validate(&json!({
            "delivery_url": "https://example.com/hook",
            "retry_limt": 3,
        }));
        assert!(errors.iter().any(|e| e.contains("retry_limt")));
    }

    #[test]
    fn non_object_document_is_rejected() {
        let errors = schema().validate(&json!([1, 2, 3]));
        assert_eq!(errors.len(), 1);
    }
}
