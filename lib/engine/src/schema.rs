//! Argument validation against a function's parameter schema.

use crate::error::{RegistryError, ValidationError};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value as JsonValue;
use std::fmt;

/// A compiled parameter schema.
pub struct ArgumentSchema {
    raw: JsonValue,
    compiled: JSONSchema,
}

impl ArgumentSchema {
    /// Compiles `raw` for the function `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidSchema`] if `raw` is not a valid schema.
    pub fn compile(name: &str, raw: JsonValue) -> Result<Self, RegistryError> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&raw)
            .map_err(|e| RegistryError::InvalidSchema {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { raw, compiled })
    }

    /// Validates arguments for `function`, returning them normalised.
    ///
    /// Models send `null` for functions without parameters; that is treated
    /// as `{}`.
    ///
    /// # Errors
    ///
    /// Returns every violation found.
    pub fn validate(
        &self,
        function: &str,
        arguments: &JsonValue,
    ) -> Result<JsonValue, ValidationError> {
        let arguments = normalize_arguments(arguments);
        let violations: Vec<String> = match self.compiled.validate(&arguments) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{path}: {e}")
                    }
                })
                .collect(),
        };

        if violations.is_empty() {
            Ok(arguments)
        } else {
            Err(ValidationError {
                function: function.to_string(),
                violations,
            })
        }
    }
}

impl fmt::Debug for ArgumentSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentSchema")
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

/// Maps `null` arguments to an empty object.
#[must_use]
pub fn normalize_arguments(arguments: &JsonValue) -> JsonValue {
    if arguments.is_null() {
        JsonValue::Object(serde_json::Map::new())
    } else {
        arguments.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deferral_conversation::function::empty_parameters;

    fn expense_schema() -> JsonValue {
        serde_json::json!({
            "type": "object",
            "properties": {
                "amount": { "type": "number" },
                "doc": { "type": "string" }
            },
            "required": ["amount", "doc"]
        })
    }

    #[test]
    fn valid_arguments_pass() {
        let schema = ArgumentSchema::compile("expense_approval", expense_schema()).expect("compile");
        let args = serde_json::json!({"amount": 250, "doc": "Office supplies"});
        assert_eq!(schema.validate("expense_approval", &args).expect("valid"), args);
    }

    #[test]
    fn violations_are_collected() {
        let schema = ArgumentSchema::compile("expense_approval", expense_schema()).expect("compile");
        let err = schema
            .validate("expense_approval", &serde_json::json!({"amount": "lots"}))
            .expect_err("invalid");

        assert_eq!(err.function, "expense_approval");
        assert_eq!(err.violations.len(), 2);
        assert!(err.violations.iter().any(|v| v.starts_with("/amount")));
    }

    #[test]
    fn null_arguments_become_empty_object() {
        let schema = ArgumentSchema::compile("now", empty_parameters()).expect("compile");
        let args = schema.validate("now", &JsonValue::Null).expect("valid");
        assert_eq!(args, serde_json::json!({}));
    }

    #[test]
    fn empty_schema_rejects_non_objects() {
        let schema = ArgumentSchema::compile("now", empty_parameters()).expect("compile");
        assert!(schema.validate("now", &serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn invalid_schema_is_rejected() {
        let err = ArgumentSchema::compile("broken", serde_json::json!({"type": "not-a-type"}))
            .expect_err("invalid schema");
        assert!(matches!(err, RegistryError::InvalidSchema { .. }));
    }
}
