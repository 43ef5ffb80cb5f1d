//! Model-facing function declarations.
//!
//! A declaration is what the model sees of a registered function: its
//! name, description and parameter schema. Handlers and suspension
//! behavior stay with the engine's registry.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Declaration of a function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// Unique function name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema for the arguments.
    pub parameters: JsonValue,
}

impl FunctionDeclaration {
    /// Creates a declaration that takes no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: empty_parameters(),
        }
    }

    /// Sets the parameter schema.
    #[must_use]
    pub fn with_parameters(mut self, schema: JsonValue) -> Self {
        self.parameters = schema;
        self
    }

    /// Converts the declaration to the shape most model APIs expect.
    #[must_use]
    pub fn to_llm_format(&self) -> JsonValue {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.parameters
        })
    }
}

/// Schema used for functions declared without parameters.
#[must_use]
pub fn empty_parameters() -> JsonValue {
    serde_json::json!({ "type": "object", "properties": {} })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_defaults_to_empty_object_schema() {
        let decl = FunctionDeclaration::new("ping", "Check liveness");
        assert_eq!(decl.parameters, serde_json::json!({"type": "object", "properties": {}}));
    }

    #[test]
    fn declaration_llm_format() {
        let decl = FunctionDeclaration::new("calculate", "Do math").with_parameters(
            serde_json::json!({
                "type": "object",
                "properties": { "expression": { "type": "string" } }
            }),
        );

        let llm = decl.to_llm_format();
        assert_eq!(llm["name"], "calculate");
        assert_eq!(llm["parameters"]["properties"]["expression"]["type"], "string");
    }
}
