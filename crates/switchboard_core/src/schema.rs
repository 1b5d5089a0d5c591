//! Deterministic structural validation.
//!
//! The supported vocabulary is the subset agents actually declare: `type`,
//! `properties`, `required`, `items`, and `enum`. This is a "does it look
//! conformant" check, not a full JSON-Schema implementation; anything the
//! vocabulary doesn't cover is accepted.

use serde_json::Value;

/// A structural contract over JSON values.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralSchema {
    root: Value,
}

impl StructuralSchema {
    pub fn new(schema: Value) -> Self {
        Self { root: schema }
    }

    /// Validate a value. An empty error list means the value conforms.
    pub fn validate(&self, value: &Value) -> Vec<String> {
        let mut errors = Vec::new();
        check(&self.root, value, "$", &mut errors);
        errors
    }

    /// Convenience boolean form of [`validate`](Self::validate).
    pub fn matches(&self, value: &Value) -> bool {
        self.validate(value).is_empty()
    }

    /// Validate raw model output.
    ///
    /// When the schema describes a string, the raw text is the value. For any
    /// other declared type the text must parse as JSON first.
    pub fn check_text(&self, text: &str) -> Vec<String> {
        if self.expects_type("string") {
            return self.validate(&Value::String(text.to_string()));
        }
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.validate(&value),
            Err(e) => vec![format!("$: output is not valid JSON: {e}")],
        }
    }

    fn expects_type(&self, name: &str) -> bool {
        match self.root.get("type") {
            Some(Value::String(t)) => t == name,
            Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(name)),
            _ => false,
        }
    }
}

fn check(schema: &Value, value: &Value, path: &str, errors: &mut Vec<String>) {
    let Some(schema) = schema.as_object() else {
        // A non-object schema constrains nothing
        return;
    };

    if let Some(expected) = schema.get("type") {
        if !type_matches(expected, value) {
            errors.push(format!(
                "{path}: expected type {expected}, got {}",
                type_name(value)
            ));
            // Nothing below can be meaningfully checked against the wrong type
            return;
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            errors.push(format!("{path}: value not in enum"));
        }
    }

    if let Some(object) = value.as_object() {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for field in required.iter().filter_map(Value::as_str) {
                if !object.contains_key(field) {
                    errors.push(format!("{path}: missing required field '{field}'"));
                }
            }
        }

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, sub_schema) in properties {
                if let Some(sub_value) = object.get(name) {
                    check(sub_schema, sub_value, &format!("{path}.{name}"), errors);
                }
            }
        }
    }

    if let (Some(items), Some(array)) = (schema.get("items"), value.as_array()) {
        for (index, element) in array.iter().enumerate() {
            check(items, element, &format!("{path}[{index}]"), errors);
        }
    }
}

fn type_matches(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(name) => single_type_matches(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| single_type_matches(name, value)),
        _ => true,
    }
}

fn single_type_matches(name: &str, value: &Value) -> bool {
    match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply_schema() -> StructuralSchema {
        StructuralSchema::new(json!({
            "type": "object",
            "required": ["response"],
            "properties": {
                "response": { "type": "string" },
                "confidence": { "type": "number" }
            }
        }))
    }

    #[test]
    fn conformant_object_passes() {
        let schema = reply_schema();
        assert!(schema.matches(&json!({"response": "hi", "confidence": 0.9})));
    }

    #[test]
    fn missing_required_field_is_reported() {
        let schema = reply_schema();
        let errors = schema.validate(&json!({"confidence": 0.9}));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("missing required field 'response'"));
    }

    #[test]
    fn nested_type_mismatch_carries_path() {
        let schema = reply_schema();
        let errors = schema.validate(&json!({"response": 17}));
        assert!(errors[0].starts_with("$.response:"));
    }

    #[test]
    fn non_json_text_fails_object_schema() {
        let schema = reply_schema();
        let errors = schema.check_text("plain prose, not json");
        assert!(errors[0].contains("not valid JSON"));
    }

    #[test]
    fn string_schema_accepts_raw_text() {
        let schema = StructuralSchema::new(json!({"type": "string"}));
        assert!(schema.check_text("plain prose is fine here").is_empty());
    }

    #[test]
    fn enum_constraint_enforced() {
        let schema = StructuralSchema::new(json!({"type": "string", "enum": ["yes", "no"]}));
        assert!(schema.matches(&json!("yes")));
        assert!(!schema.matches(&json!("maybe")));
    }

    #[test]
    fn items_checked_per_element() {
        let schema = StructuralSchema::new(json!({
            "type": "array",
            "items": { "type": "integer" }
        }));
        let errors = schema.validate(&json!([1, "two", 3]));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("$[1]:"));
    }

    #[test]
    fn unconstrained_schema_accepts_anything() {
        let schema = StructuralSchema::new(json!({}));
        assert!(schema.matches(&json!({"whatever": [1, 2, 3]})));
    }
}
