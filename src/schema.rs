//! Declarative input schemas and validation.
//!
//! Tool arguments arrive as untyped JSON; each sub-command declares a small
//! schema (required fields, primitive types, enum constraints) that its
//! arguments are checked against before dispatch. Validation collects every
//! violation instead of stopping at the first, so a client gets the full
//! picture in one round trip.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Primitive JSON types a property can be constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl ValueType {
    /// Name used in wire schemas and error messages.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Object => "object",
            ValueType::Array => "array",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            ValueType::String => value.is_string(),
            ValueType::Number => value.is_number(),
            ValueType::Boolean => value.is_boolean(),
            ValueType::Object => value.is_object(),
            ValueType::Array => value.is_array(),
        }
    }
}

/// One node in a schema tree.
///
/// Schemas are static: built once at startup, then only read. The wire shape
/// (`type` / `enum` / `properties` / `required`) matches what the tool-listing
/// method publishes to clients.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PropertySchema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl PropertySchema {
    /// A property constrained to a primitive type.
    pub fn typed(value_type: ValueType) -> Self {
        Self {
            value_type: Some(value_type),
            ..Self::default()
        }
    }

    /// A string property restricted to a fixed set of values.
    pub fn string_enum<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value_type: Some(ValueType::String),
            allowed: Some(allowed.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// An object property with named sub-properties and a required set.
    pub fn object<I, S>(properties: BTreeMap<String, PropertySchema>, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value_type: Some(ValueType::Object),
            allowed: None,
            properties,
            required: required.into_iter().map(Into::into).collect(),
        }
    }
}

/// Outcome of checking a value against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl Validation {
    fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    fn push(&mut self, error: String) {
        self.valid = false;
        self.errors.push(error);
    }
}

/// Check `data` against `schema`, collecting every violation.
///
/// Checks one level deep: required fields must be present, and each declared
/// property present in `data` must match its `type` and `enum` constraints.
/// `data` is never mutated and the result is deterministic.
pub fn validate(data: &Value, schema: &PropertySchema) -> Validation {
    let mut result = Validation::ok();

    for field in &schema.required {
        let present = data
            .as_object()
            .map(|map| map.contains_key(field))
            .unwrap_or(false);
        if !present {
            result.push(format!("Missing required field: {}", field));
        }
    }

    if let Some(map) = data.as_object() {
        for (key, prop) in &schema.properties {
            let Some(value) = map.get(key) else {
                continue;
            };
            if let Some(expected) = prop.value_type {
                if !expected.matches(value) {
                    result.push(format!(
                        "Invalid type for {}: expected {}",
                        key,
                        expected.name()
                    ));
                }
            }
            if let Some(allowed) = &prop.allowed {
                let is_member = value
                    .as_str()
                    .map(|s| allowed.iter().any(|a| a == s))
                    .unwrap_or(false);
                if !is_member {
                    result.push(format!(
                        "Invalid value for {}: must be one of {}",
                        key,
                        allowed.join(", ")
                    ));
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn direction_schema() -> PropertySchema {
        let mut props = BTreeMap::new();
        props.insert(
            "direction".to_string(),
            PropertySchema::string_enum(["up", "down", "left", "right"]),
        );
        PropertySchema::object(props, ["direction"])
    }

    #[test]
    fn valid_input_passes() {
        let result = validate(&json!({"direction": "up"}), &direction_schema());
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn missing_required_field_reported() {
        let result = validate(&json!({}), &direction_schema());
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["Missing required field: direction"]);
    }

    #[test]
    fn non_object_data_fails_required() {
        let result = validate(&json!("up"), &direction_schema());
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["Missing required field: direction"]);
    }

    #[test]
    fn enum_violation_reported() {
        let result = validate(&json!({"direction": "diagonal"}), &direction_schema());
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec!["Invalid value for direction: must be one of up, down, left, right"]
        );
    }

    #[test]
    fn type_mismatch_reported() {
        let mut props = BTreeMap::new();
        props.insert("text".to_string(), PropertySchema::typed(ValueType::String));
        let schema = PropertySchema::object(props, ["text"]);

        let result = validate(&json!({"text": 42}), &schema);
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["Invalid type for text: expected string"]);
    }

    #[test]
    fn enum_checked_against_non_string_value() {
        let result = validate(&json!({"direction": 3}), &direction_schema());
        assert!(!result.valid);
        // Both the type and enum constraints fire.
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn all_violations_collected() {
        let mut props = BTreeMap::new();
        props.insert(
            "direction".to_string(),
            PropertySchema::string_enum(["up", "down"]),
        );
        props.insert("text".to_string(), PropertySchema::typed(ValueType::String));
        let schema = PropertySchema::object(props, ["direction", "text", "extra"]);

        let result = validate(&json!({"direction": "sideways", "text": 1}), &schema);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 3, "errors: {:?}", result.errors);
        assert!(result.errors.iter().any(|e| e.contains("extra")));
        assert!(result.errors.iter().any(|e| e.contains("direction")));
        assert!(result.errors.iter().any(|e| e.contains("text")));
    }

    #[test]
    fn undeclared_properties_ignored() {
        let result = validate(
            &json!({"direction": "up", "unknown": true}),
            &direction_schema(),
        );
        assert!(result.valid);
    }

    #[test]
    fn validation_does_not_mutate_input() {
        let data = json!({"direction": "diagonal", "nested": {"a": 1}});
        let before = data.clone();
        let _ = validate(&data, &direction_schema());
        assert_eq!(data, before);
    }

    #[test]
    fn schema_serializes_to_wire_shape() {
        let schema = direction_schema();
        let wire = serde_json::to_value(&schema).unwrap();
        assert_eq!(wire["type"], "object");
        assert_eq!(wire["required"], json!(["direction"]));
        assert_eq!(
            wire["properties"]["direction"]["enum"],
            json!(["up", "down", "left", "right"])
        );
        // Empty collections are omitted from the wire form.
        assert!(wire["properties"]["direction"]
            .as_object()
            .unwrap()
            .get("required")
            .is_none());
    }
}
