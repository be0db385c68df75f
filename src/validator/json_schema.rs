use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const KNOWN_TYPES: [&str; 7] = [
    "object", "array", "string", "number", "integer", "boolean", "null",
];

/// Errors found while compiling a validator document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidatorError {
    #[error("validator document must be a JSON object")]
    NotAnObject,

    #[error("unresolved reference '{0}'")]
    UnresolvedRef(String),

    #[error("invalid '{keyword}' keyword at {path}: {reason}")]
    InvalidKeyword {
        keyword: String,
        path: String,
        reason: String,
    },
}

/// First mismatch found between a document and a validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{} at {}", self.message, path)
    }
}

/// A JSON-schema document enforced on write for a semi-structured column.
///
/// Only the keywords used by the infra documents are interpreted: `$ref`
/// (local pointers), `type`, `enum`, `const`, `anyOf`, `properties`,
/// `required`, `items` (single or positional), `minItems`, `maxItems` and
/// `maxLength`. Annotations such as `title` and `description` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonSchema {
    document: Value,
}

impl JsonSchema {
    pub fn new(document: Value) -> Result<Self, ValidatorError> {
        if !document.is_object() {
            return Err(ValidatorError::NotAnObject);
        }

        let schema = JsonSchema { document };
        schema.compile(&schema.document, "")?;

        Ok(schema)
    }

    pub fn validate(&self, instance: &Value) -> Result<(), SchemaViolation> {
        self.check(&self.document, instance, "")
    }

    fn resolve(&self, reference: &str) -> Option<&Value> {
        let pointer = reference.strip_prefix('#')?;
        if pointer.is_empty() {
            return Some(&self.document);
        }
        self.document.pointer(pointer)
    }

    fn compile(&self, schema: &Value, path: &str) -> Result<(), ValidatorError> {
        let schema = match schema {
            Value::Object(schema) => schema,
            Value::Bool(_) => return Ok(()),
            _ => return Err(invalid_keyword("schema", path, "expected an object")),
        };

        for (keyword, value) in schema {
            let here = format!("{}/{}", path, keyword);
            match keyword.as_str() {
                "$ref" => {
                    let reference = value
                        .as_str()
                        .ok_or_else(|| invalid_keyword(keyword, path, "expected a string"))?;
                    self.compile_ref_chain(reference, path, &mut Vec::new())?;
                }
                "type" => compile_type(value, path)?,
                "required" => {
                    let all_strings = value
                        .as_array()
                        .map(|names| names.iter().all(Value::is_string))
                        .unwrap_or(false);
                    if !all_strings {
                        return Err(invalid_keyword(keyword, path, "expected a list of names"));
                    }
                }
                "enum" if !value.is_array() => {
                    return Err(invalid_keyword(keyword, path, "expected an array"));
                }
                "minItems" | "maxItems" | "maxLength" if value.as_u64().is_none() => {
                    return Err(invalid_keyword(keyword, path, "expected a non-negative integer"));
                }
                "properties" | "definitions" => {
                    let members = value
                        .as_object()
                        .ok_or_else(|| invalid_keyword(keyword, path, "expected an object"))?;
                    for (name, member) in members {
                        self.compile(member, &format!("{}/{}", here, name))?;
                    }
                }
                "anyOf" => {
                    let branches = value
                        .as_array()
                        .filter(|branches| !branches.is_empty())
                        .ok_or_else(|| invalid_keyword(keyword, path, "expected a non-empty array"))?;
                    for (index, branch) in branches.iter().enumerate() {
                        self.compile(branch, &format!("{}/{}", here, index))?;
                    }
                }
                "items" => match value {
                    Value::Array(positional) => {
                        for (index, item) in positional.iter().enumerate() {
                            self.compile(item, &format!("{}/{}", here, index))?;
                        }
                    }
                    other => self.compile(other, &here)?,
                },
                _ => {}
            }
        }

        Ok(())
    }

    /// Follows the references reachable from `reference` without descending
    /// into the instance (`$ref` and `anyOf` branches). Such a chain must end,
    /// otherwise checking any document would never terminate.
    fn compile_ref_chain<'a>(
        &'a self,
        reference: &'a str,
        path: &str,
        chain: &mut Vec<&'a str>,
    ) -> Result<(), ValidatorError> {
        if chain.contains(&reference) {
            chain.push(reference);
            return Err(invalid_keyword(
                "$ref",
                path,
                &format!("reference cycle {}", chain.join(" -> ")),
            ));
        }

        let target = self
            .resolve(reference)
            .ok_or_else(|| ValidatorError::UnresolvedRef(reference.to_string()))?;

        let mut next = Vec::new();
        direct_refs(target, &mut next);

        chain.push(reference);
        for reference in next {
            self.compile_ref_chain(reference, path, chain)?;
        }
        chain.pop();

        Ok(())
    }

    fn check(&self, schema: &Value, instance: &Value, path: &str) -> Result<(), SchemaViolation> {
        let schema = match schema {
            Value::Object(schema) => schema,
            Value::Bool(true) => return Ok(()),
            _ => return Err(violation(path, "no value is allowed here")),
        };

        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            let target = self
                .resolve(reference)
                .ok_or_else(|| violation(path, format!("unresolved reference '{}'", reference)))?;
            return self.check(target, instance, path);
        }

        if let Some(expected) = schema.get("type") {
            if !matches_type(expected, instance) {
                return Err(violation(
                    path,
                    format!("expected {}, found {}", expected, type_name(instance)),
                ));
            }
        }

        if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
            if !allowed.contains(instance) {
                return Err(violation(path, format!("{} is not one of {:?}", instance, allowed)));
            }
        }

        if let Some(constant) = schema.get("const") {
            if constant != instance {
                return Err(violation(path, format!("expected constant {}", constant)));
            }
        }

        if let Some(branches) = schema.get("anyOf").and_then(Value::as_array) {
            let matched = branches
                .iter()
                .any(|branch| self.check(branch, instance, path).is_ok());
            if !matched {
                return Err(violation(path, "does not match any allowed alternative"));
            }
        }

        match instance {
            Value::Object(members) => self.check_object(schema, members, path),
            Value::Array(items) => self.check_array(schema, items, path),
            Value::String(text) => check_string(schema, text, path),
            _ => Ok(()),
        }
    }

    fn check_object(
        &self,
        schema: &Map<String, Value>,
        members: &Map<String, Value>,
        path: &str,
    ) -> Result<(), SchemaViolation> {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                if !members.contains_key(name) {
                    return Err(violation(
                        path,
                        format!("missing required property '{}'", name),
                    ));
                }
            }
        }

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, value) in members {
                if let Some(property) = properties.get(name) {
                    self.check(property, value, &format!("{}/{}", path, name))?;
                }
            }
        }

        Ok(())
    }

    fn check_array(
        &self,
        schema: &Map<String, Value>,
        items: &[Value],
        path: &str,
    ) -> Result<(), SchemaViolation> {
        if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
            if (items.len() as u64) < min {
                return Err(violation(
                    path,
                    format!("expected at least {} items, found {}", min, items.len()),
                ));
            }
        }

        if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
            if items.len() as u64 > max {
                return Err(violation(
                    path,
                    format!("expected at most {} items, found {}", max, items.len()),
                ));
            }
        }

        match schema.get("items") {
            Some(Value::Array(positional)) => {
                for (index, (item, item_schema)) in items.iter().zip(positional).enumerate() {
                    self.check(item_schema, item, &format!("{}/{}", path, index))?;
                }
            }
            Some(item_schema) => {
                for (index, item) in items.iter().enumerate() {
                    self.check(item_schema, item, &format!("{}/{}", path, index))?;
                }
            }
            None => {}
        }

        Ok(())
    }
}

fn check_string(schema: &Map<String, Value>, text: &str, path: &str) -> Result<(), SchemaViolation> {
    if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
        let length = text.chars().count() as u64;
        if length > max {
            return Err(violation(
                path,
                format!("string of length {} exceeds maxLength {}", length, max),
            ));
        }
    }

    Ok(())
}

fn direct_refs<'a>(schema: &'a Value, refs: &mut Vec<&'a str>) {
    if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
        refs.push(reference);
    }
    if let Some(branches) = schema.get("anyOf").and_then(Value::as_array) {
        for branch in branches {
            direct_refs(branch, refs);
        }
    }
}

fn compile_type(value: &Value, path: &str) -> Result<(), ValidatorError> {
    let names = match value {
        Value::String(name) => vec![name.as_str()],
        Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
        _ => return Err(invalid_keyword("type", path, "expected a string or list")),
    };

    match names.iter().find(|name| !KNOWN_TYPES.contains(name)) {
        Some(unknown) => Err(invalid_keyword(
            "type",
            path,
            &format!("unknown type '{}'", unknown),
        )),
        None => Ok(()),
    }
}

fn matches_type(expected: &Value, instance: &Value) -> bool {
    match expected {
        Value::String(name) => is_type(name, instance),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| is_type(name, instance)),
        _ => false,
    }
}

fn is_type(name: &str, instance: &Value) -> bool {
    match name {
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "boolean" => instance.is_boolean(),
        "null" => instance.is_null(),
        "number" => instance.is_number(),
        "integer" => is_integer(instance),
        _ => false,
    }
}

/// Whole numbers, including floats without a fractional part such as `3.0`.
pub(crate) fn is_integer(instance: &Value) -> bool {
    match instance {
        Value::Number(number) => {
            number.is_i64()
                || number.is_u64()
                || number.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
        }
        _ => false,
    }
}

fn type_name(instance: &Value) -> &'static str {
    match instance {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn violation(path: &str, message: impl Into<String>) -> SchemaViolation {
    SchemaViolation {
        path: path.to_string(),
        message: message.into(),
    }
}

fn invalid_keyword(keyword: &str, path: &str, reason: &str) -> ValidatorError {
    ValidatorError::InvalidKeyword {
        keyword: keyword.to_string(),
        path: if path.is_empty() { "/".to_string() } else { path.to_string() },
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn point_schema() -> JsonSchema {
        JsonSchema::new(json!({
            "definitions": {
                "Coordinate": {"anyOf": [{"type": "number"}, {"type": "integer"}]},
                "Side": {"enum": ["LEFT", "RIGHT"], "type": "string"}
            },
            "properties": {
                "id": {"maxLength": 4, "type": "string"},
                "side": {"$ref": "#/definitions/Side"},
                "position": {
                    "items": [
                        {"$ref": "#/definitions/Coordinate"},
                        {"$ref": "#/definitions/Coordinate"}
                    ],
                    "minItems": 2,
                    "maxItems": 2,
                    "type": "array"
                },
                "kind": {"const": "Point", "type": "string"}
            },
            "required": ["id", "position"],
            "type": "object"
        }))
        .unwrap()
    }

    #[test]
    fn test_accepts_valid_document() {
        let schema = point_schema();
        let document = json!({"id": "p1", "side": "LEFT", "position": [1.5, 2], "kind": "Point"});
        assert!(schema.validate(&document).is_ok());
    }

    #[test]
    fn test_rejects_missing_required_property() {
        let schema = point_schema();
        let err = schema.validate(&json!({"id": "p1"})).unwrap_err();
        assert_eq!(err.path, "");
        assert!(err.message.contains("'position'"));
        assert_eq!(err.to_string(), "missing required property 'position' at /");
    }

    #[test]
    fn test_rejects_value_outside_referenced_enum() {
        let schema = point_schema();
        let document = json!({"id": "p1", "side": "UP", "position": [0, 0]});
        let err = schema.validate(&document).unwrap_err();
        assert_eq!(err.path, "/side");
    }

    #[test]
    fn test_checks_positional_items_and_bounds() {
        let schema = point_schema();

        let err = schema
            .validate(&json!({"id": "p1", "position": [0]}))
            .unwrap_err();
        assert!(err.message.contains("at least 2"));

        let err = schema
            .validate(&json!({"id": "p1", "position": [0, "north"]}))
            .unwrap_err();
        assert_eq!(err.path, "/position/1");
    }

    #[test]
    fn test_checks_max_length_and_const() {
        let schema = point_schema();

        let err = schema
            .validate(&json!({"id": "point-1", "position": [0, 0]}))
            .unwrap_err();
        assert_eq!(err.path, "/id");

        let err = schema
            .validate(&json!({"id": "p1", "position": [0, 0], "kind": "Line"}))
            .unwrap_err();
        assert_eq!(err.path, "/kind");
    }

    #[test]
    fn test_integer_type_accepts_whole_floats_only() {
        let schema = JsonSchema::new(json!({"type": "integer"})).unwrap();
        assert!(schema.validate(&json!(3)).is_ok());
        assert!(schema.validate(&json!(3.0)).is_ok());
        assert!(schema.validate(&json!(3.5)).is_err());
        assert!(schema.validate(&json!("3")).is_err());
    }

    #[test]
    fn test_unknown_properties_are_accepted() {
        let schema = point_schema();
        let document = json!({"id": "p1", "position": [0, 0], "extra": true});
        assert!(schema.validate(&document).is_ok());
    }

    #[test]
    fn test_compile_rejects_unresolved_reference() {
        let err = JsonSchema::new(json!({
            "properties": {"curve": {"$ref": "#/definitions/Curve"}},
            "type": "object"
        }))
        .unwrap_err();
        assert_eq!(err, ValidatorError::UnresolvedRef("#/definitions/Curve".to_string()));
    }

    #[test]
    fn test_compile_rejects_bad_keywords() {
        assert_eq!(
            JsonSchema::new(json!(["not", "an", "object"])).unwrap_err(),
            ValidatorError::NotAnObject
        );
        assert!(matches!(
            JsonSchema::new(json!({"type": "float"})).unwrap_err(),
            ValidatorError::InvalidKeyword { keyword, .. } if keyword == "type"
        ));
        assert!(matches!(
            JsonSchema::new(json!({"required": "id"})).unwrap_err(),
            ValidatorError::InvalidKeyword { keyword, .. } if keyword == "required"
        ));
    }

    #[test]
    fn test_compile_rejects_ref_cycle() {
        let err = JsonSchema::new(json!({
            "$ref": "#/definitions/A",
            "definitions": {"A": {"$ref": "#/definitions/A"}}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ValidatorError::InvalidKeyword { ref keyword, ref reason, .. }
                if keyword == "$ref" && reason.contains("#/definitions/A -> #/definitions/A")
        ));

        let err = JsonSchema::new(json!({
            "anyOf": [{"type": "string"}, {"$ref": "#/definitions/Loop"}],
            "definitions": {
                "Loop": {"anyOf": [{"$ref": "#/definitions/Back"}]},
                "Back": {"$ref": "#/definitions/Loop"}
            }
        }))
        .unwrap_err();
        assert!(matches!(err, ValidatorError::InvalidKeyword { .. }));
    }

    #[test]
    fn test_recursion_through_properties_and_items_is_allowed() {
        let schema = JsonSchema::new(json!({
            "definitions": {
                "Node": {
                    "properties": {
                        "name": {"type": "string"},
                        "children": {"items": {"$ref": "#/definitions/Node"}, "type": "array"}
                    },
                    "required": ["name"],
                    "type": "object"
                }
            },
            "$ref": "#/definitions/Node"
        }))
        .unwrap();

        let tree = json!({"name": "root", "children": [{"name": "leaf", "children": []}]});
        assert!(schema.validate(&tree).is_ok());

        let err = schema
            .validate(&json!({"name": "root", "children": [{}]}))
            .unwrap_err();
        assert_eq!(err.path, "/children/0");
    }
}
