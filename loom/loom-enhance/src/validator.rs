//! Structural validation of enhanced payloads.
//!
//! An enhanced payload is accepted only if it keeps the exact structure of
//! the original: same key set at every nesting level, same primitive type
//! at every leaf, enum values still inside their declared enum, and no
//! placeholder token left anywhere.

use loom_payload::PLACEHOLDER_PREFIX;
use loom_core::Schema;
use serde_json::Value;
use std::fmt;

/// Why an enhanced payload was rejected.
#[derive(Debug, Clone)]
pub struct PolicyViolation {
    pub path: String,
    pub detail: String,
}

impl PolicyViolation {
    fn new(path: &str, detail: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "policy violation at {}: {}", self.path, self.detail)
    }
}

impl std::error::Error for PolicyViolation {}

/// Validate an enhanced payload against its original.
pub fn validate_enhanced(
    original: &Value,
    enhanced: &Value,
    schema: Option<&Schema>,
) -> Result<(), PolicyViolation> {
    check_value("$", original, enhanced, schema)?;
    check_no_placeholder("$", enhanced)
}

fn check_value(
    path: &str,
    original: &Value,
    enhanced: &Value,
    schema: Option<&Schema>,
) -> Result<(), PolicyViolation> {
    // A placeholder leaf is the one slot the provider may rewrite freely;
    // its replacement still has to satisfy any enum constraint.
    if is_placeholder(original) {
        check_enum_membership(path, enhanced, schema)?;
        return Ok(());
    }

    match (original, enhanced) {
        (Value::Object(o), Value::Object(e)) => {
            if o.len() != e.len() || o.keys().any(|k| !e.contains_key(k)) {
                return Err(PolicyViolation::new(path, "key set changed"));
            }
            for (key, orig_val) in o {
                let child_path = format!("{}.{}", path, key);
                let child_schema = schema
                    .and_then(Schema::as_object)
                    .and_then(|obj| obj.property(key));
                check_value(&child_path, orig_val, &e[key], child_schema)?;
            }
            Ok(())
        }
        (Value::Array(o), Value::Array(e)) => {
            let item_schema = match schema {
                Some(Schema::Array { items, .. }) => Some(items.as_ref()),
                _ => None,
            };
            for (i, (ov, ev)) in o.iter().zip(e.iter()).enumerate() {
                check_value(&format!("{}[{}]", path, i), ov, ev, item_schema)?;
            }
            Ok(())
        }
        (Value::Number(_), Value::Number(_)) => check_enum_membership(path, enhanced, schema),
        (Value::String(_), Value::String(_)) => check_enum_membership(path, enhanced, schema),
        (Value::Bool(_), Value::Bool(_)) | (Value::Null, Value::Null) => Ok(()),
        _ => Err(PolicyViolation::new(
            path,
            format!(
                "leaf type changed from {} to {}",
                type_name(original),
                type_name(enhanced)
            ),
        )),
    }
}

fn check_enum_membership(
    path: &str,
    value: &Value,
    schema: Option<&Schema>,
) -> Result<(), PolicyViolation> {
    if let Some(Schema::Enum(e)) = schema {
        if !e.values.contains(value) {
            return Err(PolicyViolation::new(
                path,
                format!("value {} is outside the declared enum", value),
            ));
        }
    }
    Ok(())
}

fn check_no_placeholder(path: &str, value: &Value) -> Result<(), PolicyViolation> {
    match value {
        Value::String(s) if s.contains(PLACEHOLDER_PREFIX) => Err(PolicyViolation::new(
            path,
            "placeholder token survived enhancement",
        )),
        Value::Object(map) => {
            for (key, v) in map {
                check_no_placeholder(&format!("{}.{}", path, key), v)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                check_no_placeholder(&format!("{}[{}]", path, i), v)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn is_placeholder(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.starts_with(PLACEHOLDER_PREFIX))
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
