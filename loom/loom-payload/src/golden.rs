//! Golden-record synthesis.
//!
//! Builds the canonical valid value for a schema: the smallest, simplest
//! value satisfying every constraint. String leaves become placeholder
//! tokens (`__PLACEHOLDER_STRING_<field>__`) that either stay as-is for
//! negative tests or get enriched by the LLM pass for happy paths.
//! Identical schema in, identical bytes out.

use loom_core::{ObjectSchema, Schema};
use serde_json::{json, Value};
use std::collections::HashSet;

/// Shape of string placeholder tokens.
pub const PLACEHOLDER_PREFIX: &str = "__PLACEHOLDER_";

/// The canonical placeholder for a string field.
pub fn string_placeholder(field_name: &str) -> String {
    format!("__PLACEHOLDER_STRING_{}__", field_name)
}

/// Build the canonical valid value for a schema.
pub fn build_golden(schema: &Schema, field_name: &str) -> Value {
    match schema {
        Schema::String(c) => {
            let _ = c;
            Value::String(string_placeholder(field_name))
        }
        Schema::Integer(c) => {
            let v = if let Some(min) = c.exclusive_min {
                min as i64 + 1
            } else if let Some(min) = c.min {
                min as i64
            } else {
                1
            };
            json!(v)
        }
        Schema::Number(c) => {
            let v = if let Some(min) = c.exclusive_min {
                min + 0.01
            } else if let Some(min) = c.min {
                min
            } else {
                1.0
            };
            json!(v)
        }
        Schema::Boolean => json!(true),
        Schema::Null | Schema::Any | Schema::Ref { .. } => Value::Null,
        Schema::Enum(e) => e.values.first().cloned().unwrap_or(Value::Null),
        Schema::Array { items, constraints } => {
            let element = build_golden(items, field_name);
            let count = constraints.min_items.unwrap_or(0).max(1);
            Value::Array(vec![element; count])
        }
        Schema::Object(obj) => build_golden_object(obj),
        Schema::Union { variants } => match variants.first() {
            Some(first) => build_golden(first, field_name),
            None => Value::Null,
        },
    }
}

/// Required properties only, plus any optional property a
/// dependent-required rule forces in once its trigger is present.
fn build_golden_object(obj: &ObjectSchema) -> Value {
    let mut include: HashSet<&str> = obj.required.iter().map(String::as_str).collect();

    // Dependent rules can cascade; iterate to a fixpoint.
    loop {
        let before = include.len();
        for rule in &obj.constraints.dependent_required {
            if include.contains(rule.if_present.as_str()) {
                for req in &rule.requires {
                    if obj.property(req).is_some() {
                        include.insert(req.as_str());
                    }
                }
            }
        }
        if include.len() == before {
            break;
        }
    }

    let mut map = serde_json::Map::new();
    for (name, prop) in &obj.properties {
        if include.contains(name.as_str()) {
            map.insert(name.clone(), build_golden(prop, name));
        }
    }
    Value::Object(map)
}
