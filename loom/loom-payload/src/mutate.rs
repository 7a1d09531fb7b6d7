//! The mutation table.
//!
//! Exactly one transformation per intent, rooted at the intent's target
//! path. Sentinels are human-legible, purpose-specific string tokens;
//! everything here is a pure function of (intent, golden record, schema).

use crate::build_golden;
use loom_intent::{Intent, IntentKind, TargetPath};
use loom_core::{Schema, StringFormat};
use serde_json::{json, Map, Value};

pub const INVALID_TYPE: &str = "__INVALID_TYPE__";
pub const INVALID_ENUM_VALUE: &str = "__INVALID_ENUM_VALUE__";
pub const UNION_NO_MATCH_SENTINEL: &str = "__UNION_NO_MATCH__";
pub const UNEXPECTED_KWARG_KEY: &str = "__unexpected_kwarg__";
pub const EXTRA_PROPERTY_KEY: &str = "__extra_property__";

pub const SQL_INJECTION_STRING: &str = "' OR '1'='1";
pub const XSS_INJECTION_STRING: &str = "<script>alert(1)</script>";
pub const COMMAND_INJECTION_STRING: &str = "; rm -rf /";
pub const PATH_TRAVERSAL_STRING: &str = "../../etc/passwd";
pub const HEADER_INJECTION_STRING: &str = "ValidValue\r\nSet-Cookie: evil=true";

/// Syntactically valid ids guaranteed to be absent from any backend.
pub const ABSENT_UUID: &str = "00000000-0000-4000-8000-000000000000";
pub const ABSENT_INTEGER_ID: i64 = 999999;

/// Fixed filler character for length-boundary strings.
const FILLER: char = 'x';

/// Apply a body mutation in place.
pub fn apply_body_mutation(body: &mut Value, intent: &Intent, field_schema: Option<&Schema>) {
    let segments = match &intent.target {
        TargetPath::Body(segments) => segments.as_slice(),
        _ => return,
    };

    match intent.intent {
        IntentKind::HappyPath => {}

        // Structural
        IntentKind::RequiredFieldMissing | IntentKind::RequiredArgMissing => {
            remove_at(body, segments);
        }
        IntentKind::UnexpectedArgument => {
            insert_at_parent(body, segments, UNEXPECTED_KWARG_KEY, json!("unexpected_value"));
        }
        IntentKind::AdditionalPropertyNotAllowed => {
            insert_into_target(body, segments, EXTRA_PROPERTY_KEY, json!("unexpected_value"));
        }

        // Type system
        IntentKind::TypeViolation | IntentKind::ObjectValueTypeViolation => {
            set_at(body, segments, json!(INVALID_TYPE));
        }
        IntentKind::NullNotAllowed => {
            set_at(body, segments, Value::Null);
        }
        IntentKind::ArrayItemTypeViolation => {
            let replaced = match value_at(body, segments) {
                Some(Value::Array(items)) if !items.is_empty() => {
                    items[0] = json!(INVALID_TYPE);
                    true
                }
                _ => false,
            };
            if !replaced {
                set_at(body, segments, json!([INVALID_TYPE]));
            }
        }
        IntentKind::UnionNoMatch => {
            set_at(body, segments, json!(UNION_NO_MATCH_SENTINEL));
        }

        // Numeric boundaries
        IntentKind::BoundaryMinMinusOne => {
            if let Some(v) = below_minimum(field_schema) {
                set_at(body, segments, v);
            }
        }
        IntentKind::BoundaryMaxPlusOne => {
            if let Some(v) = above_maximum(field_schema) {
                set_at(body, segments, v);
            }
        }
        IntentKind::NotMultipleOf => {
            set_at(body, segments, off_grid_value(field_schema));
        }
        IntentKind::NumberTooSmall => set_at(body, segments, json!(-999999)),
        IntentKind::NumberTooLarge => set_at(body, segments, json!(999999)),

        // String constraints
        IntentKind::BoundaryMinLengthMinusOne => {
            let min = string_bound(field_schema, true).unwrap_or(1);
            set_at(body, segments, filler_string(min.saturating_sub(1)));
        }
        IntentKind::BoundaryMaxLengthPlusOne => {
            let max = string_bound(field_schema, false).unwrap_or(10);
            set_at(body, segments, filler_string(max + 1));
        }
        IntentKind::StringTooShort | IntentKind::EmptyString => {
            set_at(body, segments, json!(""));
        }
        IntentKind::StringTooLong => {
            set_at(body, segments, filler_string(1000));
        }
        IntentKind::WhitespaceOnly => {
            set_at(body, segments, json!("   "));
        }
        IntentKind::PatternMismatch => {
            set_at(body, segments, json!("!!!invalid_pattern!!!"));
        }
        IntentKind::FormatInvalid => {
            let value = field_schema
                .and_then(schema_format)
                .map(invalid_format_value)
                .unwrap_or_else(|| "invalid_format_value".to_string());
            set_at(body, segments, Value::String(value));
        }
        IntentKind::EnumMismatch | IntentKind::HeaderEnumMismatch => {
            set_at(body, segments, json!(INVALID_ENUM_VALUE));
        }

        // Array constraints
        IntentKind::BoundaryMinItemsMinusOne => {
            let min = array_bound(field_schema, true).unwrap_or(1);
            let template = item_template(body, segments, field_schema);
            set_at(
                body,
                segments,
                Value::Array(vec![template; min.saturating_sub(1)]),
            );
        }
        IntentKind::BoundaryMaxItemsPlusOne => {
            let max = array_bound(field_schema, false).unwrap_or(10);
            let template = item_template(body, segments, field_schema);
            set_at(body, segments, Value::Array(vec![template; max + 1]));
        }
        IntentKind::ArrayNotUnique => {
            let duplicated = match value_at(body, segments) {
                Some(Value::Array(items)) if !items.is_empty() => {
                    let first = items[0].clone();
                    items.push(first);
                    true
                }
                _ => false,
            };
            if !duplicated {
                set_at(body, segments, json!([1, 1]));
            }
        }
        IntentKind::ArrayTooShort => set_at(body, segments, json!([])),
        IntentKind::ArrayTooLong => {
            let template = item_template(body, segments, field_schema);
            set_at(body, segments, Value::Array(vec![template; 1000]));
        }

        // Security
        IntentKind::SqlInjection => set_at(body, segments, json!(SQL_INJECTION_STRING)),
        IntentKind::XssInjection => set_at(body, segments, json!(XSS_INJECTION_STRING)),
        IntentKind::CommandInjection => set_at(body, segments, json!(COMMAND_INJECTION_STRING)),
        IntentKind::PathTraversal => set_at(body, segments, json!(PATH_TRAVERSAL_STRING)),

        // Header and path-parameter intents never target the body.
        IntentKind::HeaderMissing
        | IntentKind::HeaderInjection
        | IntentKind::ResourceNotFound
        | IntentKind::FormatInvalidPathParam => {}
    }
}

/// Apply a path-parameter mutation in place. Non-targeted parameters keep
/// their valid values.
pub fn apply_path_param_mutation(
    params: &mut Map<String, Value>,
    intent: &Intent,
    schema: Option<&Schema>,
) {
    let name = match &intent.target {
        TargetPath::PathParam(name) => name.clone(),
        _ => return,
    };

    match intent.intent {
        IntentKind::ResourceNotFound => {
            let value = match schema {
                Some(Schema::String(c)) if c.format == Some(StringFormat::Uuid) => {
                    json!(ABSENT_UUID)
                }
                Some(Schema::Integer(_)) => json!(ABSENT_INTEGER_ID),
                _ => json!("nonexistent-resource"),
            };
            params.insert(name, value);
        }
        IntentKind::FormatInvalidPathParam => {
            let value = schema
                .and_then(schema_format)
                .map(invalid_format_value)
                .unwrap_or_else(|| "not-a-valid-format".to_string());
            params.insert(name, Value::String(value));
        }
        IntentKind::TypeViolation => {
            params.insert(name, json!(INVALID_TYPE));
        }
        IntentKind::SqlInjection => {
            params.insert(name, json!(SQL_INJECTION_STRING));
        }
        IntentKind::XssInjection => {
            params.insert(name, json!(XSS_INJECTION_STRING));
        }
        _ => {}
    }
}

/// Apply a header mutation in place.
pub fn apply_header_mutation(headers: &mut Map<String, Value>, intent: &Intent) {
    let name = match &intent.target {
        TargetPath::Header(name) => name.clone(),
        _ => return,
    };

    match intent.intent {
        IntentKind::HeaderMissing => {
            headers.remove(&name);
        }
        IntentKind::HeaderInjection => {
            headers.insert(name, json!(HEADER_INJECTION_STRING));
        }
        IntentKind::HeaderEnumMismatch => {
            headers.insert(name, json!(INVALID_ENUM_VALUE));
        }
        _ => {}
    }
}

/// Apply a query-parameter mutation in place.
pub fn apply_query_param_mutation(params: &mut Map<String, Value>, intent: &Intent) {
    let name = match &intent.target {
        TargetPath::QueryParam(name) => name.clone(),
        _ => return,
    };

    match intent.intent {
        IntentKind::RequiredFieldMissing => {
            params.remove(&name);
        }
        IntentKind::TypeViolation => {
            params.insert(name, json!(INVALID_TYPE));
        }
        _ => {}
    }
}

/// Format-specific invalid values.
pub fn invalid_format_value(format: &StringFormat) -> String {
    match format {
        StringFormat::Email => "not-an-email".to_string(),
        StringFormat::Uuid => "not-a-valid-uuid".to_string(),
        StringFormat::Date => "not-a-date".to_string(),
        StringFormat::DateTime => "not-a-datetime".to_string(),
        StringFormat::Ipv4 => "999.999.999.999".to_string(),
        StringFormat::Ipv6 => "not-an-ipv6".to_string(),
        StringFormat::Uri => "not a valid uri".to_string(),
        StringFormat::Other(_) => "invalid_format_value".to_string(),
    }
}

/// Resolve the schema at a body path, descending through object properties
/// and array items.
pub fn schema_at<'a>(root: &'a Schema, segments: &[String]) -> Option<&'a Schema> {
    let mut current = root;
    for segment in segments {
        let (name, into_items) = match segment.strip_suffix("[]") {
            Some(stripped) => (stripped, true),
            None => (segment.as_str(), false),
        };
        current = current.as_object()?.property(name)?;
        if into_items {
            current = match current {
                Schema::Array { items, .. } => items,
                _ => return None,
            };
        }
    }
    Some(current)
}

// ==================== Value navigation ====================

fn descend<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    let (name, into_items) = match segment.strip_suffix("[]") {
        Some(stripped) => (stripped, true),
        None => (segment, false),
    };
    let mut current = value.as_object_mut()?.get_mut(name)?;
    if into_items {
        current = current.as_array_mut()?.first_mut()?;
    }
    Some(current)
}

fn parent_of<'a>(body: &'a mut Value, segments: &[String]) -> Option<&'a mut Value> {
    let mut current = body;
    for segment in &segments[..segments.len().saturating_sub(1)] {
        current = descend(current, segment)?;
    }
    Some(current)
}

fn leaf_key(segments: &[String]) -> Option<&str> {
    segments.last().map(|s| s.trim_end_matches("[]"))
}

fn value_at<'a>(body: &'a mut Value, segments: &[String]) -> Option<&'a mut Value> {
    let mut current = body;
    for segment in segments {
        current = descend(current, segment)?;
    }
    Some(current)
}

fn set_at(body: &mut Value, segments: &[String], value: Value) {
    let Some(key) = leaf_key(segments) else { return };
    let key = key.to_string();
    if let Some(parent) = parent_of(body, segments) {
        if let Some(map) = parent.as_object_mut() {
            map.insert(key, value);
        }
    }
}

fn remove_at(body: &mut Value, segments: &[String]) {
    let Some(key) = leaf_key(segments) else { return };
    let key = key.to_string();
    if let Some(parent) = parent_of(body, segments) {
        if let Some(map) = parent.as_object_mut() {
            map.remove(&key);
        }
    }
}

/// Insert a sentinel key into the object containing the target.
fn insert_at_parent(body: &mut Value, segments: &[String], key: &str, value: Value) {
    if let Some(parent) = parent_of(body, segments) {
        if let Some(map) = parent.as_object_mut() {
            map.insert(key.to_string(), value);
        }
    }
}

/// Insert a sentinel key into the targeted object itself.
fn insert_into_target(body: &mut Value, segments: &[String], key: &str, value: Value) {
    if let Some(target) = value_at(body, segments) {
        if let Some(map) = target.as_object_mut() {
            map.insert(key.to_string(), value);
        }
    }
}

// ==================== Boundary calculus ====================

fn below_minimum(schema: Option<&Schema>) -> Option<Value> {
    match schema {
        Some(Schema::Integer(c)) => {
            if let Some(min) = c.exclusive_min {
                Some(json!(min as i64))
            } else {
                c.min.map(|min| json!(min as i64 - 1))
            }
        }
        Some(Schema::Number(c)) => {
            if let Some(min) = c.exclusive_min {
                Some(json!(min))
            } else {
                c.min.map(|min| json!(min - 1.0))
            }
        }
        _ => Some(json!(-1)),
    }
}

fn above_maximum(schema: Option<&Schema>) -> Option<Value> {
    match schema {
        Some(Schema::Integer(c)) => {
            if let Some(max) = c.exclusive_max {
                Some(json!(max as i64))
            } else {
                c.max.map(|max| json!(max as i64 + 1))
            }
        }
        Some(Schema::Number(c)) => {
            if let Some(max) = c.exclusive_max {
                Some(json!(max))
            } else {
                c.max.map(|max| json!(max + 1.0))
            }
        }
        _ => Some(json!(999999)),
    }
}

/// A value guaranteed to miss the `multiple_of` grid.
fn off_grid_value(schema: Option<&Schema>) -> Value {
    let multiple_of = match schema {
        Some(Schema::Integer(c)) | Some(Schema::Number(c)) => c.multiple_of.unwrap_or(1.0),
        _ => 1.0,
    };
    let is_integer_grid = multiple_of.fract() == 0.0 && multiple_of >= 1.0;

    if is_integer_grid {
        let m = multiple_of as i64;
        if m <= 1 {
            // Every integer is a multiple of 1; step off the integer grid.
            return json!(7.5);
        }
        let mut v = m / 2 + 7;
        if v % m == 0 {
            v += 1;
        }
        json!(v)
    } else {
        // Fractional grid: half a step past a multiple is always off it.
        json!(multiple_of * 7.0 + multiple_of / 2.0)
    }
}

fn string_bound(schema: Option<&Schema>, lower: bool) -> Option<usize> {
    match schema {
        Some(Schema::String(c)) => {
            if lower {
                c.min_len
            } else {
                c.max_len
            }
        }
        _ => None,
    }
}

fn array_bound(schema: Option<&Schema>, lower: bool) -> Option<usize> {
    match schema {
        Some(Schema::Array { constraints, .. }) => {
            if lower {
                constraints.min_items
            } else {
                constraints.max_items
            }
        }
        _ => None,
    }
}

fn filler_string(len: usize) -> Value {
    Value::String(std::iter::repeat(FILLER).take(len).collect())
}

/// A valid element to pad arrays with: the existing first element when the
/// golden record has one, else the golden item for the schema.
fn item_template(body: &mut Value, segments: &[String], schema: Option<&Schema>) -> Value {
    if let Some(Value::Array(items)) = value_at(body, segments) {
        if let Some(first) = items.first() {
            return first.clone();
        }
    }
    match schema {
        Some(Schema::Array { items, .. }) => {
            build_golden(items, leaf_key(segments).unwrap_or("item"))
        }
        _ => json!(1),
    }
}

fn schema_format(schema: &Schema) -> Option<&StringFormat> {
    match schema {
        Schema::String(c) => c.format.as_ref(),
        _ => None,
    }
}
