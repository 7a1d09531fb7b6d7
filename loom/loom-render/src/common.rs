//! Shared rendering helpers.

use serde_json::Value;

/// The fixed banner every generated file opens with.
pub const BANNER_TEXT: &str =
    "AUTO-GENERATED TEST FILE - DO NOT EDIT BY HAND. Regenerate from the source specification.";

/// Banner with the given line-comment prefix.
pub fn banner(comment_prefix: &str) -> String {
    format!("{} {}\n", comment_prefix, BANNER_TEXT)
}

/// Render a JSON value as a Python literal.
pub fn py_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        // JSON string escaping is a valid Python string literal.
        Value::String(_) => value.to_string(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(py_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", Value::String(k.clone()), py_literal(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

/// Render a JSON value as a TypeScript literal.
pub fn ts_literal(value: &Value) -> String {
    // Compact JSON is valid TypeScript.
    value.to_string()
}

/// Make an operation id safe as a Python/TypeScript identifier.
pub fn sanitize_ident(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for (i, c) in id.chars().enumerate() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if i == 0 && c.is_ascii_digit() {
                out.push('_');
            }
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}
