//! Dynamic-source parser.
//!
//! Consumes a dynamically-typed (Python-shaped) source file in two passes:
//! the first collects type declarations (enum classes and annotated model
//! classes), the second collects function signatures. Each function becomes
//! an operation whose parameters are bundled into a synthetic `body` object
//! schema; value constraints come from annotations only, never from the
//! function body.

use crate::{ParseError, ParseResult};
use loom_core::{
    ArrayConstraints, EnumBase, EnumSchema, NumberConstraints, ObjectConstraints, ObjectSchema,
    Operation, OperationKind, Parameter, Response, Schema, Specification, StringConstraints,
    TypeDecl, TypeDeclKind,
};
use std::collections::HashMap;

/// Parse a dynamically-typed source file into a Specification.
pub fn parse_dynamic_source(source: &str) -> ParseResult<Specification> {
    let mut parser = SourceParser::new(source);
    parser.collect_types()?;
    parser.collect_functions()?;
    Ok(parser.finish())
}

/// A named type collected during the first pass.
#[derive(Debug, Clone)]
enum Registered {
    Enum(EnumSchema),
    Model(ObjectSchema),
}

struct SourceParser<'a> {
    lines: Vec<&'a str>,
    registry: HashMap<String, Registered>,
    types: Vec<TypeDecl>,
    operations: Vec<Operation>,
}

impl<'a> SourceParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines().collect(),
            registry: HashMap::new(),
            types: Vec::new(),
            operations: Vec::new(),
        }
    }

    fn finish(self) -> Specification {
        Specification {
            title: "module".to_string(),
            version: "1.0.0".to_string(),
            description: String::new(),
            operations: self.operations,
            types: self.types,
        }
    }

    // ==================== Pass 1: type declarations ====================

    fn collect_types(&mut self) -> ParseResult<()> {
        let mut i = 0;
        while i < self.lines.len() {
            let line = self.lines[i];
            let trimmed = line.trim_start();
            if let Some(rest) = trimmed.strip_prefix("class ") {
                let indent = indent_of(line);
                let (name, bases) = parse_class_header(rest);
                let body_end = self.block_end(i + 1, indent);

                if bases.iter().any(|b| b.contains("Enum")) {
                    let schema = self.parse_enum_body(i + 1, body_end);
                    self.types.push(TypeDecl {
                        name: name.clone(),
                        kind: TypeDeclKind::Enum {
                            values: schema.values.clone(),
                            base_type: schema.base_type,
                        },
                        description: String::new(),
                    });
                    self.registry.insert(name, Registered::Enum(schema));
                } else {
                    let schema = self.parse_model_body(&name, i + 1, body_end)?;
                    self.types.push(TypeDecl {
                        name: name.clone(),
                        kind: TypeDeclKind::Model {
                            schema: Schema::Object(schema.clone()),
                        },
                        description: String::new(),
                    });
                    self.registry.insert(name, Registered::Model(schema));
                }
                i = body_end;
            } else {
                i += 1;
            }
        }
        Ok(())
    }

    /// First line index at or after `start` whose indentation returns to the
    /// enclosing level (blank lines and comments do not end a block).
    fn block_end(&self, start: usize, parent_indent: usize) -> usize {
        let mut i = start;
        while i < self.lines.len() {
            let line = self.lines[i];
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('#') && indent_of(line) <= parent_indent {
                return i;
            }
            i += 1;
        }
        self.lines.len()
    }

    fn parse_enum_body(&self, start: usize, end: usize) -> EnumSchema {
        let mut values = Vec::new();
        for line in &self.lines[start..end] {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("\"\"\"") {
                continue;
            }
            if let Some(eq) = trimmed.find('=') {
                let member = trimmed[..eq].trim();
                if member.is_empty() || !is_identifier(member) {
                    continue;
                }
                let value = parse_literal(trimmed[eq + 1..].trim())
                    .unwrap_or_else(|| serde_json::Value::String(member.to_string()));
                values.push(value);
            }
        }

        let base_type = infer_literal_base(&values);
        EnumSchema {
            values,
            base_type,
            named_type: None,
        }
    }

    fn parse_model_body(&self, class_name: &str, start: usize, end: usize) -> ParseResult<ObjectSchema> {
        let mut properties = Vec::new();
        let mut required = Vec::new();

        for line in &self.lines[start..end] {
            let trimmed = line.trim();
            if trimmed.is_empty()
                || trimmed.starts_with('#')
                || trimmed.starts_with("\"\"\"")
                || trimmed.starts_with("def ")
                || trimmed.starts_with("async def ")
                || trimmed.starts_with('@')
            {
                continue;
            }
            // Annotated field: name: Type [= default]
            let colon = match trimmed.find(':') {
                Some(c) => c,
                None => continue,
            };
            let field = trimmed[..colon].trim();
            if !is_identifier(field) {
                continue;
            }

            let rest = &trimmed[colon + 1..];
            let (annotation, default) = split_default(rest);
            let path = format!("{}.{}", class_name, field);
            let schema = self.annotation_to_schema(annotation.trim(), &path);

            if default.is_none() && !schema.nullable() {
                required.push(field.to_string());
            }
            properties.push((field.to_string(), schema));
        }

        Ok(ObjectSchema {
            properties,
            required,
            additional_allowed: false,
            constraints: ObjectConstraints::default(),
            named_type: None,
        })
    }

    // ==================== Pass 2: function declarations ====================

    fn collect_functions(&mut self) -> ParseResult<()> {
        let mut i = 0;
        while i < self.lines.len() {
            let line = self.lines[i];
            if indent_of(line) != 0 {
                i += 1;
                continue;
            }
            let trimmed = line.trim_start();
            let (is_async, rest) = if let Some(r) = trimmed.strip_prefix("async def ") {
                (true, r)
            } else if let Some(r) = trimmed.strip_prefix("def ") {
                (false, r)
            } else {
                i += 1;
                continue;
            };

            let (signature, consumed) = self.join_signature(rest, i)?;
            let op = self.parse_function(&signature, is_async, i + consumed)?;
            self.operations.push(op);
            i += consumed;
        }
        Ok(())
    }

    /// Join a signature that may span multiple lines until the closing
    /// parenthesis and trailing colon.
    fn join_signature(&self, first: &str, line_idx: usize) -> ParseResult<(String, usize)> {
        let mut sig = first.to_string();
        let mut consumed = 1;
        while paren_depth(&sig) > 0 {
            let next = line_idx + consumed;
            if next >= self.lines.len() {
                return Err(ParseError::syntax(
                    format!("line {}", line_idx + 1),
                    "unterminated function signature",
                ));
            }
            sig.push(' ');
            sig.push_str(self.lines[next].trim());
            consumed += 1;
        }
        Ok((sig, consumed))
    }

    fn parse_function(
        &self,
        signature: &str,
        is_async: bool,
        body_line: usize,
    ) -> ParseResult<Operation> {
        let open = signature.find('(').ok_or_else(|| {
            ParseError::syntax(signature.to_string(), "function without parameter list")
        })?;
        let name = signature[..open].trim().to_string();
        let close = matching_paren(signature, open).ok_or_else(|| {
            ParseError::syntax(name.clone(), "unbalanced parameter parentheses")
        })?;

        let params_src = &signature[open + 1..close];
        let tail = signature[close + 1..].trim().trim_end_matches(':').trim();

        let mut properties = Vec::new();
        let mut required = Vec::new();

        for raw_param in split_top_level(params_src, ',') {
            let raw_param = raw_param.trim();
            if raw_param.is_empty() || raw_param == "*" || raw_param == "/" {
                continue;
            }
            if raw_param.starts_with("**") || raw_param.starts_with('*') {
                return Err(ParseError::unsupported(
                    name.clone(),
                    "functions with *args or **kwargs are not supported",
                ));
            }

            let (head, default) = split_default(raw_param);
            let (param_name, annotation) = match head.find(':') {
                Some(c) => (head[..c].trim(), head[c + 1..].trim()),
                None => (head.trim(), ""),
            };
            if param_name == "self" || param_name == "cls" {
                continue;
            }
            if annotation.is_empty() {
                // Strict mode: every argument carries a type hint.
                return Err(ParseError::syntax(
                    format!("{}.args.{}", name, param_name),
                    "argument is missing a type hint",
                ));
            }

            let path = format!("{}.args.{}", name, param_name);
            let schema = self.annotation_to_schema(annotation, &path);
            if default.is_none() && !schema.nullable() {
                required.push(param_name.to_string());
            }
            properties.push((param_name.to_string(), schema));
        }

        let return_schema = {
            let ret = tail.strip_prefix("->").map(str::trim).unwrap_or("");
            if ret.is_empty() {
                None
            } else {
                Some(self.annotation_to_schema(ret, &format!("{}.returns", name)))
            }
        };

        let body = Parameter::new(
            "body",
            true,
            Schema::Object(ObjectSchema {
                properties,
                required,
                additional_allowed: false,
                constraints: ObjectConstraints::default(),
                named_type: None,
            }),
        );

        Ok(Operation {
            id: name,
            kind: OperationKind::Function {
                is_async,
                module_hint: None,
            },
            path_params: Vec::new(),
            query_params: Vec::new(),
            headers: Vec::new(),
            body: Some(body),
            successes: vec![Response::new(200, return_schema)],
            errors: Vec::new(),
            description: self.docstring_at(body_line),
            metadata: Default::default(),
        })
    }

    fn docstring_at(&self, line: usize) -> String {
        let first = match self.lines.get(line) {
            Some(l) => l.trim(),
            None => return String::new(),
        };
        let Some(rest) = first.strip_prefix("\"\"\"") else {
            return String::new();
        };
        if let Some(inner) = rest.strip_suffix("\"\"\"") {
            if !inner.is_empty() {
                return inner.trim().to_string();
            }
        }
        // Multi-line docstring: take the first non-empty content line.
        for l in self.lines.iter().skip(line + 1) {
            let t = l.trim();
            if t.contains("\"\"\"") {
                break;
            }
            if !t.is_empty() {
                return t.to_string();
            }
        }
        rest.trim().to_string()
    }

    // ==================== Annotation mapping ====================

    /// Map a type annotation to a schema. The mapping is total: unknown
    /// annotations become `Any` with a diagnostic.
    fn annotation_to_schema(&self, annotation: &str, path: &str) -> Schema {
        let annotation = annotation.trim();

        // Pipe unions (A | B | None) take precedence over subscripts.
        let pipe_parts = split_top_level(annotation, '|');
        if pipe_parts.len() > 1 {
            let variants: Vec<Schema> = pipe_parts
                .iter()
                .map(|p| self.annotation_to_schema(p, path))
                .collect();
            return finalize_union(variants);
        }

        if let Some(open) = annotation.find('[') {
            if annotation.ends_with(']') {
                let container = annotation[..open].trim();
                let inner = &annotation[open + 1..annotation.len() - 1];
                return self.subscript_to_schema(container, inner, path);
            }
        }

        self.name_to_schema(annotation, path)
    }

    fn subscript_to_schema(&self, container: &str, inner: &str, path: &str) -> Schema {
        match container {
            "List" | "list" | "Set" | "set" | "FrozenSet" | "Sequence" | "Iterable" => {
                Schema::array(self.annotation_to_schema(inner, path))
            }
            "Tuple" | "tuple" => {
                let parts = split_top_level(inner, ',');
                let len = parts.len();
                let items = self.annotation_to_schema(parts.first().copied().unwrap_or(""), path);
                Schema::Array {
                    items: Box::new(items),
                    constraints: ArrayConstraints {
                        min_items: Some(len),
                        max_items: Some(len),
                        unique_items: false,
                    },
                }
            }
            "Dict" | "dict" | "Mapping" | "MutableMapping" => {
                let parts = split_top_level(inner, ',');
                let (key_hint, value_hint) = match parts.as_slice() {
                    [k, v] => (Some(k.trim().to_string()), Some(v.trim().to_string())),
                    _ => (None, None),
                };
                Schema::Object(ObjectSchema {
                    properties: Vec::new(),
                    required: Vec::new(),
                    additional_allowed: true,
                    constraints: ObjectConstraints {
                        key_hint,
                        value_hint,
                        ..Default::default()
                    },
                    named_type: None,
                })
            }
            "Optional" => {
                let mut schema = self.annotation_to_schema(inner, path);
                set_nullable(&mut schema);
                schema
            }
            "Union" => {
                let variants: Vec<Schema> = split_top_level(inner, ',')
                    .iter()
                    .map(|p| self.annotation_to_schema(p, path))
                    .collect();
                finalize_union(variants)
            }
            "Literal" => {
                let values: Vec<serde_json::Value> = split_top_level(inner, ',')
                    .iter()
                    .filter_map(|p| parse_literal(p.trim()))
                    .collect();
                let base_type = infer_literal_base(&values);
                Schema::Enum(EnumSchema {
                    values,
                    base_type,
                    named_type: None,
                })
            }
            "Type" | "ClassVar" => self.annotation_to_schema(inner, path),
            _ => {
                tracing::warn!(annotation = container, path, "unknown annotation container");
                Schema::Any
            }
        }
    }

    fn name_to_schema(&self, name: &str, path: &str) -> Schema {
        match name {
            "str" => Schema::string(),
            "int" => Schema::integer(),
            "float" => Schema::number(),
            "bool" => Schema::Boolean,
            "None" => Schema::Null,
            "Any" => Schema::Any,
            "dict" => Schema::Object(ObjectSchema::empty()),
            "list" => Schema::array(Schema::Any),
            _ => match self.registry.get(name) {
                Some(Registered::Enum(e)) => {
                    let mut schema = e.clone();
                    schema.named_type = Some(name.to_string());
                    Schema::Enum(schema)
                }
                Some(Registered::Model(m)) => {
                    let mut schema = m.clone();
                    schema.named_type = Some(name.to_string());
                    Schema::Object(schema)
                }
                None => {
                    tracing::warn!(annotation = name, path, "unknown annotation");
                    Schema::Any
                }
            },
        }
    }
}

// ==================== Text helpers ====================

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().map(|c| c.is_ascii_alphabetic() || c == '_') == Some(true)
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_class_header(rest: &str) -> (String, Vec<String>) {
    let rest = rest.trim_end_matches(':').trim();
    match rest.find('(') {
        Some(open) => {
            let name = rest[..open].trim().to_string();
            let bases = rest[open + 1..rest.rfind(')').unwrap_or(rest.len())]
                .split(',')
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty())
                .collect();
            (name, bases)
        }
        None => (rest.to_string(), Vec::new()),
    }
}

/// Split `annotation = default` at the top-level equals sign.
fn split_default(s: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            '=' if depth == 0 => {
                // Avoid ==, >=, <=, != comparisons inside defaults.
                if s[..i].ends_with(['=', '!', '<', '>']) || s[i + 1..].starts_with('=') {
                    continue;
                }
                return (s[..i].trim(), Some(s[i + 1..].trim()));
            }
            _ => {}
        }
    }
    (s.trim(), None)
}

fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut in_str: Option<char> = None;
    for (i, c) in s.char_indices() {
        if let Some(quote) = in_str {
            if c == quote {
                in_str = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => in_str = Some(c),
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start <= s.len() {
        parts.push(&s[start..]);
    }
    parts
}

fn paren_depth(s: &str) -> i32 {
    let mut depth = 0;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
    }
    depth
}

fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0;
    for (i, c) in s.char_indices().skip(open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_literal(s: &str) -> Option<serde_json::Value> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        return Some(serde_json::Value::String(s[1..s.len() - 1].to_string()));
    }
    match s {
        "True" => return Some(serde_json::Value::Bool(true)),
        "False" => return Some(serde_json::Value::Bool(false)),
        "None" => return Some(serde_json::Value::Null),
        _ => {}
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(serde_json::json!(i));
    }
    if let Ok(f) = s.parse::<f64>() {
        return Some(serde_json::json!(f));
    }
    None
}

fn infer_literal_base(values: &[serde_json::Value]) -> EnumBase {
    let mut base: Option<EnumBase> = None;
    for v in values {
        let this = if v.is_string() {
            EnumBase::Str
        } else if v.is_i64() || v.is_u64() {
            EnumBase::Int
        } else if v.is_number() {
            EnumBase::Number
        } else if v.is_boolean() {
            EnumBase::Bool
        } else {
            return EnumBase::Mixed;
        };
        match base {
            None => base = Some(this),
            Some(b) if b != this => return EnumBase::Mixed,
            _ => {}
        }
    }
    base.unwrap_or(EnumBase::Str)
}

fn set_nullable(schema: &mut Schema) {
    match schema {
        Schema::String(c) => c.nullable = true,
        Schema::Integer(c) | Schema::Number(c) => c.nullable = true,
        _ => {}
    }
}

fn finalize_union(variants: Vec<Schema>) -> Schema {
    let has_null = variants.iter().any(|v| matches!(v, Schema::Null));
    let mut non_null: Vec<Schema> = variants
        .into_iter()
        .filter(|v| !matches!(v, Schema::Null))
        .collect();

    if non_null.len() == 1 {
        let mut only = non_null.remove(0);
        if has_null {
            set_nullable(&mut only);
        }
        return only;
    }
    if has_null {
        non_null.push(Schema::Null);
    }
    Schema::Union { variants: non_null }
}
