//! Typed-source parser.
//!
//! Consumes a statically-typed (TypeScript-shaped) source file in two
//! passes: interfaces, enums and literal-union aliases first, then function
//! declarations (including exported and arrow-bound forms). A
//! `Promise<T>` return wrapper is unwrapped and records `is_async`; a
//! `T | null` return stays a union; optional parameters and properties are
//! nullable and non-required.

use crate::{ParseError, ParseResult};
use loom_core::{
    ArrayConstraints, EnumBase, EnumSchema, ObjectConstraints, ObjectSchema, Operation,
    OperationKind, Parameter, Response, Schema, Specification, TypeDecl, TypeDeclKind,
};
use std::collections::HashMap;

/// Parse a statically-typed source file into a Specification.
pub fn parse_typed_source(source: &str) -> ParseResult<Specification> {
    let mut parser = TypedParser::new(source);
    parser.collect_types()?;
    parser.collect_functions()?;
    Ok(parser.finish())
}

#[derive(Debug, Clone)]
enum Registered {
    Enum(EnumSchema),
    Model(ObjectSchema),
    Alias(Schema),
}

struct TypedParser<'a> {
    lines: Vec<&'a str>,
    registry: HashMap<String, Registered>,
    types: Vec<TypeDecl>,
    operations: Vec<Operation>,
}

impl<'a> TypedParser<'a> {
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
            let trimmed = strip_export(self.lines[i].trim());

            if let Some(rest) = trimmed.strip_prefix("interface ") {
                let name = ident_prefix(rest);
                let (body, end) = self.brace_block(i)?;
                let schema = self.parse_member_block(&body);
                self.types.push(TypeDecl {
                    name: name.clone(),
                    kind: TypeDeclKind::Model {
                        schema: Schema::Object(schema.clone()),
                    },
                    description: String::new(),
                });
                self.registry.insert(name, Registered::Model(schema));
                i = end + 1;
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("enum ") {
                let name = ident_prefix(rest);
                let (body, end) = self.brace_block(i)?;
                let schema = parse_enum_members(&body);
                self.types.push(TypeDecl {
                    name: name.clone(),
                    kind: TypeDeclKind::Enum {
                        values: schema.values.clone(),
                        base_type: schema.base_type,
                    },
                    description: String::new(),
                });
                self.registry.insert(name, Registered::Enum(schema));
                i = end + 1;
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("type ") {
                if let Some(eq) = rest.find('=') {
                    let name = rest[..eq].trim().to_string();
                    let body = rest[eq + 1..].trim().trim_end_matches(';').trim();
                    if let Some(schema) = string_literal_union(body) {
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
                        let schema = self.ts_type_to_schema(body, &name, false);
                        self.types.push(TypeDecl {
                            name: name.clone(),
                            kind: TypeDeclKind::Alias {
                                schema: schema.clone(),
                            },
                            description: String::new(),
                        });
                        self.registry.insert(name, Registered::Alias(schema));
                    }
                }
            }

            i += 1;
        }
        Ok(())
    }

    /// Collect the `{ ... }` block opening on line `start`; returns the
    /// joined body text and the index of the closing line.
    fn brace_block(&self, start: usize) -> ParseResult<(String, usize)> {
        let mut depth = 0i32;
        let mut body = String::new();
        let mut opened = false;
        for (i, line) in self.lines.iter().enumerate().skip(start) {
            for c in line.chars() {
                match c {
                    '{' => {
                        depth += 1;
                        opened = true;
                    }
                    '}' => depth -= 1,
                    _ => {}
                }
            }
            if i > start {
                body.push('\n');
                body.push_str(line);
            } else if let Some(open) = line.find('{') {
                body.push_str(&line[open + 1..]);
            }
            if opened && depth == 0 {
                // Drop the trailing close brace from the collected body.
                if let Some(pos) = body.rfind('}') {
                    body.truncate(pos);
                }
                return Ok((body, i));
            }
        }
        Err(ParseError::syntax(
            format!("line {}", start + 1),
            "unterminated block",
        ))
    }

    /// Parse `name?: type;` members of an interface or object literal.
    fn parse_member_block(&self, body: &str) -> ObjectSchema {
        let mut properties = Vec::new();
        let mut required = Vec::new();

        for member in split_members(body) {
            let member = member.trim();
            if member.is_empty() || member.starts_with("//") {
                continue;
            }
            let colon = match find_top_level(member, ':') {
                Some(c) => c,
                None => continue,
            };
            let mut name = member[..colon].trim().to_string();
            let ty = member[colon + 1..].trim();
            let optional = name.ends_with('?');
            if optional {
                name.pop();
                name = name.trim().to_string();
            }
            if !is_identifier(&name) {
                continue;
            }

            let mut schema = self.ts_type_to_schema(ty, &name, false);
            if optional {
                set_nullable(&mut schema);
            } else {
                required.push(name.clone());
            }
            properties.push((name, schema));
        }

        ObjectSchema {
            properties,
            required,
            additional_allowed: false,
            constraints: ObjectConstraints::default(),
            named_type: None,
        }
    }

    // ==================== Pass 2: function declarations ====================

    fn collect_functions(&mut self) -> ParseResult<()> {
        let mut i = 0;
        while i < self.lines.len() {
            let raw = self.lines[i].trim();
            let trimmed = strip_export(raw);

            let (is_async, after_async) = match trimmed.strip_prefix("async ") {
                Some(rest) => (true, rest),
                None => (false, trimmed),
            };

            if let Some(rest) = after_async.strip_prefix("function ") {
                let (sig, consumed) = self.join_until_body(rest, i)?;
                let op = self.parse_function_signature(&sig, is_async)?;
                self.operations.push(op);
                i += consumed;
                continue;
            }

            // const f = (a: string): number => ...
            if let Some(rest) = after_async
                .strip_prefix("const ")
                .or_else(|| after_async.strip_prefix("let "))
            {
                if let Some(eq) = rest.find('=') {
                    let name = rest[..eq].trim().trim_end_matches(':').trim();
                    let value = rest[eq + 1..].trim();
                    let (value, arrow_async) = match value.strip_prefix("async ") {
                        Some(v) => (v, true),
                        None => (value, false),
                    };
                    if value.starts_with('(') && is_identifier(name) {
                        let (sig, consumed) = self.join_until_body(value, i)?;
                        if sig.contains("=>") {
                            let op = self.parse_arrow_signature(
                                name,
                                &sig,
                                is_async || arrow_async,
                            )?;
                            self.operations.push(op);
                            i += consumed;
                            continue;
                        }
                    }
                }
            }

            i += 1;
        }
        Ok(())
    }

    /// Join lines until the parameter list closes and a body marker (`{` or
    /// `=>`) appears.
    fn join_until_body(&self, first: &str, line_idx: usize) -> ParseResult<(String, usize)> {
        let mut sig = first.to_string();
        let mut consumed = 1;
        loop {
            let closed = paren_depth(&sig) == 0 && sig.contains('(');
            if closed && (sig.contains('{') || sig.contains("=>") || sig.trim_end().ends_with(';'))
            {
                return Ok((sig, consumed));
            }
            let next = line_idx + consumed;
            if next >= self.lines.len() {
                if closed {
                    return Ok((sig, consumed));
                }
                return Err(ParseError::syntax(
                    format!("line {}", line_idx + 1),
                    "unterminated function signature",
                ));
            }
            sig.push(' ');
            sig.push_str(self.lines[next].trim());
            consumed += 1;
        }
    }

    fn parse_function_signature(&self, sig: &str, is_async: bool) -> ParseResult<Operation> {
        let open = sig
            .find('(')
            .ok_or_else(|| ParseError::syntax(sig.to_string(), "function without parameters"))?;
        let mut name = sig[..open].trim().to_string();

        // Bounded generic parameters resolve to their bound.
        let mut bounds = HashMap::new();
        if let Some(lt) = name.find('<') {
            let generics = name[lt + 1..].trim_end_matches('>').to_string();
            bounds = parse_generic_bounds(&generics);
            name.truncate(lt);
            name = name.trim().to_string();
        }

        let close = matching_paren(sig, open)
            .ok_or_else(|| ParseError::syntax(name.clone(), "unbalanced parentheses"))?;
        let params_src = &sig[open + 1..close];
        let tail = &sig[close + 1..];

        self.build_operation(name, params_src, tail, is_async, &bounds, "{")
    }

    fn parse_arrow_signature(&self, name: &str, sig: &str, is_async: bool) -> ParseResult<Operation> {
        let open = sig
            .find('(')
            .ok_or_else(|| ParseError::syntax(name.to_string(), "arrow without parameters"))?;
        let close = matching_paren(sig, open)
            .ok_or_else(|| ParseError::syntax(name.to_string(), "unbalanced parentheses"))?;
        let params_src = &sig[open + 1..close];
        let tail = &sig[close + 1..];

        self.build_operation(name.to_string(), params_src, tail, is_async, &HashMap::new(), "=>")
    }

    fn build_operation(
        &self,
        name: String,
        params_src: &str,
        tail: &str,
        mut is_async: bool,
        bounds: &HashMap<String, String>,
        body_marker: &str,
    ) -> ParseResult<Operation> {
        let mut properties = Vec::new();
        let mut required = Vec::new();

        for raw in split_top_level(params_src, ',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            if raw.starts_with("...") {
                return Err(ParseError::unsupported(
                    name.clone(),
                    "rest parameters are not supported",
                ));
            }

            let (head, default) = split_default(raw);
            let (mut param_name, ty) = match find_top_level(head, ':') {
                Some(c) => (head[..c].trim().to_string(), head[c + 1..].trim()),
                None => (head.trim().to_string(), ""),
            };
            let optional = param_name.ends_with('?');
            if optional {
                param_name.pop();
                param_name = param_name.trim().to_string();
            }

            let mut schema = if ty.is_empty() {
                Schema::Any
            } else if let Some(bound) = bounds.get(ty) {
                self.ts_type_to_schema(bound, &param_name, false)
            } else {
                self.ts_type_to_schema(ty, &param_name, false)
            };

            if optional {
                set_nullable(&mut schema);
            } else if default.is_none() && !schema.nullable() {
                required.push(param_name.clone());
            }
            properties.push((param_name, schema));
        }

        // Return annotation sits between the parameter list and the body.
        let ret = tail
            .split(body_marker)
            .next()
            .unwrap_or("")
            .trim()
            .trim_start_matches(':')
            .trim()
            .trim_end_matches(';')
            .trim()
            .to_string();

        let return_schema = if ret.is_empty() || ret == "void" {
            None
        } else if let Some(inner) = unwrap_promise(&ret) {
            is_async = true;
            if inner == "void" {
                None
            } else {
                Some(self.ts_type_to_schema(&inner, &name, true))
            }
        } else {
            Some(self.ts_type_to_schema(&ret, &name, true))
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
            description: String::new(),
            metadata: Default::default(),
        })
    }

    // ==================== Type mapping ====================

    /// Map a type expression to a schema. In return position (`keep_null`)
    /// a `T | null` union is preserved instead of collapsing to nullable.
    fn ts_type_to_schema(&self, ty: &str, path: &str, keep_null: bool) -> Schema {
        let ty = ty.trim();

        let parts = split_top_level(ty, '|');
        if parts.len() > 1 {
            let variants: Vec<Schema> = parts
                .iter()
                .map(|p| self.ts_type_to_schema(p.trim(), path, false))
                .collect();
            if keep_null {
                return Schema::Union { variants };
            }
            return finalize_union(variants);
        }

        // T[] array shorthand.
        if let Some(elem) = ty.strip_suffix("[]") {
            return Schema::array(self.ts_type_to_schema(elem, path, false));
        }

        // Tuple [A, B].
        if ty.starts_with('[') && ty.ends_with(']') {
            let inner = &ty[1..ty.len() - 1];
            let parts = split_top_level(inner, ',');
            let len = parts.len();
            let items = self.ts_type_to_schema(parts.first().copied().unwrap_or(""), path, false);
            return Schema::Array {
                items: Box::new(items),
                constraints: ArrayConstraints {
                    min_items: Some(len),
                    max_items: Some(len),
                    unique_items: false,
                },
            };
        }

        // Inline object literal type.
        if ty.starts_with('{') && ty.ends_with('}') {
            return Schema::Object(self.parse_member_block(&ty[1..ty.len() - 1]));
        }

        // String or numeric literal type.
        if (ty.starts_with('"') && ty.ends_with('"')) || (ty.starts_with('\'') && ty.ends_with('\''))
        {
            return Schema::Enum(EnumSchema {
                values: vec![serde_json::Value::String(ty[1..ty.len() - 1].to_string())],
                base_type: EnumBase::Str,
                named_type: None,
            });
        }
        if let Ok(n) = ty.parse::<i64>() {
            return Schema::Enum(EnumSchema {
                values: vec![serde_json::json!(n)],
                base_type: EnumBase::Int,
                named_type: None,
            });
        }

        // Generic applications.
        if let Some(open) = ty.find('<') {
            if ty.ends_with('>') {
                let head = ty[..open].trim();
                let inner = &ty[open + 1..ty.len() - 1];
                match head {
                    "Array" => {
                        return Schema::array(self.ts_type_to_schema(inner, path, false));
                    }
                    "Promise" => {
                        // Promise in a non-return position just unwraps.
                        return self.ts_type_to_schema(inner, path, keep_null);
                    }
                    "Record" | "Map" => {
                        let parts = split_top_level(inner, ',');
                        let (key_hint, value_hint) = match parts.as_slice() {
                            [k, v] => (Some(k.trim().to_string()), Some(v.trim().to_string())),
                            _ => (None, None),
                        };
                        return Schema::Object(ObjectSchema {
                            properties: Vec::new(),
                            required: Vec::new(),
                            additional_allowed: true,
                            constraints: ObjectConstraints {
                                key_hint,
                                value_hint,
                                ..Default::default()
                            },
                            named_type: None,
                        });
                    }
                    _ => {
                        tracing::warn!(r#type = head, path, "unknown generic type");
                        return Schema::Any;
                    }
                }
            }
        }

        match ty {
            "string" => Schema::string(),
            "number" => Schema::number(),
            "boolean" => Schema::Boolean,
            "null" | "undefined" | "void" => Schema::Null,
            "any" | "unknown" => Schema::Any,
            "object" => Schema::Object(ObjectSchema::empty()),
            _ => match self.registry.get(ty) {
                Some(Registered::Enum(e)) => {
                    let mut schema = e.clone();
                    schema.named_type = Some(ty.to_string());
                    Schema::Enum(schema)
                }
                Some(Registered::Model(m)) => {
                    let mut schema = m.clone();
                    schema.named_type = Some(ty.to_string());
                    Schema::Object(schema)
                }
                Some(Registered::Alias(s)) => s.clone(),
                None => {
                    tracing::warn!(r#type = ty, path, "unknown type reference");
                    Schema::Any
                }
            },
        }
    }

}

// ==================== Text helpers ====================

fn strip_export(line: &str) -> &str {
    line.strip_prefix("export default ")
        .or_else(|| line.strip_prefix("export "))
        .unwrap_or(line)
}

fn ident_prefix(s: &str) -> String {
    s.chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().map(|c| c.is_ascii_alphabetic() || c == '_' || c == '$') == Some(true)
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// A `type X = "a" | "b"` alias made entirely of string literals.
fn string_literal_union(body: &str) -> Option<EnumSchema> {
    let parts = split_top_level(body, '|');
    if parts.len() < 2 {
        return None;
    }
    let mut values = Vec::new();
    for p in &parts {
        let p = p.trim();
        if (p.starts_with('"') && p.ends_with('"')) || (p.starts_with('\'') && p.ends_with('\'')) {
            values.push(serde_json::Value::String(p[1..p.len() - 1].to_string()));
        } else {
            return None;
        }
    }
    Some(EnumSchema {
        values,
        base_type: EnumBase::Str,
        named_type: None,
    })
}

fn parse_enum_members(body: &str) -> EnumSchema {
    let mut values = Vec::new();
    for member in body.split(',') {
        let member = member.trim();
        if member.is_empty() || member.starts_with("//") {
            continue;
        }
        match member.find('=') {
            Some(eq) => {
                let raw = member[eq + 1..].trim();
                if (raw.starts_with('"') && raw.ends_with('"'))
                    || (raw.starts_with('\'') && raw.ends_with('\''))
                {
                    values.push(serde_json::Value::String(raw[1..raw.len() - 1].to_string()));
                } else if let Ok(n) = raw.parse::<i64>() {
                    values.push(serde_json::json!(n));
                }
            }
            None => {
                if is_identifier(member) {
                    values.push(serde_json::Value::String(member.to_string()));
                }
            }
        }
    }
    let base_type = if values.iter().all(|v| v.is_i64()) && !values.is_empty() {
        EnumBase::Int
    } else {
        EnumBase::Str
    };
    EnumSchema {
        values,
        base_type,
        named_type: None,
    }
}

/// `T extends Bound` pairs from a generic parameter list.
fn parse_generic_bounds(generics: &str) -> HashMap<String, String> {
    let mut bounds = HashMap::new();
    for part in split_top_level(generics, ',') {
        let part = part.trim();
        match part.find(" extends ") {
            Some(pos) => {
                bounds.insert(
                    part[..pos].trim().to_string(),
                    part[pos + " extends ".len()..].trim().to_string(),
                );
            }
            None => {
                if !part.is_empty() {
                    bounds.insert(part.to_string(), "any".to_string());
                }
            }
        }
    }
    bounds
}

fn unwrap_promise(ty: &str) -> Option<String> {
    let rest = ty.strip_prefix("Promise<")?;
    let inner = rest.strip_suffix('>')?;
    Some(inner.trim().to_string())
}

fn split_members(body: &str) -> Vec<&str> {
    let mut members = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '{' | '(' | '[' | '<' => depth += 1,
            '}' | ')' | ']' | '>' => depth = depth.saturating_sub(1),
            ';' | '\n' | ',' if depth == 0 => {
                members.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < body.len() {
        members.push(&body[start..]);
    }
    members
}

fn find_top_level(s: &str, target: char) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' | '(' | '[' | '<' => depth += 1,
            '}' | ')' | ']' | '>' => depth = depth.saturating_sub(1),
            c if c == target && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
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
            '{' | '(' | '[' | '<' => depth += 1,
            '}' | ')' | ']' | '>' => depth = depth.saturating_sub(1),
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

fn split_default(s: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' | '(' | '{' | '<' => depth += 1,
            ']' | ')' | '}' | '>' => depth = depth.saturating_sub(1),
            '=' if depth == 0 => {
                if s[i + 1..].starts_with('=') || s[i + 1..].starts_with('>') {
                    continue;
                }
                if s[..i].ends_with(['=', '!', '<', '>']) {
                    continue;
                }
                return (s[..i].trim(), Some(s[i + 1..].trim()));
            }
            _ => {}
        }
    }
    (s.trim(), None)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_declaration() {
        let spec = parse_typed_source(
            "export function greet(name: string, times: number = 1): string {\n  return name;\n}\n",
        )
        .unwrap();

        assert_eq!(spec.operations.len(), 1);
        let op = &spec.operations[0];
        assert_eq!(op.id, "greet");
        assert!(matches!(
            op.kind,
            OperationKind::Function { is_async: false, .. }
        ));

        let body = op.body_schema().unwrap().as_object().unwrap();
        assert_eq!(body.required, vec!["name"]);
        assert!(matches!(
            op.successes[0].schema.as_ref().unwrap(),
            Schema::String(_)
        ));
    }

    #[test]
    fn test_promise_unwrap_sets_async() {
        let spec = parse_typed_source(
            "function load(id: string): Promise<number> {\n  return fetch(id);\n}\n",
        )
        .unwrap();

        let op = &spec.operations[0];
        assert!(matches!(
            op.kind,
            OperationKind::Function { is_async: true, .. }
        ));
        assert!(matches!(
            op.successes[0].schema.as_ref().unwrap(),
            Schema::Number(_)
        ));
    }

    #[test]
    fn test_nullable_return_stays_a_union() {
        let spec = parse_typed_source(
            "function find(id: string): User | null {\n  return null;\n}\ninterface User { id: string }\n",
        )
        .unwrap();

        match spec.operations[0].successes[0].schema.as_ref().unwrap() {
            Schema::Union { variants } => {
                assert_eq!(variants.len(), 2);
                assert!(matches!(variants[1], Schema::Null));
            }
            other => panic!("expected union return, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_parameter_nullable_and_not_required() {
        let spec =
            parse_typed_source("function f(a: string, b?: number): void {}\n").unwrap();
        let body = spec.operations[0].body_schema().unwrap().as_object().unwrap();
        assert_eq!(body.required, vec!["a"]);
        match body.property("b").unwrap() {
            Schema::Number(c) => assert!(c.nullable),
            other => panic!("expected nullable number, got {:?}", other),
        }
    }

    #[test]
    fn test_interface_and_reference() {
        let spec = parse_typed_source(
            r#"
interface User {
  name: string;
  email?: string;
}

function register(user: User): boolean {
  return true;
}
"#,
        )
        .unwrap();

        assert_eq!(spec.types.len(), 1);
        let body = spec.operations[0].body_schema().unwrap().as_object().unwrap();
        match body.property("user").unwrap() {
            Schema::Object(o) => {
                assert_eq!(o.named_type.as_deref(), Some("User"));
                assert_eq!(o.required, vec!["name"]);
            }
            other => panic!("expected object ref, got {:?}", other),
        }
    }

    #[test]
    fn test_string_literal_union_becomes_enum() {
        let spec = parse_typed_source(
            "type Mode = \"fast\" | \"slow\";\nfunction run(mode: Mode): void {}\n",
        )
        .unwrap();

        let body = spec.operations[0].body_schema().unwrap().as_object().unwrap();
        match body.property("mode").unwrap() {
            Schema::Enum(e) => {
                assert_eq!(e.named_type.as_deref(), Some("Mode"));
                assert_eq!(e.values.len(), 2);
            }
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn test_arrow_function() {
        let spec = parse_typed_source(
            "export const sum = (a: number, b: number): number => a + b;\n",
        )
        .unwrap();
        assert_eq!(spec.operations[0].id, "sum");
        let body = spec.operations[0].body_schema().unwrap().as_object().unwrap();
        assert_eq!(body.properties.len(), 2);
    }

    #[test]
    fn test_bounded_generic_resolves_to_bound() {
        let spec = parse_typed_source(
            "function id<T extends string>(value: T): void {}\n",
        )
        .unwrap();
        let body = spec.operations[0].body_schema().unwrap().as_object().unwrap();
        assert!(matches!(body.property("value").unwrap(), Schema::String(_)));
    }

    #[test]
    fn test_array_forms() {
        let spec = parse_typed_source(
            "function f(a: number[], b: Array<string>): void {}\n",
        )
        .unwrap();
        let body = spec.operations[0].body_schema().unwrap().as_object().unwrap();
        match body.property("a").unwrap() {
            Schema::Array { items, .. } => assert!(matches!(**items, Schema::Number(_))),
            other => panic!("expected array, got {:?}", other),
        }
        match body.property("b").unwrap() {
            Schema::Array { items, .. } => assert!(matches!(**items, Schema::String(_))),
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_rest_parameters_rejected() {
        let err = parse_typed_source("function f(...rest: number[]): void {}\n").unwrap_err();
        assert_eq!(err.kind, crate::ParseErrorKind::UnsupportedFeature);
    }

    #[test]
    fn test_ts_enum_declaration() {
        let spec = parse_typed_source(
            "enum Color { Red = \"red\", Blue = \"blue\" }\nfunction paint(c: Color): void {}\n",
        )
        .unwrap();
        let body = spec.operations[0].body_schema().unwrap().as_object().unwrap();
        match body.property("c").unwrap() {
            Schema::Enum(e) => assert_eq!(e.values[0], serde_json::json!("red")),
            other => panic!("expected enum, got {:?}", other),
        }
    }
}
