//! HTTP-contract parser.
//!
//! Reads an OpenAPI-shaped JSON contract document and emits the IR. All
//! internal `#/components/schemas/...` references are resolved eagerly;
//! `allOf` intersections are merged into a single object with the stricter
//! bound winning; `oneOf`/`anyOf` become unions. Reference cycles are not
//! supported and are rejected during parsing.

use crate::{ParseError, ParseResult};
use loom_core::{
    ArrayConstraints, DependentRule, EnumBase, EnumSchema, HttpMethod, NumberConstraints,
    ObjectConstraints, ObjectSchema, Operation, OperationKind, Parameter, Response, Schema,
    Specification, StringConstraints, StringFormat, TypeDecl, TypeDeclKind,
};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Parse a JSON contract document into a Specification.
pub fn parse_http_contract(source: &str) -> ParseResult<Specification> {
    let doc: Value = serde_json::from_str(source)
        .map_err(|e| ParseError::syntax("document", e.to_string()))?;
    ContractParser::new(&doc).parse()
}

struct ContractParser<'a> {
    doc: &'a Value,
}

impl<'a> ContractParser<'a> {
    fn new(doc: &'a Value) -> Self {
        Self { doc }
    }

    fn parse(&self) -> ParseResult<Specification> {
        let info = &self.doc["info"];
        let title = str_or(info, "title", "API");
        let version = str_or(info, "version", "1.0.0");
        let description = str_or(info, "description", "");

        let types = self.parse_type_decls()?;
        let operations = self.parse_operations()?;

        Ok(Specification {
            title,
            version,
            description,
            operations,
            types,
        })
    }

    /// Collect `components/schemas` entries as named type declarations.
    ///
    /// Downstream schemas are fully inlined; these declarations exist so
    /// renderers can emit imports for named enums and models.
    fn parse_type_decls(&self) -> ParseResult<Vec<TypeDecl>> {
        let mut decls = Vec::new();
        let schemas = match self.doc.pointer("/components/schemas") {
            Some(Value::Object(map)) => map,
            _ => return Ok(decls),
        };

        for (name, raw) in schemas {
            let ptr = format!("components.schemas.{}", name);
            let mut stack = Vec::new();
            let schema = self.convert(raw, &ptr, &mut stack)?;
            let kind = match &schema {
                Schema::Enum(e) => TypeDeclKind::Enum {
                    values: e.values.clone(),
                    base_type: e.base_type,
                },
                Schema::Object(_) => TypeDeclKind::Model { schema },
                _ => TypeDeclKind::Alias { schema },
            };
            decls.push(TypeDecl {
                name: name.clone(),
                kind,
                description: str_or(raw, "description", ""),
            });
        }

        Ok(decls)
    }

    fn parse_operations(&self) -> ParseResult<Vec<Operation>> {
        let mut operations = Vec::new();
        let paths = match self.doc.get("paths") {
            Some(Value::Object(map)) => map,
            _ => return Ok(operations),
        };

        for (path, methods) in paths {
            let methods = match methods.as_object() {
                Some(m) => m,
                None => continue,
            };
            for (method_key, raw_op) in methods {
                let method = match HttpMethod::from_keyword(method_key) {
                    Some(m) => m,
                    // Not a method key (e.g. shared `parameters`); skip.
                    None => continue,
                };
                let ptr = format!("paths.{}.{}", path, method_key);
                operations.push(self.parse_operation(method, path, raw_op, &ptr)?);
            }
        }

        Ok(operations)
    }

    fn parse_operation(
        &self,
        method: HttpMethod,
        path: &str,
        raw: &Value,
        ptr: &str,
    ) -> ParseResult<Operation> {
        let id = match raw.get("operationId").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => synthesize_operation_id(method, path),
        };

        let (path_params, query_params, headers) = self.parse_parameters(raw, ptr)?;
        let body = self.parse_request_body(raw, ptr)?;
        let (successes, errors) = self.parse_responses(raw, ptr)?;

        Ok(Operation {
            id,
            kind: OperationKind::Http {
                method,
                path: path.to_string(),
            },
            path_params,
            query_params,
            headers,
            body,
            successes,
            errors,
            description: str_or(raw, "description", ""),
            metadata: Default::default(),
        })
    }

    /// Group declared parameters by location, deduplicated by
    /// (location, name) with the first declaration winning.
    #[allow(clippy::type_complexity)]
    fn parse_parameters(
        &self,
        raw: &Value,
        ptr: &str,
    ) -> ParseResult<(Vec<Parameter>, Vec<Parameter>, Vec<Parameter>)> {
        let mut path_params = Vec::new();
        let mut query_params = Vec::new();
        let mut headers = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        let params = match raw.get("parameters") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        };

        for param in params {
            let name = match param.get("name").and_then(Value::as_str) {
                Some(n) => n.to_string(),
                None => {
                    return Err(ParseError::syntax(
                        format!("{}.parameters", ptr),
                        "parameter without a name",
                    ))
                }
            };
            let location = str_or(param, "in", "query");
            if !seen.insert((location.clone(), name.clone())) {
                continue;
            }

            let schema = match param.get("schema") {
                Some(raw_schema) => {
                    let mut stack = Vec::new();
                    self.convert(raw_schema, &format!("{}.parameters.{}", ptr, name), &mut stack)?
                }
                None => Schema::Any,
            };
            // Path parameters are required by construction; the contract
            // format mandates it even when the flag is omitted.
            let required = param
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(location == "path");

            let parameter = Parameter::new(name, required, schema);
            match location.as_str() {
                "path" => path_params.push(parameter),
                "query" => query_params.push(parameter),
                "header" => headers.push(parameter),
                _ => {}
            }
        }

        Ok((path_params, query_params, headers))
    }

    fn parse_request_body(&self, raw: &Value, ptr: &str) -> ParseResult<Option<Parameter>> {
        let raw_schema = match raw.pointer("/requestBody/content/application~1json/schema") {
            Some(s) => s,
            None => return Ok(None),
        };
        let required = raw
            .pointer("/requestBody/required")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let mut stack = Vec::new();
        let schema = self.convert(raw_schema, &format!("{}.requestBody", ptr), &mut stack)?;
        Ok(Some(Parameter::new("body", required, schema)))
    }

    /// Split declared responses at status-code boundaries: below 400 are
    /// successes, 400-499 are errors, 500 and above are ignored.
    fn parse_responses(
        &self,
        raw: &Value,
        ptr: &str,
    ) -> ParseResult<(Vec<Response>, Vec<Response>)> {
        let mut successes = Vec::new();
        let mut errors = Vec::new();

        let responses = match raw.get("responses") {
            Some(Value::Object(map)) => map,
            _ => return Ok((successes, errors)),
        };

        for (status_key, resp) in responses {
            let status: u16 = match status_key.parse() {
                Ok(s) => s,
                Err(_) => continue,
            };
            if status >= 500 {
                continue;
            }

            let schema = match resp.pointer("/content/application~1json/schema") {
                Some(raw_schema) => {
                    let mut stack = Vec::new();
                    Some(self.convert(
                        raw_schema,
                        &format!("{}.responses.{}", ptr, status),
                        &mut stack,
                    )?)
                }
                None => None,
            };

            let response = Response {
                status,
                description: str_or(resp, "description", ""),
                schema,
            };
            if status < 400 {
                successes.push(response);
            } else {
                errors.push(response);
            }
        }

        Ok((successes, errors))
    }

    // ==================== Schema conversion ====================

    fn convert(&self, raw: &Value, ptr: &str, stack: &mut Vec<String>) -> ParseResult<Schema> {
        let map = match raw.as_object() {
            Some(m) => m,
            None => return Ok(Schema::Any),
        };

        if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
            return self.convert_ref(reference, map, ptr, stack);
        }

        if let Some(Value::Array(branches)) = map.get("allOf") {
            return self.convert_all_of(map, branches, ptr, stack);
        }

        if let Some(Value::Array(variants)) = map.get("anyOf") {
            return self.convert_variants(variants, ptr, stack, true);
        }

        if let Some(Value::Array(variants)) = map.get("oneOf") {
            return self.convert_variants(variants, ptr, stack, false);
        }

        if let Some(Value::Array(values)) = map.get("enum") {
            return Ok(Schema::Enum(convert_enum(values, map)));
        }

        let nullable = map
            .get("nullable")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        match map.get("type").and_then(Value::as_str) {
            Some("string") => Ok(Schema::String(string_constraints(map, nullable))),
            Some("integer") => Ok(Schema::Integer(number_constraints(map, nullable))),
            Some("number") => Ok(Schema::Number(number_constraints(map, nullable))),
            Some("boolean") => Ok(Schema::Boolean),
            Some("null") => Ok(Schema::Null),
            Some("array") => self.convert_array(map, ptr, stack),
            Some("object") => self.convert_object(map, ptr, stack),
            Some(other) => Err(ParseError::unsupported(
                ptr,
                format!("unknown schema type '{}'", other),
            )),
            // An untyped schema with properties is an object; a bare one is
            // unconstrained.
            None if map.contains_key("properties") => self.convert_object(map, ptr, stack),
            None => Ok(Schema::Any),
        }
    }

    fn convert_ref(
        &self,
        reference: &str,
        siblings: &Map<String, Value>,
        ptr: &str,
        stack: &mut Vec<String>,
    ) -> ParseResult<Schema> {
        if stack.iter().any(|r| r == reference) {
            return Err(ParseError::unsupported(
                ptr,
                format!("reference cycle through {}", reference),
            ));
        }

        let pointer = reference.strip_prefix("#").unwrap_or(reference);
        let resolved = self.doc.pointer(pointer).ok_or_else(|| {
            ParseError::unresolved(ptr, format!("cannot resolve {}", reference))
        })?;
        let resolved_map = resolved.as_object().ok_or_else(|| {
            ParseError::unresolved(ptr, format!("{} is not a schema object", reference))
        })?;

        // Sibling keys next to $ref override the resolved declaration.
        let mut merged = resolved_map.clone();
        for (k, v) in siblings {
            if k != "$ref" {
                merged.insert(k.clone(), v.clone());
            }
        }

        stack.push(reference.to_string());
        let mut schema = self.convert(&Value::Object(merged), ptr, stack)?;
        stack.pop();

        // Keep the declaration identity so renderers can emit imports.
        if let Some(name) = reference.rsplit('/').next() {
            match &mut schema {
                Schema::Enum(e) => e.named_type = Some(name.to_string()),
                Schema::Object(o) => o.named_type = Some(name.to_string()),
                _ => {}
            }
        }

        Ok(schema)
    }

    /// Merge an `allOf` intersection into a single object schema:
    /// `required` is the union, `properties` merge right-biased, and
    /// numeric/length bounds are tightened (the stricter bound wins).
    fn convert_all_of(
        &self,
        map: &Map<String, Value>,
        branches: &[Value],
        ptr: &str,
        stack: &mut Vec<String>,
    ) -> ParseResult<Schema> {
        let mut merged: Option<ObjectSchema> = None;
        let mut last_non_object: Option<Schema> = None;

        // Inline keys next to allOf act as one more branch.
        let mut own = map.clone();
        own.remove("allOf");
        let own_branch = if own.contains_key("properties") || own.contains_key("required") {
            Some(Value::Object(own))
        } else {
            None
        };

        for branch in branches.iter().chain(own_branch.as_ref()) {
            let schema = self.convert(branch, ptr, stack)?;
            match schema {
                Schema::Object(obj) => {
                    merged = Some(match merged.take() {
                        Some(acc) => merge_objects(acc, obj),
                        None => obj,
                    });
                }
                other => last_non_object = Some(other),
            }
        }

        match (merged, last_non_object) {
            (Some(obj), _) => Ok(Schema::Object(obj)),
            (None, Some(schema)) => Ok(schema),
            (None, None) => Ok(Schema::Any),
        }
    }

    /// Convert a `oneOf`/`anyOf` variant list. For `anyOf`, a lone non-null
    /// variant next to `null` collapses to that variant with
    /// `nullable = true` instead of a union.
    fn convert_variants(
        &self,
        variants: &[Value],
        ptr: &str,
        stack: &mut Vec<String>,
        collapse: bool,
    ) -> ParseResult<Schema> {
        let mut converted = Vec::new();
        for v in variants {
            converted.push(self.convert(v, ptr, stack)?);
        }

        let has_null = converted.iter().any(|s| matches!(s, Schema::Null));
        if collapse {
            let mut non_null: Vec<Schema> = converted
                .iter()
                .filter(|s| !matches!(s, Schema::Null))
                .cloned()
                .collect();
            if non_null.len() == 1 {
                let mut only = non_null.remove(0);
                if has_null {
                    set_nullable(&mut only);
                }
                return Ok(only);
            }
        }

        if converted.len() == 1 {
            return Ok(converted.remove(0));
        }

        Ok(Schema::Union {
            variants: converted,
        })
    }

    fn convert_array(
        &self,
        map: &Map<String, Value>,
        ptr: &str,
        stack: &mut Vec<String>,
    ) -> ParseResult<Schema> {
        // An array without items accepts anything.
        let items = match map.get("items") {
            Some(raw_items) => self.convert(raw_items, &format!("{}.items", ptr), stack)?,
            None => Schema::Any,
        };

        Ok(Schema::Array {
            items: Box::new(items),
            constraints: ArrayConstraints {
                min_items: usize_field(map, "minItems"),
                max_items: usize_field(map, "maxItems"),
                unique_items: map
                    .get("uniqueItems")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
        })
    }

    fn convert_object(
        &self,
        map: &Map<String, Value>,
        ptr: &str,
        stack: &mut Vec<String>,
    ) -> ParseResult<Schema> {
        let mut properties = Vec::new();
        if let Some(Value::Object(props)) = map.get("properties") {
            for (name, raw_prop) in props {
                let schema = self.convert(raw_prop, &format!("{}.{}", ptr, name), stack)?;
                properties.push((name.clone(), schema));
            }
        }

        let mut required = Vec::new();
        if let Some(Value::Array(names)) = map.get("required") {
            for n in names.iter().filter_map(Value::as_str) {
                if !required.iter().any(|r| r == n) {
                    required.push(n.to_string());
                }
            }
        }

        let additional_allowed = !matches!(map.get("additionalProperties"), Some(Value::Bool(false)));

        let mut dependent_required = Vec::new();
        for key in ["dependentRequired", "dependencies"] {
            if let Some(Value::Object(deps)) = map.get(key) {
                for (field, reqs) in deps {
                    if let Value::Array(names) = reqs {
                        dependent_required.push(DependentRule {
                            if_present: field.clone(),
                            requires: names
                                .iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect(),
                        });
                    }
                }
            }
        }

        Ok(Schema::Object(ObjectSchema {
            properties,
            required,
            additional_allowed,
            constraints: ObjectConstraints {
                min_props: usize_field(map, "minProperties"),
                max_props: usize_field(map, "maxProperties"),
                dependent_required,
                key_hint: None,
                value_hint: None,
            },
            named_type: None,
        }))
    }
}

// ==================== Helpers ====================

fn str_or(v: &Value, key: &str, default: &str) -> String {
    v.get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn usize_field(map: &Map<String, Value>, key: &str) -> Option<usize> {
    map.get(key).and_then(Value::as_u64).map(|n| n as usize)
}

fn f64_field(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(Value::as_f64)
}

/// Synthesize an operation id from method and path: every non-alphanumeric
/// character becomes an underscore.
fn synthesize_operation_id(method: HttpMethod, path: &str) -> String {
    let mut id = method.as_str().to_ascii_lowercase();
    id.push('_');
    for c in path.chars() {
        if c.is_ascii_alphanumeric() {
            id.push(c);
        } else {
            id.push('_');
        }
    }
    id
}

fn string_constraints(map: &Map<String, Value>, nullable: bool) -> StringConstraints {
    StringConstraints {
        min_len: usize_field(map, "minLength"),
        max_len: usize_field(map, "maxLength"),
        pattern: map
            .get("pattern")
            .and_then(Value::as_str)
            .map(str::to_string),
        format: map
            .get("format")
            .and_then(Value::as_str)
            .map(StringFormat::from_keyword),
        nullable,
    }
}

fn number_constraints(map: &Map<String, Value>, nullable: bool) -> NumberConstraints {
    let min = f64_field(map, "minimum");
    let max = f64_field(map, "maximum");

    // Older dialects express exclusivity as a boolean next to the bound;
    // normalize both forms onto the numeric exclusive fields.
    let exclusive_min = match map.get("exclusiveMinimum") {
        Some(Value::Bool(true)) => min,
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    };
    let exclusive_max = match map.get("exclusiveMaximum") {
        Some(Value::Bool(true)) => max,
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    };

    NumberConstraints {
        min,
        max,
        exclusive_min,
        exclusive_max,
        multiple_of: f64_field(map, "multipleOf"),
        nullable,
    }
}

fn convert_enum(values: &[Value], map: &Map<String, Value>) -> EnumSchema {
    let base_type = match map.get("type").and_then(Value::as_str) {
        Some("string") => EnumBase::Str,
        Some("integer") => EnumBase::Int,
        Some("number") => EnumBase::Number,
        Some("boolean") => EnumBase::Bool,
        _ => infer_enum_base(values),
    };
    EnumSchema {
        values: values.to_vec(),
        base_type,
        named_type: None,
    }
}

fn infer_enum_base(values: &[Value]) -> EnumBase {
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

/// Right-biased object merge with constraint tightening.
fn merge_objects(mut left: ObjectSchema, right: ObjectSchema) -> ObjectSchema {
    for (name, schema) in right.properties {
        match left.properties.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = schema,
            None => left.properties.push((name, schema)),
        }
    }
    for r in right.required {
        if !left.required.iter().any(|x| *x == r) {
            left.required.push(r);
        }
    }
    left.additional_allowed = left.additional_allowed && right.additional_allowed;
    left.constraints.min_props =
        tighten_min_usize(left.constraints.min_props, right.constraints.min_props);
    left.constraints.max_props =
        tighten_max_usize(left.constraints.max_props, right.constraints.max_props);
    left.constraints
        .dependent_required
        .extend(right.constraints.dependent_required);
    if right.named_type.is_some() {
        left.named_type = right.named_type;
    }
    left
}

fn tighten_min_usize(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, y) => x.or(y),
    }
}

fn tighten_max_usize(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, y) => x.or(y),
    }
}
