//! The intermediate representation.
//!
//! A `Specification` is the dialect-neutral result of parsing any of the
//! three accepted inputs. It is immutable after parsing; every later
//! pipeline stage reads it and produces new values.

use crate::{EnumBase, InvariantError, Schema, TypeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fmt;

/// HTTP methods accepted by the contract dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "patch" => Some(HttpMethod::Patch),
            "delete" => Some(HttpMethod::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Only POST, PUT and PATCH requests attach a body.
    pub fn takes_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of callable an operation is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationKind {
    /// An HTTP endpoint. `path` is a URI template with `{name}` placeholders.
    Http { method: HttpMethod, path: String },
    /// A plain function.
    Function {
        is_async: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        module_hint: Option<String>,
    },
}

impl OperationKind {
    pub fn as_http(&self) -> Option<(HttpMethod, &str)> {
        match self {
            OperationKind::Http { method, path } => Some((*method, path.as_str())),
            _ => None,
        }
    }

    pub fn is_http(&self) -> bool {
        matches!(self, OperationKind::Http { .. })
    }
}

/// Where a parameter lives on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Body,
}

impl ParamLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "headers",
            ParamLocation::Body => "body",
        }
    }
}

/// A named input with a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub required: bool,
    pub schema: Schema,
}

impl Parameter {
    pub fn new(name: impl Into<String>, required: bool, schema: Schema) -> Self {
        Self {
            name: name.into(),
            required,
            schema,
        }
    }
}

/// A declared response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(default)]
    pub description: String,
    /// Absent when the source declared no schema; consumers treat that as
    /// `Schema::Any`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

impl Response {
    pub fn new(status: u16, schema: Option<Schema>) -> Self {
        Self {
            status,
            description: String::new(),
            schema,
        }
    }

    /// The declared schema, with `Any` standing in for an absent one.
    pub fn effective_schema(&self) -> Schema {
        self.schema.clone().unwrap_or(Schema::Any)
    }
}

/// A single callable entity: an HTTP endpoint or a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Stable id, unique within the specification.
    pub id: String,
    #[serde(flatten)]
    pub kind: OperationKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_params: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_params: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Parameter>,
    /// Single parameter wrapping an object schema, or absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub successes: Vec<Response>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Response>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Operation {
    /// The body's object schema, when a body is declared.
    pub fn body_schema(&self) -> Option<&Schema> {
        self.body.as_ref().map(|p| &p.schema)
    }

    /// First declared success status, defaulting to 200.
    pub fn first_success_status(&self) -> u16 {
        self.successes.first().map(|r| r.status).unwrap_or(200)
    }

    /// First declared error status inside the given inclusive range.
    pub fn first_error_in(&self, lo: u16, hi: u16) -> Option<u16> {
        self.errors
            .iter()
            .map(|r| r.status)
            .find(|s| (lo..=hi).contains(s))
    }
}

/// What a named type declaration is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decl", rename_all = "snake_case")]
pub enum TypeDeclKind {
    /// An enumeration with named members.
    Enum {
        values: Vec<serde_json::Value>,
        base_type: EnumBase,
    },
    /// An object model (dataclass, interface, component schema).
    Model { schema: Schema },
    /// An alias for another schema.
    Alias { schema: Schema },
}

/// A named schema other schemas may reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    #[serde(flatten)]
    pub kind: TypeDeclKind,
    #[serde(default)]
    pub description: String,
}

/// The top-level IR value.
///
/// Order of `operations` and `types` is preserved from the source and is
/// significant: it drives deterministic output ordering in every artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub title: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeDecl>,
}

impl Specification {
    /// Look up a type declaration by handle.
    pub fn type_decl(&self, id: TypeId) -> Option<&TypeDecl> {
        self.types.get(id.raw())
    }

    /// Look up an operation by id.
    pub fn operation(&self, id: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.id == id)
    }

    /// Check the structural invariants every parser must guarantee.
    ///
    /// A failure here after a parser returned Ok is a bug in that parser,
    /// surfaced as a distinct error so the pipeline can report it as such.
    pub fn validate(&self) -> Result<(), InvariantError> {
        // Invariant: operation ids are unique.
        let mut seen = HashSet::new();
        for op in &self.operations {
            if !seen.insert(op.id.as_str()) {
                return Err(InvariantError::DuplicateOperationId(op.id.clone()));
            }
        }

        for op in &self.operations {
            // Invariant: parameter lists are deduplicated by (location, name).
            for (loc, params) in [
                (ParamLocation::Path, &op.path_params),
                (ParamLocation::Query, &op.query_params),
                (ParamLocation::Header, &op.headers),
            ] {
                let mut names = HashSet::new();
                for p in params {
                    if !names.insert(p.name.as_str()) {
                        return Err(InvariantError::DuplicateParameter {
                            operation: op.id.clone(),
                            location: loc.as_str(),
                            name: p.name.clone(),
                        });
                    }
                }
            }

            for p in op
                .path_params
                .iter()
                .chain(&op.query_params)
                .chain(&op.headers)
                .chain(op.body.as_ref())
            {
                self.validate_schema(&op.id, &p.schema)?;
            }
            for r in op.successes.iter().chain(&op.errors) {
                if let Some(schema) = &r.schema {
                    self.validate_schema(&op.id, schema)?;
                }
            }
        }

        Ok(())
    }

    fn validate_schema(&self, op_id: &str, schema: &Schema) -> Result<(), InvariantError> {
        match schema {
            Schema::Ref { to } => {
                // Invariant: every Ref resolves to a declared TypeDecl.
                if self.type_decl(*to).is_none() {
                    return Err(InvariantError::UnresolvedRef {
                        operation: op_id.to_string(),
                        id: *to,
                    });
                }
            }
            Schema::Object(obj) => {
                // Invariant: required is a subset of property keys.
                for req in &obj.required {
                    if obj.property(req).is_none() {
                        return Err(InvariantError::RequiredNotDeclared {
                            operation: op_id.to_string(),
                            field: req.clone(),
                        });
                    }
                }
                for (_, prop) in &obj.properties {
                    self.validate_schema(op_id, prop)?;
                }
            }
            Schema::Enum(e) => {
                // Invariant: every value is acceptable under the base type.
                for v in &e.values {
                    let ok = match e.base_type {
                        EnumBase::Str => v.is_string(),
                        EnumBase::Int => v.is_i64() || v.is_u64(),
                        EnumBase::Number => v.is_number(),
                        EnumBase::Bool => v.is_boolean(),
                        EnumBase::Mixed => true,
                    };
                    if !ok {
                        return Err(InvariantError::EnumValueMismatch {
                            operation: op_id.to_string(),
                            value: v.to_string(),
                        });
                    }
                }
            }
            Schema::Array { items, .. } => self.validate_schema(op_id, items)?,
            Schema::Union { variants } => {
                for v in variants {
                    self.validate_schema(op_id, v)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EnumSchema, ObjectConstraints, ObjectSchema};

    fn minimal_spec(operations: Vec<Operation>) -> Specification {
        Specification {
            title: "API".to_string(),
            version: "1.0.0".to_string(),
            description: String::new(),
            operations,
            types: Vec::new(),
        }
    }

    fn http_op(id: &str) -> Operation {
        Operation {
            id: id.to_string(),
            kind: OperationKind::Http {
                method: HttpMethod::Get,
                path: "/things".to_string(),
            },
            path_params: Vec::new(),
            query_params: Vec::new(),
            headers: Vec::new(),
            body: None,
            successes: vec![Response::new(200, None)],
            errors: Vec::new(),
            description: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_duplicate_operation_ids_rejected() {
        let spec = minimal_spec(vec![http_op("a"), http_op("a")]);
        assert!(matches!(
            spec.validate(),
            Err(InvariantError::DuplicateOperationId(_))
        ));
    }

    #[test]
    fn test_duplicate_parameters_rejected() {
        let mut op = http_op("a");
        op.query_params = vec![
            Parameter::new("q", false, Schema::string()),
            Parameter::new("q", true, Schema::integer()),
        ];
        let spec = minimal_spec(vec![op]);
        assert!(matches!(
            spec.validate(),
            Err(InvariantError::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn test_required_must_be_declared() {
        let mut op = http_op("a");
        op.body = Some(Parameter::new(
            "body",
            true,
            Schema::Object(ObjectSchema {
                properties: vec![("name".to_string(), Schema::string())],
                required: vec!["ghost".to_string()],
                additional_allowed: true,
                constraints: ObjectConstraints::default(),
                named_type: None,
            }),
        ));
        let spec = minimal_spec(vec![op]);
        assert!(matches!(
            spec.validate(),
            Err(InvariantError::RequiredNotDeclared { .. })
        ));
    }

    #[test]
    fn test_enum_values_checked_against_base_type() {
        let mut op = http_op("a");
        op.query_params = vec![Parameter::new(
            "status",
            false,
            Schema::Enum(EnumSchema {
                values: vec![serde_json::json!("active"), serde_json::json!(3)],
                base_type: EnumBase::Str,
                named_type: None,
            }),
        )];
        let spec = minimal_spec(vec![op]);
        assert!(matches!(
            spec.validate(),
            Err(InvariantError::EnumValueMismatch { .. })
        ));
    }

    #[test]
    fn test_unresolved_ref_rejected() {
        let mut op = http_op("a");
        op.query_params = vec![Parameter::new("x", false, Schema::Ref { to: TypeId(7) })];
        let spec = minimal_spec(vec![op]);
        assert!(matches!(
            spec.validate(),
            Err(InvariantError::UnresolvedRef { .. })
        ));
    }

    #[test]
    fn test_valid_spec_passes() {
        let spec = minimal_spec(vec![http_op("a"), http_op("b")]);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_method_body_rule() {
        assert!(HttpMethod::Post.takes_body());
        assert!(HttpMethod::Put.takes_body());
        assert!(HttpMethod::Patch.takes_body());
        assert!(!HttpMethod::Get.takes_body());
        assert!(!HttpMethod::Delete.takes_body());
    }

    #[test]
    fn test_spec_serde_round_trip() {
        let spec = minimal_spec(vec![http_op("get_things")]);
        let json = serde_json::to_string_pretty(&spec).unwrap();
        let back: Specification = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }
}
