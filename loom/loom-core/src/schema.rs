//! The schema model.
//!
//! A `Schema` describes the shape of one value: a parameter, a request body,
//! a response payload or a declared type. Every variant carries its own
//! constraint record; constraints that do not apply to a variant are simply
//! absent from it, so consumers never need to filter them out.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle into the `TypeDecl` arena of a `Specification`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub usize);

impl TypeId {
    /// Create a new TypeId from a raw index.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw index.
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Well-known string formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    Email,
    Uuid,
    Date,
    DateTime,
    Ipv4,
    Ipv6,
    Uri,
    Other(String),
}

impl StringFormat {
    /// Parse a format keyword. Unknown keywords are preserved as `Other`.
    pub fn from_keyword(s: &str) -> Self {
        match s {
            "email" => StringFormat::Email,
            "uuid" => StringFormat::Uuid,
            "date" => StringFormat::Date,
            "date-time" => StringFormat::DateTime,
            "ipv4" => StringFormat::Ipv4,
            "ipv6" => StringFormat::Ipv6,
            "uri" => StringFormat::Uri,
            other => StringFormat::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StringFormat::Email => "email",
            StringFormat::Uuid => "uuid",
            StringFormat::Date => "date",
            StringFormat::DateTime => "date-time",
            StringFormat::Ipv4 => "ipv4",
            StringFormat::Ipv6 => "ipv6",
            StringFormat::Uri => "uri",
            StringFormat::Other(s) => s,
        }
    }

    /// Formats strict enough that injection strings cannot pass them.
    pub fn is_strict(&self) -> bool {
        matches!(
            self,
            StringFormat::Uuid
                | StringFormat::Date
                | StringFormat::DateTime
                | StringFormat::Ipv4
                | StringFormat::Ipv6
        )
    }
}

/// Constraints applicable to string schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StringConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<StringFormat>,
    #[serde(default)]
    pub nullable: bool,
}

impl StringConstraints {
    /// A string with neither format nor pattern accepts arbitrary text.
    pub fn is_free_text(&self) -> bool {
        self.format.is_none() && self.pattern.is_none()
    }
}

/// Constraints applicable to integer and number schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    #[serde(default)]
    pub nullable: bool,
}

impl NumberConstraints {
    /// Effective lower bound, exclusive or not.
    pub fn lower_bound(&self) -> Option<f64> {
        self.exclusive_min.or(self.min)
    }

    /// Effective upper bound, exclusive or not.
    pub fn upper_bound(&self) -> Option<f64> {
        self.exclusive_max.or(self.max)
    }
}

/// Constraints applicable to array schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default)]
    pub unique_items: bool,
}

/// A dependent-required rule: when `if_present` appears in an object,
/// every field in `requires` must appear too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependentRule {
    pub if_present: String,
    pub requires: Vec<String>,
}

/// Constraints applicable to object schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_props: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_props: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependent_required: Vec<DependentRule>,
    /// Key/value type hints for open map-like objects (`Dict[K, V]`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_hint: Option<String>,
}

/// The base type of an enum's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumBase {
    Str,
    Int,
    Number,
    Bool,
    Mixed,
}

/// An enumeration schema. `named_type` preserves the declaration name for
/// enums that came from a named declaration, so renderers can emit imports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumSchema {
    pub values: Vec<serde_json::Value>,
    pub base_type: EnumBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_type: Option<String>,
}

/// An object schema with ordered properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    /// Properties in declaration order. Order is significant: it drives the
    /// deterministic ordering of every downstream artifact.
    pub properties: Vec<(String, Schema)>,
    /// Names of required properties. Always a subset of `properties` keys.
    #[serde(default)]
    pub required: Vec<String>,
    /// Whether properties outside `properties` are accepted.
    #[serde(default = "default_true")]
    pub additional_allowed: bool,
    #[serde(default)]
    pub constraints: ObjectConstraints,
    /// Declaration name for object-model types, kept for import rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_type: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ObjectSchema {
    /// An open object with no properties.
    pub fn empty() -> Self {
        Self {
            properties: Vec::new(),
            required: Vec::new(),
            additional_allowed: true,
            constraints: ObjectConstraints::default(),
            named_type: None,
        }
    }

    /// Look up a property schema by name.
    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    /// Whether a property is in the required set.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// A schema value. The sum of every shape the three dialects can express.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schema {
    String(StringConstraints),
    Integer(NumberConstraints),
    Number(NumberConstraints),
    Boolean,
    Null,
    Array {
        items: Box<Schema>,
        #[serde(default)]
        constraints: ArrayConstraints,
    },
    Object(ObjectSchema),
    Enum(EnumSchema),
    Union { variants: Vec<Schema> },
    Ref { to: TypeId },
    Any,
}

impl Schema {
    /// A plain unconstrained string.
    pub fn string() -> Self {
        Schema::String(StringConstraints::default())
    }

    /// A plain unconstrained integer.
    pub fn integer() -> Self {
        Schema::Integer(NumberConstraints::default())
    }

    /// A plain unconstrained number.
    pub fn number() -> Self {
        Schema::Number(NumberConstraints::default())
    }

    /// An array of `items` with no constraints.
    pub fn array(items: Schema) -> Self {
        Schema::Array {
            items: Box::new(items),
            constraints: ArrayConstraints::default(),
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Schema::Object(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Schema::String(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Schema::Integer(_) | Schema::Number(_))
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            Schema::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumSchema> {
        match self {
            Schema::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Whether `null` is an acceptable value for this schema.
    pub fn nullable(&self) -> bool {
        match self {
            Schema::String(c) => c.nullable,
            Schema::Integer(c) | Schema::Number(c) => c.nullable,
            Schema::Null | Schema::Any => true,
            Schema::Union { variants } => variants.iter().any(|v| v.nullable()),
            _ => false,
        }
    }

    /// Returns the name of this schema's variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Schema::String(_) => "string",
            Schema::Integer(_) => "integer",
            Schema::Number(_) => "number",
            Schema::Boolean => "boolean",
            Schema::Null => "null",
            Schema::Array { .. } => "array",
            Schema::Object(_) => "object",
            Schema::Enum(_) => "enum",
            Schema::Union { .. } => "union",
            Schema::Ref { .. } => "ref",
            Schema::Any => "any",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_type_checks() {
        assert!(Schema::string().is_string());
        assert!(Schema::integer().is_numeric());
        assert!(Schema::number().is_numeric());
        assert!(Schema::Object(ObjectSchema::empty()).is_object());
        assert!(!Schema::Boolean.is_numeric());
    }

    #[test]
    fn test_nullable_propagates_through_unions() {
        let u = Schema::Union {
            variants: vec![Schema::string(), Schema::Null],
        };
        assert!(u.nullable());

        let u = Schema::Union {
            variants: vec![Schema::string(), Schema::integer()],
        };
        assert!(!u.nullable());
    }

    #[test]
    fn test_free_text_detection() {
        assert!(StringConstraints::default().is_free_text());

        let with_format = StringConstraints {
            format: Some(StringFormat::Email),
            ..Default::default()
        };
        assert!(!with_format.is_free_text());

        let with_pattern = StringConstraints {
            pattern: Some("^[a-z]+$".to_string()),
            ..Default::default()
        };
        assert!(!with_pattern.is_free_text());
    }

    #[test]
    fn test_object_property_lookup() {
        let obj = ObjectSchema {
            properties: vec![
                ("name".to_string(), Schema::string()),
                ("age".to_string(), Schema::integer()),
            ],
            required: vec!["name".to_string()],
            additional_allowed: false,
            constraints: ObjectConstraints::default(),
            named_type: None,
        };
        assert!(obj.property("name").is_some());
        assert!(obj.property("missing").is_none());
        assert!(obj.is_required("name"));
        assert!(!obj.is_required("age"));
    }

    #[test]
    fn test_schema_serde_round_trip() {
        let schema = Schema::Object(ObjectSchema {
            properties: vec![
                (
                    "email".to_string(),
                    Schema::String(StringConstraints {
                        max_len: Some(255),
                        format: Some(StringFormat::Email),
                        ..Default::default()
                    }),
                ),
                (
                    "age".to_string(),
                    Schema::Integer(NumberConstraints {
                        min: Some(0.0),
                        max: Some(150.0),
                        ..Default::default()
                    }),
                ),
            ],
            required: vec!["email".to_string(), "age".to_string()],
            additional_allowed: false,
            constraints: ObjectConstraints::default(),
            named_type: None,
        });

        let json = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, back);
    }

    #[test]
    fn test_format_keywords() {
        assert_eq!(StringFormat::from_keyword("uuid"), StringFormat::Uuid);
        assert_eq!(
            StringFormat::from_keyword("date-time"),
            StringFormat::DateTime
        );
        assert_eq!(
            StringFormat::from_keyword("hostname"),
            StringFormat::Other("hostname".to_string())
        );
        assert!(StringFormat::Uuid.is_strict());
        assert!(!StringFormat::Email.is_strict());
    }
}
