//! Intent and target-path types.

use crate::{IntentCategory, IntentKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where an intent's mutation applies.
///
/// Body paths address nested fields with dot segments; a segment ending in
/// `[]` descends into the first element of an array along the way.
/// Serialized as the dotted form (`body.address.street`, `path.user_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetPath {
    /// The body root or a field beneath it.
    Body(Vec<String>),
    PathParam(String),
    QueryParam(String),
    Header(String),
}

impl TargetPath {
    pub fn body_root() -> Self {
        TargetPath::Body(Vec::new())
    }

    pub fn body_field(segments: &[&str]) -> Self {
        TargetPath::Body(segments.iter().map(|s| s.to_string()).collect())
    }

    /// The final field name this path addresses, if any.
    pub fn leaf(&self) -> Option<&str> {
        match self {
            TargetPath::Body(segments) => segments
                .last()
                .map(|s| s.trim_end_matches("[]")),
            TargetPath::PathParam(name)
            | TargetPath::QueryParam(name)
            | TargetPath::Header(name) => Some(name),
        }
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetPath::Body(segments) => {
                f.write_str("body")?;
                for s in segments {
                    write!(f, ".{}", s)?;
                }
                Ok(())
            }
            TargetPath::PathParam(name) => write!(f, "path.{}", name),
            TargetPath::QueryParam(name) => write!(f, "query.{}", name),
            TargetPath::Header(name) => write!(f, "headers.{}", name),
        }
    }
}

impl FromStr for TargetPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let root = parts.next().unwrap_or("");
        let rest: Vec<String> = parts.map(str::to_string).collect();
        match root {
            "body" => Ok(TargetPath::Body(rest)),
            "path" if rest.len() == 1 => Ok(TargetPath::PathParam(rest[0].clone())),
            "query" if rest.len() == 1 => Ok(TargetPath::QueryParam(rest[0].clone())),
            "headers" if rest.len() == 1 => Ok(TargetPath::Header(rest[0].clone())),
            _ => Err(format!("invalid target path: {}", s)),
        }
    }
}

impl Serialize for TargetPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TargetPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One test scenario targeting one property or structural aspect of an
/// operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub operation_id: String,
    pub intent: IntentKind,
    pub category: IntentCategory,
    pub target: TargetPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Expected status: the declared HTTP status for the HTTP dialect, the
    /// synthetic 200/400/422 convention for function dialects.
    pub expected_status: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_path_display() {
        assert_eq!(TargetPath::body_root().to_string(), "body");
        assert_eq!(
            TargetPath::body_field(&["address", "street"]).to_string(),
            "body.address.street"
        );
        assert_eq!(
            TargetPath::PathParam("user_id".into()).to_string(),
            "path.user_id"
        );
        assert_eq!(TargetPath::Header("X-Key".into()).to_string(), "headers.X-Key");
    }

    #[test]
    fn test_target_path_round_trip() {
        for s in ["body", "body.a.b", "body.items[].name", "path.id", "query.limit", "headers.X"] {
            let parsed: TargetPath = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
        assert!("bogus.x".parse::<TargetPath>().is_err());
    }

    #[test]
    fn test_leaf_strips_array_marker() {
        let p = TargetPath::body_field(&["items[]", "name"]);
        assert_eq!(p.leaf(), Some("name"));
        let p = TargetPath::body_field(&["items[]"]);
        assert_eq!(p.leaf(), Some("items"));
        assert_eq!(TargetPath::body_root().leaf(), None);
    }

    #[test]
    fn test_intent_serialization_shape() {
        let intent = Intent {
            operation_id: "create_user".into(),
            intent: IntentKind::RequiredFieldMissing,
            category: IntentKind::RequiredFieldMissing.category(),
            target: TargetPath::body_field(&["email"]),
            field: Some("email".into()),
            expected_status: 422,
            description: String::new(),
        };
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["intent"], "REQUIRED_FIELD_MISSING");
        assert_eq!(json["target"], "body.email");
        assert_eq!(json["expected_status"], 422);
    }
}
