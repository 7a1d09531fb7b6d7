//! Payload assembly.
//!
//! One payload per intent: a clean copy of the operation's golden record
//! with exactly one mutation applied at the intent's target.

use crate::{apply_body_mutation, apply_header_mutation, apply_path_param_mutation,
    apply_query_param_mutation, build_golden, schema_at};
use loom_intent::{Intent, IntentKind, TargetPath};
use loom_core::{Operation, Schema, StringFormat};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A syntactically valid id used for path parameters in positive cases
/// when no created resource is bound to them.
pub const VALID_UUID: &str = "123e4567-e89b-42d3-a456-426614174000";

/// One concrete test case: the mutated inputs plus the expected status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub operation_id: String,
    pub intent: IntentKind,
    pub target: TargetPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub body: Value,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub path_params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub query_params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub headers: Map<String, Value>,
    pub expected_status: u16,
}

/// Generate payloads for an operation, one per intent, in intent order.
pub fn generate_payloads(op: &Operation, intents: &[Intent]) -> Vec<Payload> {
    let body_schema = op.body_schema();
    let golden_body = body_schema
        .map(|s| build_golden(s, "body"))
        .unwrap_or_else(|| json!({}));
    let base_path_params = base_path_params(op);
    let base_query_params = base_query_params(op);
    let base_headers = base_headers(op);

    let mut payloads = Vec::with_capacity(intents.len());
    for intent in intents {
        let mut body = golden_body.clone();
        let mut path_params = base_path_params.clone();
        let mut query_params = base_query_params.clone();
        let mut headers = base_headers.clone();

        match &intent.target {
            TargetPath::Body(segments) => {
                let field_schema = body_schema.and_then(|s| schema_at(s, segments));
                apply_body_mutation(&mut body, intent, field_schema);
            }
            TargetPath::PathParam(name) => {
                let schema = op
                    .path_params
                    .iter()
                    .find(|p| &p.name == name)
                    .map(|p| &p.schema);
                apply_path_param_mutation(&mut path_params, intent, schema);
            }
            TargetPath::QueryParam(name) => {
                // Type violations need the parameter present even when the
                // happy path omits it as optional.
                if intent.intent == IntentKind::TypeViolation && !query_params.contains_key(name) {
                    if let Some(p) = op.query_params.iter().find(|p| &p.name == name) {
                        query_params.insert(name.clone(), build_golden(&p.schema, name));
                    }
                }
                apply_query_param_mutation(&mut query_params, intent);
            }
            TargetPath::Header(_) => {
                apply_header_mutation(&mut headers, intent);
            }
        }

        payloads.push(Payload {
            operation_id: intent.operation_id.clone(),
            intent: intent.intent,
            target: intent.target.clone(),
            field: intent.field.clone(),
            body,
            path_params,
            query_params,
            headers,
            expected_status: intent.expected_status,
        });
    }

    payloads
}

/// Valid values for every path parameter.
fn base_path_params(op: &Operation) -> Map<String, Value> {
    let mut map = Map::new();
    for param in &op.path_params {
        map.insert(param.name.clone(), valid_path_value(&param.schema));
    }
    map
}

fn valid_path_value(schema: &Schema) -> Value {
    match schema {
        Schema::String(c) if c.format == Some(StringFormat::Uuid) => json!(VALID_UUID),
        Schema::Integer(_) => json!(1),
        Schema::Enum(e) => e.values.first().cloned().unwrap_or(json!("test_val")),
        _ => json!("test_val"),
    }
}

/// Valid values for required query parameters only.
fn base_query_params(op: &Operation) -> Map<String, Value> {
    let mut map = Map::new();
    for param in &op.query_params {
        if param.required {
            map.insert(param.name.clone(), build_golden(&param.schema, &param.name));
        }
    }
    map
}

/// Valid values for every declared header.
fn base_headers(op: &Operation) -> Map<String, Value> {
    let mut map = Map::new();
    for header in &op.headers {
        map.insert(header.name.clone(), build_golden(&header.schema, &header.name));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_intent::{generate_intents, IntentSelection};
    use loom_core::{
        HttpMethod, NumberConstraints, ObjectConstraints, ObjectSchema, OperationKind, Parameter,
        Response, SourceDialect, StringConstraints,
    };

    fn user_post_operation() -> Operation {
        Operation {
            id: "create_user".into(),
            kind: OperationKind::Http {
                method: HttpMethod::Post,
                path: "/users".into(),
            },
            path_params: vec![],
            query_params: vec![],
            headers: vec![],
            body: Some(Parameter::new(
                "body",
                true,
                Schema::Object(ObjectSchema {
                    properties: vec![
                        (
                            "email".into(),
                            Schema::String(StringConstraints {
                                max_len: Some(255),
                                format: Some(loom_core::StringFormat::Email),
                                ..Default::default()
                            }),
                        ),
                        (
                            "age".into(),
                            Schema::Integer(NumberConstraints {
                                min: Some(0.0),
                                max: Some(150.0),
                                ..Default::default()
                            }),
                        ),
                    ],
                    required: vec!["email".into(), "age".into()],
                    additional_allowed: true,
                    constraints: ObjectConstraints::default(),
                    named_type: None,
                }),
            )),
            successes: vec![Response::new(201, None)],
            errors: vec![Response::new(422, None)],
            description: String::new(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn test_payloads_follow_intent_order() {
        let op = user_post_operation();
        let intents = generate_intents(&op, SourceDialect::HttpContract, &IntentSelection::all());
        let payloads = generate_payloads(&op, &intents);

        assert_eq!(payloads.len(), intents.len());
        for (payload, intent) in payloads.iter().zip(&intents) {
            assert_eq!(payload.intent, intent.intent);
            assert_eq!(payload.target, intent.target);
            assert_eq!(payload.expected_status, intent.expected_status);
        }
    }

    #[test]
    fn test_happy_path_is_the_golden_record() {
        let op = user_post_operation();
        let intents = generate_intents(&op, SourceDialect::HttpContract, &IntentSelection::all());
        let payloads = generate_payloads(&op, &intents);

        assert_eq!(payloads[0].intent, IntentKind::HappyPath);
        assert_eq!(
            payloads[0].body,
            json!({"email": "__PLACEHOLDER_STRING_email__", "age": 0})
        );
        assert_eq!(payloads[0].expected_status, 201);
    }

    #[test]
    fn test_boundary_payload_from_the_scenario() {
        let op = user_post_operation();
        let intents = generate_intents(&op, SourceDialect::HttpContract, &IntentSelection::all());
        let payloads = generate_payloads(&op, &intents);

        let boundary = payloads
            .iter()
            .find(|p| p.intent == IntentKind::BoundaryMaxPlusOne)
            .unwrap();
        assert_eq!(
            boundary.body,
            json!({"email": "__PLACEHOLDER_STRING_email__", "age": 151})
        );
    }

    /// Every negative payload differs from the golden record only at or
    /// beneath its target path.
    #[test]
    fn test_mutation_minimality() {
        let op = user_post_operation();
        let intents = generate_intents(&op, SourceDialect::HttpContract, &IntentSelection::all());
        let payloads = generate_payloads(&op, &intents);
        let golden = &payloads[0].body;

        for payload in &payloads[1..] {
            let TargetPath::Body(segments) = &payload.target else {
                continue;
            };
            let changed_field = segments.first().map(|s| s.trim_end_matches("[]"));
            for (key, value) in golden.as_object().unwrap() {
                if Some(key.as_str()) != changed_field {
                    assert_eq!(
                        payload.body.get(key),
                        Some(value),
                        "{} mutated field {} outside its target",
                        payload.intent,
                        key
                    );
                }
            }
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let op = user_post_operation();
        let intents = generate_intents(&op, SourceDialect::HttpContract, &IntentSelection::all());
        let a = serde_json::to_string(&generate_payloads(&op, &intents)).unwrap();
        let b = serde_json::to_string(&generate_payloads(&op, &intents)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_path_params_filled_valid_except_target() {
        let op = Operation {
            id: "get_order_item".into(),
            kind: OperationKind::Http {
                method: HttpMethod::Get,
                path: "/orders/{order_id}/items/{item_id}".into(),
            },
            path_params: vec![
                Parameter::new(
                    "order_id",
                    true,
                    Schema::String(StringConstraints {
                        format: Some(loom_core::StringFormat::Uuid),
                        ..Default::default()
                    }),
                ),
                Parameter::new("item_id", true, Schema::integer()),
            ],
            query_params: vec![],
            headers: vec![],
            body: None,
            successes: vec![Response::new(200, None)],
            errors: vec![Response::new(404, None)],
            description: String::new(),
            metadata: Default::default(),
        };

        let intents = generate_intents(&op, SourceDialect::HttpContract, &IntentSelection::all());
        let payloads = generate_payloads(&op, &intents);

        let rnf = payloads
            .iter()
            .find(|p| {
                p.intent == IntentKind::ResourceNotFound
                    && p.target == TargetPath::PathParam("order_id".into())
            })
            .unwrap();
        assert_eq!(rnf.path_params["order_id"], json!(crate::ABSENT_UUID));
        // The untargeted parameter keeps its valid value.
        assert_eq!(rnf.path_params["item_id"], json!(1));
        assert_eq!(rnf.expected_status, 404);
    }
}
