//! Testloom Renderers
//!
//! Pure functions from (operation, payloads, fixture program) to generated
//! test source text. Three target frameworks are supported: a sync-style
//! HTTP suite, an async-style HTTP suite, and direct function-call unit
//! tests. Rendering an operation can fail without affecting any other
//! operation.

mod common;
mod function_direct;
mod http_async;
mod http_sync;

pub use common::{banner, py_literal, sanitize_ident, ts_literal, BANNER_TEXT};

use loom_fixture::{FixtureInstruction, FixtureProgram};
use loom_payload::Payload;
use loom_core::{Operation, TargetFramework};
use std::collections::HashSet;
use thiserror::Error;

/// Errors scoped to rendering one operation's file.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("Render error for {operation_id}: unsupported schema shape: {detail}")]
    UnsupportedSchema { operation_id: String, detail: String },

    #[error("Render error for {operation_id}: unresolved sentinel leaked into output: {sentinel}")]
    SentinelLeak {
        operation_id: String,
        sentinel: String,
    },
}

/// Render one operation's test file.
pub fn render(
    op: &Operation,
    payloads: &[Payload],
    program: Option<&FixtureProgram>,
    framework: TargetFramework,
    base_url: &str,
) -> Result<String, RenderError> {
    match framework {
        TargetFramework::HttpSync => http_sync::render(op, payloads, program, base_url),
        TargetFramework::HttpAsync => http_async::render(op, payloads, program, base_url),
        TargetFramework::FunctionDirect => function_direct::render(op, payloads),
    }
}

/// File name for an operation's generated tests.
pub fn test_file_name(op_id: &str, framework: TargetFramework) -> String {
    format!("{}.{}", sanitize_ident(op_id), framework.file_extension())
}

/// Fail closed: every `USE_CREATED_RESOURCE_*` sentinel appearing in the
/// rendered text must be resolvable through the fixture program's bindings.
pub(crate) fn check_placeholders_resolved(
    op_id: &str,
    text: &str,
    program: Option<&FixtureProgram>,
) -> Result<(), RenderError> {
    const MARKER: &str = "USE_CREATED_RESOURCE_";

    let bound: HashSet<String> = program
        .map(|p| {
            p.instructions
                .iter()
                .filter_map(|i| match i {
                    FixtureInstruction::BindPlaceholder { placeholder, .. } => {
                        Some(placeholder.clone())
                    }
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let mut rest = text;
    while let Some(pos) = rest.find(MARKER) {
        let tail = &rest[pos..];
        let sentinel: String = tail
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if !bound.contains(&sentinel) {
            return Err(RenderError::SentinelLeak {
                operation_id: op_id.to_string(),
                sentinel,
            });
        }
        rest = &rest[pos + MARKER.len()..];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_fixture::{analyze, compile, plan};
    use loom_intent::{generate_intents, IntentSelection};
    use loom_payload::generate_payloads;
    use loom_core::{
        EnumBase, EnumSchema, HttpMethod, NumberConstraints, ObjectSchema, OperationKind,
        Parameter, Response, Schema, SourceDialect, Specification, StringConstraints,
        StringFormat,
    };

    fn http_spec() -> Specification {
        let create_user = Operation {
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
                                format: Some(StringFormat::Email),
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
                    constraints: Default::default(),
                    named_type: None,
                }),
            )),
            successes: vec![Response::new(201, None)],
            errors: vec![Response::new(422, None)],
            description: String::new(),
            metadata: Default::default(),
        };
        let get_user = Operation {
            id: "get_user".into(),
            kind: OperationKind::Http {
                method: HttpMethod::Get,
                path: "/users/{user_id}".into(),
            },
            path_params: vec![Parameter::new(
                "user_id",
                true,
                Schema::String(StringConstraints {
                    format: Some(StringFormat::Uuid),
                    ..Default::default()
                }),
            )],
            query_params: vec![],
            headers: vec![],
            body: None,
            successes: vec![Response::new(200, None)],
            errors: vec![Response::new(404, None)],
            description: String::new(),
            metadata: Default::default(),
        };
        Specification {
            title: "API".into(),
            version: "1".into(),
            description: String::new(),
            operations: vec![create_user, get_user],
            types: vec![],
        }
    }

    fn render_operation(
        spec: &Specification,
        index: usize,
        framework: TargetFramework,
    ) -> (String, Vec<Payload>) {
        let op = &spec.operations[index];
        let intents = generate_intents(op, SourceDialect::HttpContract, &IntentSelection::all());
        let payloads = generate_payloads(op, &intents);

        let all_payloads: Vec<Payload> = spec
            .operations
            .iter()
            .flat_map(|o| {
                let i = generate_intents(o, SourceDialect::HttpContract, &IntentSelection::all());
                generate_payloads(o, &i)
            })
            .collect();
        let analyses = analyze(spec);
        let fixture_plan = plan(&analyses[index], spec, &all_payloads);
        let program = compile(&fixture_plan);
        let program_ref = if program.is_empty() {
            None
        } else {
            Some(&program)
        };

        let text = render(op, &payloads, program_ref, framework, "http://localhost:8000").unwrap();
        (text, payloads)
    }

    #[test]
    fn test_sync_file_opens_with_banner() {
        let spec = http_spec();
        let (text, _) = render_operation(&spec, 0, TargetFramework::HttpSync);
        assert!(text.starts_with(&format!("# {}", BANNER_TEXT)));
        assert!(text.contains("METHOD = \"POST\""));
        // POST attaches a body.
        assert!(text.contains("json=body"));
    }

    /// Every payload appears literally in the rendered file, bound to its
    /// intent id.
    #[test]
    fn test_render_faithfulness() {
        let spec = http_spec();
        let (text, payloads) = render_operation(&spec, 0, TargetFramework::HttpSync);
        for payload in &payloads {
            assert!(
                text.contains(&py_literal(&payload.body)),
                "body for {} missing from rendered file",
                payload.intent
            );
            assert!(text.contains(payload.intent.as_str()));
        }
    }

    #[test]
    fn test_get_does_not_attach_body_and_uses_fixture() {
        let spec = http_spec();
        let (text, _) = render_operation(&spec, 1, TargetFramework::HttpSync);
        assert!(!text.contains("json=body"));
        // Happy path resolves the created user through the bindings.
        assert!(text.contains("USE_CREATED_RESOURCE_user"));
        assert!(text.contains("created_user_id"));
        assert!(text.contains("def created_ids(api_client):"));
        // Teardown exists and is non-fatal.
        assert!(text.contains("except Exception:"));
        // The fixture email is uniquified at execution time.
        assert!(text.contains("_unique"));
    }

    #[test]
    fn test_async_renderer_shape() {
        let spec = http_spec();
        let (text, _) = render_operation(&spec, 1, TargetFramework::HttpAsync);
        assert!(text.starts_with(&format!("// {}", BANNER_TEXT)));
        assert!(text.contains("test.each(CASES)"));
        assert!(text.contains("beforeAll(async () => {"));
        assert!(text.contains("afterAll(async () => {"));
        assert!(text.contains("expect(response.status).toBe(tc.expectedStatus);"));
    }

    #[test]
    fn test_function_renderer_enum_conversion() {
        let op = Operation {
            id: "create_user".into(),
            kind: OperationKind::Function {
                is_async: false,
                module_hint: Some("app.services".into()),
            },
            path_params: vec![],
            query_params: vec![],
            headers: vec![],
            body: Some(Parameter::new(
                "body",
                true,
                Schema::Object(ObjectSchema {
                    properties: vec![
                        ("name".into(), Schema::string()),
                        (
                            "status".into(),
                            Schema::Enum(EnumSchema {
                                values: vec![
                                    serde_json::json!("Active"),
                                    serde_json::json!("Pending"),
                                ],
                                base_type: EnumBase::Str,
                                named_type: Some("Status".into()),
                            }),
                        ),
                    ],
                    required: vec!["name".into()],
                    additional_allowed: false,
                    constraints: Default::default(),
                    named_type: None,
                }),
            )),
            successes: vec![Response::new(200, None)],
            errors: vec![],
            description: String::new(),
            metadata: Default::default(),
        };

        let intents = generate_intents(&op, SourceDialect::DynamicSource, &IntentSelection::all());
        let payloads = generate_payloads(&op, &intents);
        let text = render(
            &op,
            &payloads,
            None,
            TargetFramework::FunctionDirect,
            "",
        )
        .unwrap();

        assert!(text.contains("from app.services import create_user, Status"));
        // Happy path converts enum strings; negatives pass raw values.
        assert!(text.contains("ENUM_ARGS"));
        assert!(text.contains("pytest.raises((TypeError, ValueError))"));
        assert!(text.contains("\"__INVALID_ENUM_VALUE__\""));
    }

    #[test]
    fn test_framework_mismatch_is_a_render_error() {
        let spec = http_spec();
        let op = &spec.operations[0];
        let err = render(op, &[], None, TargetFramework::FunctionDirect, "").unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedSchema { .. }));
    }

    #[test]
    fn test_unbound_sentinel_fails_closed() {
        let err = check_placeholders_resolved(
            "op",
            "path = \"USE_CREATED_RESOURCE_user\"",
            None,
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::SentinelLeak { .. }));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let spec = http_spec();
        let (a, _) = render_operation(&spec, 1, TargetFramework::HttpSync);
        let (b, _) = render_operation(&spec, 1, TargetFramework::HttpSync);
        assert_eq!(a, b);
    }
}
