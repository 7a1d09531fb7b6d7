//! Sync-style HTTP test renderer (pytest + requests).

use crate::common::{banner, py_literal, sanitize_ident};
use crate::RenderError;
use loom_fixture::{FixtureInstruction, FixtureProgram};
use loom_intent::IntentKind;
use loom_payload::Payload;
use loom_core::{Operation, OperationKind};
use serde_json::{json, Value};

pub fn render(
    op: &Operation,
    payloads: &[Payload],
    program: Option<&FixtureProgram>,
    base_url: &str,
) -> Result<String, RenderError> {
    let OperationKind::Http { method, path } = &op.kind else {
        return Err(RenderError::UnsupportedSchema {
            operation_id: op.id.clone(),
            detail: "function operation given to an HTTP renderer".to_string(),
        });
    };

    let fixture = program.filter(|p| !p.is_empty());
    let needs_unique = fixture
        .map(|p| {
            p.instructions.iter().any(|i| {
                matches!(i, FixtureInstruction::CreateResource { unique_fields, .. }
                    if !unique_fields.is_empty())
            })
        })
        .unwrap_or(false);
    let test_name = sanitize_ident(&op.id);

    let mut out = String::new();
    out.push_str(&banner("#"));
    out.push_str("import pytest\nimport requests\n");
    if needs_unique {
        out.push_str("import uuid\n");
    }
    out.push('\n');
    out.push_str(&format!("BASE_URL = \"{}\"\n", base_url.trim_end_matches('/')));
    out.push_str(&format!("ENDPOINT = \"{}\"\n", path));
    out.push_str(&format!("METHOD = \"{}\"\n\n", method.as_str()));
    out.push_str(&format!("# Operation: {}\n", op.id));
    if !op.errors.is_empty() {
        let codes: Vec<String> = op.errors.iter().map(|e| e.status.to_string()).collect();
        out.push_str(&format!("# Declared error statuses: {}\n", codes.join(", ")));
    }
    out.push('\n');

    if let Some(program) = fixture {
        render_bindings(&mut out, program);
    }
    if needs_unique {
        out.push_str(UNIQUE_HELPER);
    }
    out.push_str(API_CLIENT_FIXTURE);
    if let Some(program) = fixture {
        render_setup_fixture(&mut out, program);
        out.push_str(RESOLVE_HELPER);
    }

    render_cases(&mut out, payloads, fixture);
    render_test_fn(&mut out, &test_name, method.takes_body(), fixture.is_some());

    crate::check_placeholders_resolved(&op.id, &out, program)?;
    Ok(out)
}

fn render_bindings(out: &mut String, program: &FixtureProgram) {
    out.push_str("PLACEHOLDER_BINDINGS = {\n");
    for instruction in &program.instructions {
        if let FixtureInstruction::BindPlaceholder {
            placeholder,
            bind_name,
            ..
        } = instruction
        {
            out.push_str(&format!("    \"{}\": \"{}\",\n", placeholder, bind_name));
        }
    }
    out.push_str("}\n\n");
}

const UNIQUE_HELPER: &str = r#"
def _unique(value):
    """Appends a random suffix so repeated runs do not collide."""
    suffix = uuid.uuid4().hex[:8]
    if "@" in value:
        local, _, domain = value.partition("@")
        return f"{local}_{suffix}@{domain}"
    return f"{value}_{suffix}"

"#;

const API_CLIENT_FIXTURE: &str = r#"
@pytest.fixture(scope="module")
def api_client():
    session = requests.Session()
    session.headers.update({"Content-Type": "application/json"})
    yield session
    session.close()

"#;

const RESOLVE_HELPER: &str = r#"
def _resolve_path_params(path_params, created_ids):
    resolved = {}
    for name, value in path_params.items():
        if isinstance(value, str) and value in PLACEHOLDER_BINDINGS:
            resolved[name] = created_ids[PLACEHOLDER_BINDINGS[value]]
        else:
            resolved[name] = value
    return resolved

"#;

fn render_setup_fixture(out: &mut String, program: &FixtureProgram) {
    out.push_str("\n@pytest.fixture(scope=\"module\")\ndef created_ids(api_client):\n");
    out.push_str("    ids = {}\n");

    for instruction in &program.instructions {
        match instruction {
            FixtureInstruction::CreateResource {
                step_id,
                endpoint,
                body,
                unique_fields,
            } => {
                out.push_str(&format!(
                    "    payload_{} = {}\n",
                    step_id,
                    py_literal(body)
                ));
                for field in unique_fields {
                    out.push_str(&format!(
                        "    payload_{}[\"{}\"] = _unique(payload_{}[\"{}\"])\n",
                        step_id, field, step_id, field
                    ));
                }
                out.push_str(&format!(
                    "    response_{} = api_client.post(f\"{{BASE_URL}}{}\", json=payload_{})\n",
                    step_id, endpoint, step_id
                ));
                out.push_str(&format!(
                    "    assert response_{}.status_code < 400, (\n        f\"fixture setup failed: {{response_{}.text}}\"\n    )\n",
                    step_id, step_id
                ));
            }
            FixtureInstruction::CaptureIdFrom {
                step_id,
                bind_name,
                id_field,
            } => {
                out.push_str(&format!(
                    "    ids[\"{}_id\"] = response_{}.json()[\"{}\"]\n",
                    bind_name, step_id, id_field
                ));
            }
            _ => {}
        }
    }

    out.push_str("    yield ids\n");
    out.push_str("    # Teardown deletes in reverse creation order; failures are non-fatal.\n");
    for instruction in &program.instructions {
        if let FixtureInstruction::DeleteResource {
            endpoint_template,
            bind_name,
        } = instruction
        {
            let url = endpoint_template.replace(
                &format!("{{{}}}", bind_name),
                &format!("{{ids['{}_id']}}", bind_name),
            );
            out.push_str("    try:\n");
            out.push_str(&format!(
                "        api_client.delete(f\"{{BASE_URL}}{}\")\n",
                url
            ));
            out.push_str("    except Exception:\n        pass\n");
        }
    }
    out.push('\n');
}

fn render_cases(out: &mut String, payloads: &[Payload], program: Option<&FixtureProgram>) {
    out.push_str("\n@pytest.mark.parametrize(\n");
    out.push_str("    \"intent, body, path_params, query_params, headers, expected_status\",\n");
    out.push_str("    [\n");

    for (i, payload) in payloads.iter().enumerate() {
        let path_params = patched_path_params(payload, program);
        out.push_str("        pytest.param(\n");
        out.push_str(&format!("            \"{}\",\n", payload.intent.as_str()));
        out.push_str(&format!("            {},\n", py_literal(&payload.body)));
        out.push_str(&format!(
            "            {},\n",
            py_literal(&Value::Object(path_params))
        ));
        out.push_str(&format!(
            "            {},\n",
            py_literal(&Value::Object(payload.query_params.clone()))
        ));
        out.push_str(&format!(
            "            {},\n",
            py_literal(&Value::Object(payload.headers.clone()))
        ));
        out.push_str(&format!("            {},\n", payload.expected_status));
        out.push_str(&format!(
            "            id=\"{:02}_{}\",\n",
            i,
            payload.intent.as_str()
        ));
        out.push_str("        ),\n");
    }

    out.push_str("    ],\n)\n");
}

/// Happy-path payloads targeting a created resource carry the
/// `USE_CREATED_RESOURCE_<resource>` sentinel; the test resolves it
/// through the bindings at execution time.
fn patched_path_params(
    payload: &Payload,
    program: Option<&FixtureProgram>,
) -> serde_json::Map<String, Value> {
    let mut params = payload.path_params.clone();
    if payload.intent != IntentKind::HappyPath {
        return params;
    }
    if let Some(program) = program {
        for instruction in &program.instructions {
            if let FixtureInstruction::BindPlaceholder {
                placeholder,
                param_name,
                ..
            } = instruction
            {
                params.insert(param_name.clone(), json!(placeholder));
            }
        }
    }
    params
}

fn render_test_fn(out: &mut String, test_name: &str, takes_body: bool, has_fixture: bool) {
    let fixture_arg = if has_fixture { ", created_ids" } else { "" };
    out.push_str(&format!(
        "def test_{}(api_client{}, intent, body, path_params, query_params, headers, expected_status):\n",
        test_name, fixture_arg
    ));
    out.push_str("    url = BASE_URL + ENDPOINT\n");
    if has_fixture {
        out.push_str(
            "    for name, value in _resolve_path_params(path_params, created_ids).items():\n",
        );
    } else {
        out.push_str("    for name, value in path_params.items():\n");
    }
    out.push_str("        url = url.replace(\"{\" + name + \"}\", str(value))\n");
    out.push_str("    response = api_client.request(\n");
    out.push_str("        METHOD,\n");
    out.push_str("        url,\n");
    if takes_body {
        out.push_str("        json=body,\n");
    }
    out.push_str("        params=query_params or None,\n");
    out.push_str("        headers={k: str(v) for k, v in headers.items()} or None,\n");
    out.push_str("    )\n");
    out.push_str("    assert response.status_code == expected_status, (\n");
    out.push_str(
        "        f\"{intent}: expected {expected_status}, got {response.status_code}: {response.text}\"\n",
    );
    out.push_str("    )\n");
}
