//! Async-style HTTP test renderer (jest + fetch).

use crate::common::{banner, ts_literal};
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

    let mut out = String::new();
    out.push_str(&banner("//"));
    out.push('\n');
    out.push_str(&format!(
        "const BASE_URL = \"{}\";\n",
        base_url.trim_end_matches('/')
    ));
    out.push_str(&format!("const ENDPOINT = \"{}\";\n", path));
    out.push_str(&format!("const METHOD = \"{}\";\n\n", method.as_str()));

    if let Some(program) = fixture {
        render_bindings(&mut out, program);
        out.push_str("const createdIds: Record<string, string | number> = {};\n\n");
    }
    if needs_unique {
        out.push_str(UNIQUE_HELPER);
    }
    if let Some(program) = fixture {
        render_setup(&mut out, program);
    }

    render_cases(&mut out, payloads, fixture);
    render_suite(&mut out, op, method.takes_body(), fixture.is_some());

    crate::check_placeholders_resolved(&op.id, &out, program)?;
    Ok(out)
}

fn render_bindings(out: &mut String, program: &FixtureProgram) {
    out.push_str("const PLACEHOLDER_BINDINGS: Record<string, string> = {\n");
    for instruction in &program.instructions {
        if let FixtureInstruction::BindPlaceholder {
            placeholder,
            bind_name,
            ..
        } = instruction
        {
            out.push_str(&format!("  {}: \"{}\",\n", json!(placeholder), bind_name));
        }
    }
    out.push_str("};\n\n");
}

const UNIQUE_HELPER: &str = r#"function unique(value: string): string {
  const suffix = Math.random().toString(16).slice(2, 10);
  if (value.includes("@")) {
    const [local, domain] = value.split("@");
    return `${local}_${suffix}@${domain}`;
  }
  return `${value}_${suffix}`;
}

"#;

fn render_setup(out: &mut String, program: &FixtureProgram) {
    out.push_str("beforeAll(async () => {\n");
    for instruction in &program.instructions {
        match instruction {
            FixtureInstruction::CreateResource {
                step_id,
                endpoint,
                body,
                unique_fields,
            } => {
                out.push_str(&format!(
                    "  const payload{}: Record<string, unknown> = {};\n",
                    step_id,
                    ts_literal(body)
                ));
                for field in unique_fields {
                    out.push_str(&format!(
                        "  payload{}[{}] = unique(payload{}[{}] as string);\n",
                        step_id,
                        json!(field),
                        step_id,
                        json!(field)
                    ));
                }
                out.push_str(&format!(
                    "  const response{} = await fetch(`${{BASE_URL}}{}`, {{\n    method: \"POST\",\n    headers: {{ \"Content-Type\": \"application/json\" }},\n    body: JSON.stringify(payload{}),\n  }});\n",
                    step_id, endpoint, step_id
                ));
                out.push_str(&format!(
                    "  expect(response{}.status).toBeLessThan(400);\n",
                    step_id
                ));
            }
            FixtureInstruction::CaptureIdFrom {
                step_id,
                bind_name,
                id_field,
            } => {
                out.push_str(&format!(
                    "  const data{} = (await response{}.json()) as Record<string, string | number>;\n",
                    step_id, step_id
                ));
                out.push_str(&format!(
                    "  createdIds[\"{}_id\"] = data{}[{}];\n",
                    bind_name,
                    step_id,
                    json!(id_field)
                ));
            }
            _ => {}
        }
    }
    out.push_str("});\n\n");

    out.push_str("afterAll(async () => {\n");
    out.push_str("  // Teardown deletes in reverse creation order; failures are non-fatal.\n");
    for instruction in &program.instructions {
        if let FixtureInstruction::DeleteResource {
            endpoint_template,
            bind_name,
        } = instruction
        {
            let url = endpoint_template.replace(
                &format!("{{{}}}", bind_name),
                &format!("${{createdIds[\"{}_id\"]}}", bind_name),
            );
            out.push_str("  try {\n");
            out.push_str(&format!(
                "    await fetch(`${{BASE_URL}}{}`, {{ method: \"DELETE\" }});\n",
                url
            ));
            out.push_str("  } catch {\n    // ignored\n  }\n");
        }
    }
    out.push_str("});\n\n");
}

fn render_cases(out: &mut String, payloads: &[Payload], program: Option<&FixtureProgram>) {
    out.push_str("interface TestCase {\n");
    out.push_str("  intent: string;\n  body: unknown;\n  pathParams: Record<string, unknown>;\n");
    out.push_str("  queryParams: Record<string, unknown>;\n  headers: Record<string, unknown>;\n");
    out.push_str("  expectedStatus: number;\n}\n\n");

    out.push_str("const CASES: TestCase[] = [\n");
    for (i, payload) in payloads.iter().enumerate() {
        let path_params = patched_path_params(payload, program);
        out.push_str("  {\n");
        out.push_str(&format!(
            "    intent: \"{:02}_{}\",\n",
            i,
            payload.intent.as_str()
        ));
        out.push_str(&format!("    body: {},\n", ts_literal(&payload.body)));
        out.push_str(&format!(
            "    pathParams: {},\n",
            ts_literal(&Value::Object(path_params))
        ));
        out.push_str(&format!(
            "    queryParams: {},\n",
            ts_literal(&Value::Object(payload.query_params.clone()))
        ));
        out.push_str(&format!(
            "    headers: {},\n",
            ts_literal(&Value::Object(payload.headers.clone()))
        ));
        out.push_str(&format!("    expectedStatus: {},\n", payload.expected_status));
        out.push_str("  },\n");
    }
    out.push_str("];\n\n");
}

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

fn render_suite(out: &mut String, op: &Operation, takes_body: bool, has_fixture: bool) {
    let OperationKind::Http { method, path } = &op.kind else {
        return;
    };
    let describe = format!("{} {}", method.as_str(), path);

    out.push_str(&format!("describe({}, () => {{\n", json!(describe)));
    out.push_str("  test.each(CASES)(\"$intent\", async (tc) => {\n");
    out.push_str("    let url = BASE_URL + ENDPOINT;\n");
    out.push_str("    for (const [name, raw] of Object.entries(tc.pathParams)) {\n");
    if has_fixture {
        out.push_str(
            "      const bound = typeof raw === \"string\" ? PLACEHOLDER_BINDINGS[raw] : undefined;\n",
        );
        out.push_str("      const value = bound ? createdIds[bound] : raw;\n");
    } else {
        out.push_str("      const value = raw;\n");
    }
    out.push_str("      url = url.replace(`{${name}}`, String(value));\n");
    out.push_str("    }\n");
    out.push_str("    const query = new URLSearchParams();\n");
    out.push_str("    for (const [name, value] of Object.entries(tc.queryParams)) {\n");
    out.push_str("      query.append(name, String(value));\n");
    out.push_str("    }\n");
    out.push_str("    const qs = query.toString();\n");
    out.push_str("    if (qs.length > 0) {\n      url = `${url}?${qs}`;\n    }\n");
    out.push_str("    const headers: Record<string, string> = { \"Content-Type\": \"application/json\" };\n");
    out.push_str("    for (const [name, value] of Object.entries(tc.headers)) {\n");
    out.push_str("      headers[name] = String(value);\n");
    out.push_str("    }\n");
    out.push_str("    const response = await fetch(url, {\n");
    out.push_str("      method: METHOD,\n");
    out.push_str("      headers,\n");
    if takes_body {
        out.push_str("      body: JSON.stringify(tc.body),\n");
    }
    out.push_str("    });\n");
    out.push_str("    expect(response.status).toBe(tc.expectedStatus);\n");
    out.push_str("  });\n");
    out.push_str("});\n");
}
