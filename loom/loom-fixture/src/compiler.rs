//! Fixture compilation.
//!
//! Lowers a `SetupPlan` into an abstract instruction program the renderers
//! turn into concrete fixture code. The compiler also injects payload
//! uniqueness: identity-bearing string fields are marked so the generated
//! fixture appends a random suffix when it executes. The marks keep
//! generation deterministic; only the generated test randomizes, at its own
//! runtime.

use crate::SetupPlan;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field-name fragments that indicate an identity the backend is likely to
/// enforce uniqueness on.
const IDENTITY_FRAGMENTS: &[&str] = &["email", "username", "code", "name"];

/// One abstract fixture instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FixtureInstruction {
    /// POST `body` to `endpoint`; fields in `unique_fields` get a random
    /// suffix at execution time.
    CreateResource {
        step_id: usize,
        endpoint: String,
        body: Value,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        unique_fields: Vec<String>,
    },
    /// Read `id_field` from the creation response into `bind_name`.
    CaptureIdFrom {
        step_id: usize,
        bind_name: String,
        id_field: String,
    },
    /// Make `placeholder` in payloads resolve to `bind_name`; the
    /// placeholder stands in for the `param_name` path parameter.
    BindPlaceholder {
        placeholder: String,
        bind_name: String,
        param_name: String,
    },
    /// DELETE the created resource during teardown.
    DeleteResource {
        endpoint_template: String,
        bind_name: String,
    },
    /// Teardown deletions are best-effort; swallow the failure.
    HandleDeleteFailure { bind_name: String },
}

/// The compiled fixture program for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureProgram {
    pub operation_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<FixtureInstruction>,
}

impl FixtureProgram {
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Create instructions in setup order.
    pub fn creations(&self) -> impl Iterator<Item = &FixtureInstruction> {
        self.instructions
            .iter()
            .filter(|i| matches!(i, FixtureInstruction::CreateResource { .. }))
    }
}

/// Compile a setup plan into a fixture program.
pub fn compile(plan: &SetupPlan) -> FixtureProgram {
    let mut instructions = Vec::new();

    for step in &plan.steps {
        instructions.push(FixtureInstruction::CreateResource {
            step_id: step.step_id,
            endpoint: step.endpoint.clone(),
            body: step.body.clone(),
            unique_fields: identity_fields(&step.body),
        });
        instructions.push(FixtureInstruction::CaptureIdFrom {
            step_id: step.step_id,
            bind_name: step.bind_name.clone(),
            id_field: step.id_field.clone(),
        });
    }

    for step in &plan.steps {
        instructions.push(FixtureInstruction::BindPlaceholder {
            placeholder: crate::resource_placeholder(&step.resource),
            bind_name: format!("{}_id", step.bind_name),
            param_name: step.param_name.clone(),
        });
    }

    for teardown in &plan.teardown_steps {
        instructions.push(FixtureInstruction::DeleteResource {
            endpoint_template: teardown.endpoint_template.clone(),
            bind_name: teardown.bind_name.clone(),
        });
        instructions.push(FixtureInstruction::HandleDeleteFailure {
            bind_name: teardown.bind_name.clone(),
        });
    }

    FixtureProgram {
        operation_id: plan.operation_id.clone(),
        instructions,
    }
}

/// Top-level string fields whose name marks an identity.
fn identity_fields(body: &Value) -> Vec<String> {
    let Some(map) = body.as_object() else {
        return Vec::new();
    };
    map.iter()
        .filter(|(name, value)| {
            value.is_string()
                && IDENTITY_FRAGMENTS
                    .iter()
                    .any(|frag| name.to_ascii_lowercase().contains(frag))
        })
        .map(|(name, _)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SetupStep, TeardownStep};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn sample_plan() -> SetupPlan {
        SetupPlan {
            operation_id: "get_user".into(),
            needs_setup: true,
            steps: vec![SetupStep {
                step_id: 1,
                producer_id: Some("create_user".into()),
                resource: "user".into(),
                endpoint: "/users".into(),
                body: json!({
                    "email": "__PLACEHOLDER_STRING_email__",
                    "age": 0,
                    "note": 5
                }),
                bind_name: "created_user".into(),
                param_name: "user_id".into(),
                id_field: "id".into(),
            }],
            teardown_steps: vec![TeardownStep {
                step_id: 1,
                endpoint_template: "/users/{created_user}".into(),
                bind_name: "created_user".into(),
            }],
            placeholder_bindings: BTreeMap::from([(
                "USE_CREATED_RESOURCE_user".to_string(),
                "created_user_id".to_string(),
            )]),
        }
    }

    #[test]
    fn test_instruction_order() {
        let program = compile(&sample_plan());
        let kinds: Vec<&str> = program
            .instructions
            .iter()
            .map(|i| match i {
                FixtureInstruction::CreateResource { .. } => "create",
                FixtureInstruction::CaptureIdFrom { .. } => "capture",
                FixtureInstruction::BindPlaceholder { .. } => "bind",
                FixtureInstruction::DeleteResource { .. } => "delete",
                FixtureInstruction::HandleDeleteFailure { .. } => "handle",
            })
            .collect();
        assert_eq!(kinds, vec!["create", "capture", "bind", "delete", "handle"]);
    }

    #[test]
    fn test_identity_fields_marked_unique() {
        let program = compile(&sample_plan());
        let FixtureInstruction::CreateResource { unique_fields, .. } = &program.instructions[0]
        else {
            panic!("first instruction must create");
        };
        // `email` is an identity string; `age` and `note` are not strings.
        assert_eq!(unique_fields, &vec!["email".to_string()]);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let plan = sample_plan();
        let a = serde_json::to_string(&compile(&plan)).unwrap();
        let b = serde_json::to_string(&compile(&plan)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_plan_compiles_empty() {
        let plan = SetupPlan {
            operation_id: "op".into(),
            needs_setup: false,
            steps: vec![],
            teardown_steps: vec![],
            placeholder_bindings: BTreeMap::new(),
        };
        assert!(compile(&plan).is_empty());
    }
}
