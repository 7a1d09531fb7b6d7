//! Setup planning.
//!
//! Turns an operation's analysis into an ordered program of resource
//! creations, the reverse teardown, and the placeholder bindings rendered
//! tests resolve at execution time.

use crate::{OperationAnalysis, ResourceRequirement};
use loom_intent::IntentKind;
use loom_payload::{build_golden, Payload};
use loom_core::Specification;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// One resource creation before the tests run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupStep {
    pub step_id: usize,
    /// Producer operation, when one was matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer_id: Option<String>,
    pub resource: String,
    /// Collection endpoint POSTed to.
    pub endpoint: String,
    /// Golden-record body for the producer.
    pub body: Value,
    /// Name the captured id is bound under, e.g. `created_user`.
    pub bind_name: String,
    /// The consumer path parameter this binding resolves.
    pub param_name: String,
    /// Response field carrying the created id.
    pub id_field: String,
}

/// One deletion after the tests ran. Failures are non-fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeardownStep {
    pub step_id: usize,
    /// URL template with the binding name in braces, e.g. `/users/{created_user}`.
    pub endpoint_template: String,
    pub bind_name: String,
}

/// The complete setup/teardown plan for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupPlan {
    pub operation_id: String,
    pub needs_setup: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<SetupStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teardown_steps: Vec<TeardownStep>,
    /// `USE_CREATED_RESOURCE_<resource>` placeholder to binding name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub placeholder_bindings: BTreeMap<String, String>,
}

/// The sentinel placeholder a payload carries for a path parameter that is
/// resolved from a created resource.
pub fn resource_placeholder(resource: &str) -> String {
    format!("USE_CREATED_RESOURCE_{}", resource)
}

/// Plan setup for one analyzed operation.
///
/// Steps come out in the analysis's dependency order (outer resources
/// first); teardown is the exact reverse.
pub fn plan(
    analysis: &OperationAnalysis,
    spec: &Specification,
    payloads: &[Payload],
) -> SetupPlan {
    let mut plan = SetupPlan {
        operation_id: analysis.operation_id.clone(),
        needs_setup: analysis.needs_setup,
        steps: Vec::new(),
        teardown_steps: Vec::new(),
        placeholder_bindings: BTreeMap::new(),
    };
    if !analysis.needs_setup {
        return plan;
    }

    for (i, requirement) in analysis.requirements.iter().enumerate() {
        let step_id = i + 1;
        let body = producer_body(requirement, spec, payloads);
        let bind_name = format!("created_{}", requirement.resource);

        plan.steps.push(SetupStep {
            step_id,
            producer_id: requirement.producer_id.clone(),
            resource: requirement.resource.clone(),
            endpoint: requirement.endpoint.clone(),
            body,
            bind_name: bind_name.clone(),
            param_name: requirement.param_name.clone(),
            id_field: "id".to_string(),
        });
        plan.placeholder_bindings.insert(
            resource_placeholder(&requirement.resource),
            format!("{}_id", bind_name),
        );
    }

    // Teardown deletes in reverse creation order.
    for step in plan.steps.iter().rev() {
        plan.teardown_steps.push(TeardownStep {
            step_id: step.step_id,
            endpoint_template: format!("{}/{{{}}}", step.endpoint, step.bind_name),
            bind_name: step.bind_name.clone(),
        });
    }

    plan
}

/// The body used to create a prerequisite resource: the producer's
/// happy-path payload when available, else a fresh golden record from its
/// schema, else an empty object.
fn producer_body(
    requirement: &ResourceRequirement,
    spec: &Specification,
    payloads: &[Payload],
) -> Value {
    let Some(producer_id) = &requirement.producer_id else {
        return json!({});
    };

    if let Some(p) = payloads
        .iter()
        .find(|p| &p.operation_id == producer_id && p.intent == IntentKind::HappyPath)
    {
        return p.body.clone();
    }

    spec.operation(producer_id)
        .and_then(|op| op.body_schema())
        .map(|schema| build_golden(schema, "body"))
        .unwrap_or_else(|| json!({}))
}
