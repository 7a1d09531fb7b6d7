//! Dependency analysis for the HTTP dialect.
//!
//! Classifies operations into resource producers (`POST /r` with an object
//! body) and consumers (`GET|PUT|PATCH|DELETE /r/{id}`), then binds each
//! consumer path parameter to the producer that can create the resource it
//! names. All choices are deterministic.

use loom_core::{HttpMethod, Operation, OperationKind, Schema, Specification};
use serde::{Deserialize, Serialize};

/// A resource a consumer operation needs created before it can run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirement {
    /// Resource type, e.g. `user`.
    pub resource: String,
    /// The path parameter resolved by the created resource's id.
    pub param_name: String,
    /// The matched producer operation, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer_id: Option<String>,
    /// Collection endpoint used to create the resource.
    pub endpoint: String,
}

/// Setup classification for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationAnalysis {
    pub operation_id: String,
    pub needs_setup: bool,
    /// Requirements in dependency order: outer path resources first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<ResourceRequirement>,
}

/// A producer of one resource type.
#[derive(Debug, Clone)]
struct Producer {
    resource: String,
    path: String,
    operation_id: String,
}

/// Analyze every operation in source order.
pub fn analyze(spec: &Specification) -> Vec<OperationAnalysis> {
    let producers = collect_producers(spec);
    spec.operations
        .iter()
        .map(|op| analyze_operation(op, &producers))
        .collect()
}

fn collect_producers(spec: &Specification) -> Vec<Producer> {
    let mut producers = Vec::new();
    for op in &spec.operations {
        let OperationKind::Http { method, path } = &op.kind else {
            continue;
        };
        if *method != HttpMethod::Post {
            continue;
        }
        if !matches!(op.body_schema(), Some(Schema::Object(_))) {
            continue;
        }
        if let Some(resource) = last_static_segment(path) {
            producers.push(Producer {
                resource: singularize(&resource),
                path: path.clone(),
                operation_id: op.id.clone(),
            });
        }
    }
    producers
}

fn analyze_operation(op: &Operation, producers: &[Producer]) -> OperationAnalysis {
    let OperationKind::Http { method, path } = &op.kind else {
        return OperationAnalysis {
            operation_id: op.id.clone(),
            needs_setup: false,
            requirements: Vec::new(),
        };
    };

    let consumes = matches!(
        method,
        HttpMethod::Get | HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete
    );
    if !consumes || op.path_params.is_empty() {
        return OperationAnalysis {
            operation_id: op.id.clone(),
            needs_setup: false,
            requirements: Vec::new(),
        };
    }

    // Bind parameters in path order so outer resources come first.
    let mut requirements = Vec::new();
    for param_name in template_params(path) {
        if !op.path_params.iter().any(|p| p.name == param_name) {
            continue;
        }
        let resource = resource_from_param(&param_name);
        let producer = match_producer(&resource, producers);
        let endpoint = producer
            .map(|p| p.path.clone())
            .unwrap_or_else(|| strip_params(path));
        requirements.push(ResourceRequirement {
            resource,
            param_name,
            producer_id: producer.map(|p| p.operation_id.clone()),
            endpoint,
        });
    }

    OperationAnalysis {
        operation_id: op.id.clone(),
        needs_setup: !requirements.is_empty(),
        requirements,
    }
}

/// Of all producers for a resource type, the one with the shortest path
/// wins; declaration order breaks ties.
fn match_producer<'a>(resource: &str, producers: &'a [Producer]) -> Option<&'a Producer> {
    producers
        .iter()
        .filter(|p| p.resource == resource)
        .min_by_key(|p| p.path.len())
}

/// `{name}` placeholders in template order.
fn template_params(path: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        params.push(rest[open + 1..open + close].to_string());
        rest = &rest[open + close + 1..];
    }
    params
}

fn last_static_segment(path: &str) -> Option<String> {
    path.split('/')
        .filter(|s| !s.is_empty() && !s.starts_with('{'))
        .next_back()
        .map(str::to_string)
}

/// `/users -> user`; a bare `s` stays as-is.
fn singularize(segment: &str) -> String {
    if segment.len() > 1 && segment.ends_with('s') {
        segment[..segment.len() - 1].to_string()
    } else {
        segment.to_string()
    }
}

/// `user_id -> user`; a parameter without the suffix names the resource
/// directly.
fn resource_from_param(param: &str) -> String {
    param.strip_suffix("_id").unwrap_or(param).to_string()
}

/// Collection endpoint inferred by dropping every `/{param}` segment.
fn strip_params(path: &str) -> String {
    let stripped: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && !s.starts_with('{'))
        .collect();
    if stripped.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", stripped.join("/"))
    }
}
