//! The payload enhancer.
//!
//! Operates on happy-path payloads only, as a best-effort decoration: it
//! can replace placeholder values with realistic ones, and nothing else.
//! Any failure falls back to the original payload; enhancement is never on
//! the critical path for correctness.

use crate::{validate_enhanced, CircuitBreaker, Provider};
use loom_intent::IntentKind;
use loom_payload::Payload;
use loom_core::{Operation, Schema, Specification};
use serde_json::Value;
use std::time::Duration;

/// Retry and backoff policy for provider calls.
#[derive(Debug, Clone)]
pub struct EnhancePolicy {
    /// Total attempts per payload, including the first.
    pub max_attempts: u32,
    /// First backoff delay; doubles per retry.
    pub backoff_base: Duration,
}

impl Default for EnhancePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
        }
    }
}

impl EnhancePolicy {
    /// A policy that never sleeps, for tests.
    pub fn immediate() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::ZERO,
        }
    }
}

/// Enhance every happy-path payload in the list. Non-happy payloads pass
/// through untouched; the output list keeps the input order.
pub fn enhance_happy_paths(
    payloads: &[Payload],
    spec: &Specification,
    provider: &dyn Provider,
    breaker: &CircuitBreaker,
    policy: &EnhancePolicy,
) -> Vec<Payload> {
    payloads
        .iter()
        .map(|payload| {
            if payload.intent != IntentKind::HappyPath {
                return payload.clone();
            }
            let schema = spec
                .operation(&payload.operation_id)
                .and_then(Operation::body_schema);
            let body = enhance_payload(
                &payload.body,
                schema,
                &payload.operation_id,
                provider,
                breaker,
                policy,
            );
            Payload {
                body,
                ..payload.clone()
            }
        })
        .collect()
}

/// Enhance one payload body. Returns the original on any failure.
pub fn enhance_payload(
    payload: &Value,
    schema: Option<&Schema>,
    operation_id: &str,
    provider: &dyn Provider,
    breaker: &CircuitBreaker,
    policy: &EnhancePolicy,
) -> Value {
    if !breaker.call_permitted() {
        tracing::debug!(operation_id, "circuit breaker open, keeping raw payload");
        return payload.clone();
    }

    let prompt = build_prompt(operation_id, payload, schema);

    for attempt in 1..=policy.max_attempts.max(1) {
        match try_once(&prompt, payload, schema, provider) {
            Ok(enhanced) => {
                breaker.record_success();
                return enhanced;
            }
            Err(detail) => {
                tracing::warn!(
                    operation_id,
                    attempt,
                    provider = provider.name(),
                    detail = %detail,
                    "payload enhancement attempt failed"
                );
                if attempt == policy.max_attempts {
                    break;
                }
                let backoff = policy.backoff_base * 2u32.saturating_pow(attempt - 1);
                if !backoff.is_zero() {
                    std::thread::sleep(backoff);
                }
            }
        }
    }

    breaker.record_failure();
    payload.clone()
}

fn try_once(
    prompt: &str,
    payload: &Value,
    schema: Option<&Schema>,
    provider: &dyn Provider,
) -> Result<Value, String> {
    let raw = provider.complete(prompt).map_err(|e| e.to_string())?;
    let cleaned = strip_fences(&raw);

    if !cleaned.starts_with('{') && !cleaned.starts_with('[') {
        return Err("response does not start with JSON".to_string());
    }
    let enhanced: Value =
        serde_json::from_str(cleaned).map_err(|e| format!("invalid JSON: {}", e))?;

    validate_enhanced(payload, &enhanced, schema).map_err(|v| v.to_string())?;
    Ok(enhanced)
}

/// Remove markdown code fences some providers wrap JSON in.
fn strip_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

fn build_prompt(operation_id: &str, payload: &Value, schema: Option<&Schema>) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Replace every __PLACEHOLDER_*__ token in the JSON payload below with a realistic value.\n\
         Rules:\n\
         - Do not add, remove or rename keys.\n\
         - Do not change the type of any non-placeholder value.\n\
         - Enum values must stay within their declared set.\n\
         - Respond with the JSON object only, no prose.\n\n",
    );
    prompt.push_str(&format!("Operation: {}\n", operation_id));
    if let Some(schema) = schema {
        if let Ok(schema_json) = serde_json::to_string_pretty(schema) {
            prompt.push_str("Schema:\n");
            prompt.push_str(&schema_json);
            prompt.push('\n');
        }
    }
    prompt.push_str("Payload:\n");
    prompt.push_str(&serde_json::to_string_pretty(payload).unwrap_or_default());
    prompt
}
