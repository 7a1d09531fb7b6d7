//! Determinism, ordering and enhancement scenarios.

use loom_enhance::{EnhancePolicy, ProviderError, ScriptedProvider};
use loom_pipeline::{
    CollectingSink, GenerationRequest, LlmConfig, MemStore, PipelineDriver,
};
use loom_core::{SourceDialect, TargetFramework};
use serde_json::json;

fn three_ops_contract() -> String {
    let op = |name: &str| {
        json!({
            "post": {
                "operationId": name,
                "requestBody": {"content": {"application/json": {"schema": {
                    "type": "object",
                    "properties": {
                        "title": {"type": "string", "maxLength": 40},
                        "count": {"type": "integer", "minimum": 1}
                    },
                    "required": ["title"]
                }}}},
                "responses": {"201": {"description": "created"}, "422": {"description": "bad"}}
            }
        })
    };
    json!({
        "info": {"title": "Ordered API", "version": "1.0.0"},
        "paths": {
            "/a": op("op_a"),
            "/b": op("op_b"),
            "/c": op("op_c")
        }
    })
    .to_string()
}

fn request() -> GenerationRequest {
    GenerationRequest::from_source(
        &three_ops_contract(),
        SourceDialect::HttpContract,
        TargetFramework::HttpSync,
    )
}

fn llm_config() -> Option<LlmConfig> {
    Some(LlmConfig {
        payload_enhancement: Some(loom_enhance::ProviderConfig {
            provider: "scripted".into(),
            model: "test".into(),
        }),
        test_enhancement: None,
    })
}

/// Two independent runs produce byte-identical artifacts.
#[test]
fn test_runs_are_byte_identical() {
    let store_a = MemStore::new();
    let store_b = MemStore::new();
    let sink = CollectingSink::new();

    PipelineDriver::new(&store_a, &sink)
        .run("job", &request())
        .unwrap();
    PipelineDriver::new(&store_b, &sink)
        .run("job", &request())
        .unwrap();

    let paths = store_a.paths("job");
    assert_eq!(paths, store_b.paths("job"));
    for path in paths {
        assert_eq!(
            store_a.get("job", &path),
            store_b.get("job", &path),
            "artifact {} differs between runs",
            path
        );
    }
}

/// Operations appear in source declaration order in every artifact, even
/// though per-operation work is parallelized.
#[test]
fn test_operation_order_is_source_order() {
    let store = MemStore::new();
    let sink = CollectingSink::new();
    PipelineDriver::new(&store, &sink)
        .run("job", &request())
        .unwrap();

    let intents = store.get_json("job", "2_intents.json").unwrap();
    let op_order: Vec<String> = intents
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["operation_id"].as_str().unwrap().to_string())
        .collect();
    let mut deduped = Vec::new();
    for op in op_order {
        if deduped.last() != Some(&op) {
            deduped.push(op);
        }
    }
    assert_eq!(deduped, vec!["op_a", "op_b", "op_c"]);

    let payloads = store.get_json("job", "3_payloads_raw.json").unwrap();
    let first = &payloads.as_array().unwrap()[0];
    assert_eq!(first["operation_id"], "op_a");
    assert_eq!(first["intent"], "HAPPY_PATH");
}

/// Reordering operations in the source reorders every artifact the same
/// way.
#[test]
fn test_source_reorder_propagates() {
    let contract = three_ops_contract()
        .replace("/a", "/tmp_z")
        .replace("/c", "/a")
        .replace("/tmp_z", "/c");
    let store = MemStore::new();
    let sink = CollectingSink::new();
    let req = GenerationRequest::from_source(
        &contract,
        SourceDialect::HttpContract,
        TargetFramework::HttpSync,
    );
    PipelineDriver::new(&store, &sink).run("job", &req).unwrap();

    let ir = store.get_json("job", "1_ir.json").unwrap();
    let ids: Vec<&str> = ir["operations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["op_a", "op_b", "op_c"]);
    let paths: Vec<&str> = ir["operations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["/c", "/b", "/a"]);
}

/// A structurally valid LLM response replaces the happy-path payload; the
/// raw artifact keeps the placeholders.
#[test]
fn test_enhancement_accepted_when_structure_preserved() {
    let source = json!({
        "paths": {"/users": {"post": {
            "operationId": "create_user",
            "requestBody": {"content": {"application/json": {"schema": {
                "type": "object",
                "properties": {
                    "email": {"type": "string", "format": "email"},
                    "age": {"type": "integer", "minimum": 0}
                },
                "required": ["email", "age"]
            }}}},
            "responses": {"201": {"description": "ok"}, "422": {"description": "bad"}}
        }}}
    })
    .to_string();

    let provider = ScriptedProvider::new(vec![Ok(
        r#"{"email": "alice@example.com", "age": 28}"#.to_string()
    )]);
    let store = MemStore::new();
    let sink = CollectingSink::new();
    let driver = PipelineDriver::new(&store, &sink)
        .with_provider(&provider)
        .with_enhance_policy(EnhancePolicy::immediate());

    let mut req = GenerationRequest::from_source(
        &source,
        SourceDialect::HttpContract,
        TargetFramework::HttpSync,
    );
    req.llm_config = llm_config();
    driver.run("job", &req).unwrap();

    let raw = store.get_json("job", "3_payloads_raw.json").unwrap();
    let raw_happy = raw
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["intent"] == "HAPPY_PATH")
        .unwrap();
    assert_eq!(raw_happy["body"]["email"], "__PLACEHOLDER_STRING_email__");

    let enhanced = store.get_json("job", "3_payloads_enhanced.json").unwrap();
    let enhanced_all = enhanced.as_array().unwrap();
    let enhanced_happy = enhanced_all
        .iter()
        .find(|p| p["intent"] == "HAPPY_PATH")
        .unwrap();
    // Accepted verbatim: placeholders replaced, leaf types preserved.
    assert_eq!(
        enhanced_happy["body"],
        json!({"email": "alice@example.com", "age": 28})
    );
    // Negative payloads pass through enhancement untouched.
    let enhanced_negative = enhanced_all
        .iter()
        .find(|p| p["intent"] == "TYPE_VIOLATION")
        .unwrap();
    assert_eq!(
        enhanced_negative["body"]["email"],
        raw.as_array()
            .unwrap()
            .iter()
            .find(|p| p["intent"] == "TYPE_VIOLATION")
            .unwrap()["body"]["email"]
    );
}

/// A response with a missing key is rejected and the original payload is
/// kept.
#[test]
fn test_enhancement_rejected_on_structure_change() {
    let provider_bad = ScriptedProvider::new(vec![Ok(r#"{"wrong_key": 1}"#.to_string())]);

    let store = MemStore::new();
    let sink = CollectingSink::new();
    let driver = PipelineDriver::new(&store, &sink)
        .with_provider(&provider_bad)
        .with_enhance_policy(EnhancePolicy::immediate());
    let mut req = request();
    req.llm_config = llm_config();
    driver.run("job", &req).unwrap();

    let enhanced = store.get_json("job", "3_payloads_enhanced.json").unwrap();
    let happy = enhanced
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["intent"] == "HAPPY_PATH")
        .unwrap();
    // Fallback to the placeholder payload.
    assert_eq!(happy["body"]["title"], "__PLACEHOLDER_STRING_title__");
}

/// After the failure threshold the breaker opens and no further provider
/// calls are issued; remaining payloads fall back unchanged.
#[test]
fn test_circuit_breaker_suppresses_calls() {
    // Eight producing operations, one happy path each.
    let mut paths = serde_json::Map::new();
    for i in 0..8 {
        paths.insert(
            format!("/r{}", i),
            json!({"post": {
                "operationId": format!("op_{}", i),
                "requestBody": {"content": {"application/json": {"schema": {
                    "type": "object",
                    "properties": {"title": {"type": "string"}},
                    "required": ["title"]
                }}}},
                "responses": {"201": {"description": "ok"}}
            }}),
        );
    }
    let source = json!({"info": {"title": "X", "version": "1"}, "paths": paths}).to_string();

    let provider = ScriptedProvider::new(vec![Err(ProviderError::Unreachable("down".into()))]);
    let store = MemStore::new();
    let sink = CollectingSink::new();
    let driver = PipelineDriver::new(&store, &sink)
        .with_provider(&provider)
        .with_enhance_policy(EnhancePolicy::immediate());

    let mut req = GenerationRequest::from_source(
        &source,
        SourceDialect::HttpContract,
        TargetFramework::HttpSync,
    );
    req.llm_config = llm_config();
    driver.run("job", &req).unwrap();

    // Five payloads fail (three attempts each) before the breaker opens;
    // the remaining three are skipped without any call.
    assert_eq!(provider.call_count(), 5 * 3);

    let enhanced = store.get_json("job", "3_payloads_enhanced.json").unwrap();
    for payload in enhanced.as_array().unwrap() {
        if payload["intent"] == "HAPPY_PATH" {
            assert_eq!(payload["body"]["title"], "__PLACEHOLDER_STRING_title__");
        }
    }
}
