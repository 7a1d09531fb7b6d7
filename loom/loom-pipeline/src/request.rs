//! Generation requests.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use loom_enhance::ProviderConfig;
use loom_core::{SourceDialect, TargetFramework};
use serde::{Deserialize, Serialize};

/// Provider selection for the two enhancement surfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_enhancement: Option<ProviderConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_enhancement: Option<ProviderConfig>,
}

/// A complete generation request, transport-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Source text, base64-encoded.
    pub spec_payload: String,
    pub source_dialect: SourceDialect,
    pub target_framework: TargetFramework,
    /// Used only by HTTP targets; substituted literally at render.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Allow-listed intent names; absent means all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_intents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_config: Option<LlmConfig>,
}

impl GenerationRequest {
    /// Build a request from plain source text.
    pub fn from_source(
        source: &str,
        source_dialect: SourceDialect,
        target_framework: TargetFramework,
    ) -> Self {
        Self {
            spec_payload: STANDARD.encode(source),
            source_dialect,
            target_framework,
            base_url: None,
            target_intents: None,
            llm_config: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_target_intents(mut self, intents: Vec<String>) -> Self {
        self.target_intents = Some(intents);
        self
    }

    /// Decode the base64 source text.
    pub fn decode_spec(&self) -> Result<String, String> {
        let bytes = STANDARD
            .decode(&self.spec_payload)
            .map_err(|e| format!("spec_payload is not valid base64: {}", e))?;
        String::from_utf8(bytes).map_err(|e| format!("spec_payload is not UTF-8: {}", e))
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or("http://localhost:8000")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_source_text() {
        let request = GenerationRequest::from_source(
            "def f(x: int) -> int:\n    return x\n",
            SourceDialect::DynamicSource,
            TargetFramework::FunctionDirect,
        );
        assert_eq!(
            request.decode_spec().unwrap(),
            "def f(x: int) -> int:\n    return x\n"
        );
    }

    #[test]
    fn test_invalid_base64_reports() {
        let mut request = GenerationRequest::from_source(
            "x",
            SourceDialect::HttpContract,
            TargetFramework::HttpSync,
        );
        request.spec_payload = "!!not-base64!!".to_string();
        assert!(request.decode_spec().is_err());
    }

    #[test]
    fn test_wire_names() {
        let request = GenerationRequest::from_source(
            "{}",
            SourceDialect::HttpContract,
            TargetFramework::HttpAsync,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["source_dialect"], "http-contract");
        assert_eq!(json["target_framework"], "http-async");
    }
}
