//! The provider boundary.
//!
//! A provider is text-in, text-out; nothing else about it is in scope.
//! Everything returned by a provider is treated as untrusted until the
//! structural validator accepts it.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// Errors a provider call can produce. All of them are absorbed by the
/// enhancer; none propagate past it.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("provider unreachable: {0}")]
    Unreachable(String),

    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// An abstract completion provider.
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Provider selection as carried in a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: String,
    pub model: String,
}

/// A provider that replays a scripted sequence of responses. Intended for
/// tests; the last response repeats once the script is exhausted.
pub struct ScriptedProvider {
    name: String,
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    last: Mutex<Option<Result<String, ProviderError>>>,
    calls: Mutex<usize>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            name: "scripted".to_string(),
            script: Mutex::new(responses.into()),
            last: Mutex::new(None),
            calls: Mutex::new(0),
        }
    }

    /// A provider that always fails.
    pub fn always_failing() -> Self {
        let p = Self::new(vec![Err(ProviderError::Unreachable("scripted".into()))]);
        p
    }

    /// How many completions were requested.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        let mut script = self.script.lock().unwrap();
        match script.pop_front() {
            Some(response) => {
                *self.last.lock().unwrap() = Some(response.clone());
                response
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or(Err(ProviderError::Unreachable("script exhausted".into()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_provider_replays_and_repeats() {
        let p = ScriptedProvider::new(vec![
            Ok("one".to_string()),
            Err(ProviderError::Unreachable("down".into())),
        ]);
        assert_eq!(p.complete("x").unwrap(), "one");
        assert!(p.complete("x").is_err());
        // Exhausted script repeats the last response.
        assert!(p.complete("x").is_err());
        assert_eq!(p.call_count(), 3);
    }
}
