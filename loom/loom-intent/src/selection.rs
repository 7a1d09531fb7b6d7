//! Intent allow-list selection.

use crate::IntentKind;
use std::collections::HashSet;
use thiserror::Error;

/// The caller named an intent that is not in the catalog.
#[derive(Debug, Clone, Error)]
#[error("Invalid intent selection: unknown intent '{0}'")]
pub struct InvalidIntentSelection(pub String);

/// Which intents the caller wants generated.
///
/// `HAPPY_PATH` is always generated regardless of the selection. An empty
/// selection therefore still yields one happy-path intent per operation.
#[derive(Debug, Clone, Default)]
pub struct IntentSelection {
    allowed: Option<HashSet<IntentKind>>,
}

impl IntentSelection {
    /// Allow every catalog intent.
    pub fn all() -> Self {
        Self { allowed: None }
    }

    /// Build a selection from intent names, validating each against the
    /// catalog.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, InvalidIntentSelection> {
        let mut allowed = HashSet::new();
        for name in names {
            let kind: IntentKind = name
                .as_ref()
                .parse()
                .map_err(|_| InvalidIntentSelection(name.as_ref().to_string()))?;
            allowed.insert(kind);
        }
        Ok(Self {
            allowed: Some(allowed),
        })
    }

    pub fn allows(&self, kind: IntentKind) -> bool {
        if kind == IntentKind::HappyPath {
            return true;
        }
        match &self.allowed {
            None => true,
            Some(set) => set.contains(&kind),
        }
    }
}
