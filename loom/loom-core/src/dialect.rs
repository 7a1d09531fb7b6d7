//! Source-dialect and target-framework tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three accepted input dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceDialect {
    HttpContract,
    DynamicSource,
    TypedSource,
}

impl SourceDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceDialect::HttpContract => "http-contract",
            SourceDialect::DynamicSource => "dynamic-source",
            SourceDialect::TypedSource => "typed-source",
        }
    }
}

impl FromStr for SourceDialect {
    type Err = UnsupportedDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http-contract" => Ok(SourceDialect::HttpContract),
            "dynamic-source" => Ok(SourceDialect::DynamicSource),
            "typed-source" => Ok(SourceDialect::TypedSource),
            other => Err(UnsupportedDialect(other.to_string())),
        }
    }
}

impl fmt::Display for SourceDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized dialect tag.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unsupported source dialect: {0}")]
pub struct UnsupportedDialect(pub String);

/// The three supported output frameworks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetFramework {
    HttpSync,
    HttpAsync,
    FunctionDirect,
}

impl TargetFramework {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFramework::HttpSync => "http-sync",
            TargetFramework::HttpAsync => "http-async",
            TargetFramework::FunctionDirect => "function-direct",
        }
    }

    /// Extension of the generated test files.
    pub fn file_extension(&self) -> &'static str {
        match self {
            TargetFramework::HttpSync | TargetFramework::FunctionDirect => "py",
            TargetFramework::HttpAsync => "test.ts",
        }
    }
}

impl FromStr for TargetFramework {
    type Err = UnsupportedFramework;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http-sync" => Ok(TargetFramework::HttpSync),
            "http-async" => Ok(TargetFramework::HttpAsync),
            "function-direct" => Ok(TargetFramework::FunctionDirect),
            other => Err(UnsupportedFramework(other.to_string())),
        }
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized framework tag.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unsupported target framework: {0}")]
pub struct UnsupportedFramework(pub String);
