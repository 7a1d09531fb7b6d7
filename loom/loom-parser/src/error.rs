//! Parser error types.

use std::fmt;

/// What went wrong while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The source text is not well-formed for its dialect.
    Syntax,
    /// A reference points at a declaration that does not exist.
    UnresolvedReference,
    /// The construct is valid in the source language but not supported here.
    UnsupportedFeature,
    /// The parser produced an IR that violates a structural invariant.
    InvariantViolation,
}

impl ParseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::Syntax => "syntax",
            ParseErrorKind::UnresolvedReference => "unresolved-reference",
            ParseErrorKind::UnsupportedFeature => "unsupported-feature",
            ParseErrorKind::InvariantViolation => "invariant-violation",
        }
    }
}

/// A parse error with the location context that produced it.
///
/// `path` is a dotted locator into the source document, e.g.
/// `paths./users.post` for the contract dialect or `create_user.args.status`
/// for the source dialects.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub path: String,
    pub kind: ParseErrorKind,
    pub detail: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            detail: detail.into(),
        }
    }

    pub fn syntax(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Syntax, path, detail)
    }

    pub fn unresolved(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::UnresolvedReference, path, detail)
    }

    pub fn unsupported(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::UnsupportedFeature, path, detail)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error ({}) at {}: {}",
            self.kind.as_str(),
            self.path,
            self.detail
        )
    }
}

impl std::error::Error for ParseError {}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;
