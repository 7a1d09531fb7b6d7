//! Testloom Parsers
//!
//! Three dialect front ends, one IR. Each parser turns source text into a
//! `loom_core::Specification`:
//! - `http-contract`: an OpenAPI-shaped JSON contract document
//! - `dynamic-source`: a dynamically-typed function source file
//! - `typed-source`: a statically-typed function source file

mod dynamic_source;
mod error;
mod http_contract;
mod typed_source;

pub use dynamic_source::parse_dynamic_source;
pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use http_contract::parse_http_contract;
pub use typed_source::parse_typed_source;

use loom_core::{SourceDialect, Specification};

/// Parse source text in the given dialect.
pub fn parse(source: &str, dialect: SourceDialect) -> ParseResult<Specification> {
    match dialect {
        SourceDialect::HttpContract => parse_http_contract(source),
        SourceDialect::DynamicSource => parse_dynamic_source(source),
        SourceDialect::TypedSource => parse_typed_source(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_dialect() {
        let contract = serde_json::json!({
            "paths": {"/x": {"get": {"responses": {"200": {"description": "ok"}}}}}
        })
        .to_string();
        assert_eq!(
            parse(&contract, SourceDialect::HttpContract)
                .unwrap()
                .operations
                .len(),
            1
        );

        let py = "def f(x: int) -> int:\n    return x\n";
        assert_eq!(
            parse(py, SourceDialect::DynamicSource)
                .unwrap()
                .operations
                .len(),
            1
        );

        let ts = "function f(x: number): number { return x; }\n";
        assert_eq!(
            parse(ts, SourceDialect::TypedSource)
                .unwrap()
                .operations
                .len(),
            1
        );
    }

    /// Parsing twice yields IR values comparing equal.
    #[test]
    fn test_parse_is_deterministic() {
        let contract = serde_json::json!({
            "info": {"title": "T", "version": "1"},
            "paths": {
                "/users": {"post": {
                    "operationId": "create_user",
                    "requestBody": {"content": {"application/json": {"schema": {
                        "type": "object",
                        "properties": {"email": {"type": "string"}},
                        "required": ["email"]
                    }}}},
                    "responses": {"201": {"description": "ok"}}
                }}
            }
        })
        .to_string();

        let a = parse(&contract, SourceDialect::HttpContract).unwrap();
        let b = parse(&contract, SourceDialect::HttpContract).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
