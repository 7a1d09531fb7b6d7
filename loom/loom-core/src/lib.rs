//! Testloom Core Types
//!
//! This crate provides the foundational types used throughout the testloom
//! pipeline:
//! - The dialect-neutral schema model (the Schema enum and its per-variant
//!   constraint records)
//! - Specification, Operation, Parameter and Response (the IR)
//! - The TypeDecl arena with TypeId handles
//! - Dialect and target-framework tags
//! - Invariant validation for parsed specifications

mod dialect;
mod error;
mod ir;
mod schema;

pub use dialect::*;
pub use error::*;
pub use ir::*;
pub use schema::*;
