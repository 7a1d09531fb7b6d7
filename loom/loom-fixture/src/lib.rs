//! Testloom Fixture Planning
//!
//! For the HTTP dialect: detects cross-operation resource prerequisites,
//! plans ordered setup and teardown, and compiles the plan into an abstract
//! fixture program for the renderers.

mod analyzer;
mod compiler;
mod planner;

pub use analyzer::{analyze, OperationAnalysis, ResourceRequirement};
pub use compiler::{compile, FixtureInstruction, FixtureProgram};
pub use planner::{plan, resource_placeholder, SetupPlan, SetupStep, TeardownStep};
