//! Testloom Payload Synthesis
//!
//! Turns (operation, intents) into concrete test cases. A canonical valid
//! "golden record" is built once per operation; each intent applies exactly
//! one mutation to a clean copy of it.

mod golden;
mod mutate;
mod payload;

pub use golden::{build_golden, string_placeholder, PLACEHOLDER_PREFIX};
pub use mutate::*;
pub use payload::{generate_payloads, Payload, VALID_UUID};
