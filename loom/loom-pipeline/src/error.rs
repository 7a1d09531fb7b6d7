//! Pipeline error types.

use crate::StoreError;
use loom_intent::InvalidIntentSelection;
use loom_parser::ParseError;
use loom_core::InvariantError;
use std::fmt;

/// What failed a job.
#[derive(Debug)]
pub enum PipelineErrorKind {
    /// The request's spec payload could not be decoded.
    SpecDecode(String),
    /// Input could not be parsed; surfaced to the caller.
    Parse(ParseError),
    /// The request named an unknown intent.
    IntentSelection(InvalidIntentSelection),
    /// A parser produced an IR violating a structural invariant. A bug.
    Invariant(InvariantError),
    /// An artifact write failed; the pipeline aborts at the first one.
    Store(StoreError),
    /// The job was cancelled between operations.
    Cancelled,
}

/// A failed job: which stage, which job, and why.
#[derive(Debug)]
pub struct PipelineError {
    pub job_id: String,
    pub stage_id: u8,
    pub kind: PipelineErrorKind,
}

impl PipelineError {
    pub fn new(job_id: &str, stage_id: u8, kind: PipelineErrorKind) -> Self {
        Self {
            job_id: job_id.to_string(),
            stage_id,
            kind,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job {} failed at stage {}: ", self.job_id, self.stage_id)?;
        match &self.kind {
            PipelineErrorKind::SpecDecode(detail) => write!(f, "{}", detail),
            PipelineErrorKind::Parse(e) => write!(f, "{}", e),
            PipelineErrorKind::IntentSelection(e) => write!(f, "{}", e),
            PipelineErrorKind::Invariant(e) => write!(f, "internal invariant violation: {}", e),
            PipelineErrorKind::Store(e) => write!(f, "{}", e),
            PipelineErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for PipelineError {}
