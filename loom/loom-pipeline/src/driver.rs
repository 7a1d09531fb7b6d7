//! The pipeline driver.
//!
//! Sequences the six stages, persists an artifact at every boundary, and
//! emits progress events. Stages run in order because each consumes the
//! previous stage's full output; within the intent, payload and render
//! stages the per-operation work fans out across a worker pool and is
//! collected back in source order, so artifacts are byte-stable no matter
//! the worker count.

use crate::{
    percent_after, ArtifactStore, GenerationRequest, PipelineError, PipelineErrorKind,
    ProgressEvent, ProgressSink, StageStatus, STAGE_COUNT, STAGE_ENHANCE, STAGE_FIXTURES,
    STAGE_INTENTS, STAGE_PARSE, STAGE_PAYLOADS, STAGE_RENDER,
};
use loom_enhance::{enhance_happy_paths, CircuitBreaker, EnhancePolicy, Provider};
use loom_fixture::{analyze, compile, FixtureProgram, SetupPlan};
use loom_intent::{generate_intents, Intent, IntentSelection};
use loom_payload::{generate_payloads, Payload};
use loom_core::{SourceDialect, Specification};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An operation whose file failed to render. The job still completes.
#[derive(Debug, Clone, Serialize)]
pub struct FailedOperation {
    pub operation_id: String,
    pub detail: String,
}

/// What a finished job produced.
#[derive(Debug)]
pub struct JobOutcome {
    pub job_id: String,
    /// Artifact paths written, in write order.
    pub written: Vec<String>,
    /// Operations whose rendering failed; empty on full success.
    pub failed_operations: Vec<FailedOperation>,
}

impl JobOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failed_operations.is_empty()
    }
}

/// Drives generation jobs against a store and a progress sink.
///
/// The driver owns the circuit breaker so its state spans jobs; the
/// provider pool and the store are shared externally.
pub struct PipelineDriver<'a> {
    store: &'a dyn ArtifactStore,
    sink: &'a dyn ProgressSink,
    provider: Option<&'a dyn Provider>,
    breaker: CircuitBreaker,
    enhance_policy: EnhancePolicy,
    cancel: Arc<AtomicBool>,
}

impl<'a> PipelineDriver<'a> {
    pub fn new(store: &'a dyn ArtifactStore, sink: &'a dyn ProgressSink) -> Self {
        Self {
            store,
            sink,
            provider: None,
            breaker: CircuitBreaker::default(),
            enhance_policy: EnhancePolicy::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_provider(mut self, provider: &'a dyn Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_enhance_policy(mut self, policy: EnhancePolicy) -> Self {
        self.enhance_policy = policy;
        self
    }

    /// Flag observed between operations; setting it cancels the job.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run one generation job to completion.
    pub fn run(
        &self,
        job_id: &str,
        request: &GenerationRequest,
    ) -> Result<JobOutcome, PipelineError> {
        let _span = tracing::info_span!("generation_job", job_id).entered();
        let mut written = Vec::new();

        for stage in 1..=STAGE_COUNT {
            self.emit(job_id, stage, StageStatus::Pending, percent_after(stage - 1));
        }

        // Input validation happens before any artifact is written.
        let selection = match &request.target_intents {
            Some(names) => IntentSelection::from_names(names).map_err(|e| {
                self.fail(job_id, STAGE_INTENTS, PipelineErrorKind::IntentSelection(e))
            })?,
            None => IntentSelection::all(),
        };

        // Stage 1: parse.
        self.stage_start(job_id, STAGE_PARSE);
        let source = request.decode_spec().map_err(|detail| {
            self.fail(job_id, STAGE_PARSE, PipelineErrorKind::SpecDecode(detail))
        })?;
        let spec = loom_parser::parse(&source, request.source_dialect)
            .map_err(|e| self.fail(job_id, STAGE_PARSE, PipelineErrorKind::Parse(e)))?;
        spec.validate()
            .map_err(|e| self.fail(job_id, STAGE_PARSE, PipelineErrorKind::Invariant(e)))?;
        self.persist(job_id, STAGE_PARSE, "1_ir.json", &spec, &mut written)?;
        self.stage_done(job_id, STAGE_PARSE);

        // Stage 2: intents.
        self.stage_start(job_id, STAGE_INTENTS);
        let per_op_intents = self.parallel_per_operation(&spec, |op| {
            generate_intents(op, request.source_dialect, &selection)
        });
        self.check_cancelled(job_id, STAGE_INTENTS)?;
        let all_intents: Vec<&Intent> = per_op_intents.iter().flatten().collect();
        self.persist(job_id, STAGE_INTENTS, "2_intents.json", &all_intents, &mut written)?;
        drop(all_intents);
        self.stage_done(job_id, STAGE_INTENTS);

        // Stage 3: payloads. Per-operation synthesis stays single-threaded
        // so intent order is preserved within each slot.
        self.stage_start(job_id, STAGE_PAYLOADS);
        let per_op_payloads: Vec<Vec<Payload>> = spec
            .operations
            .par_iter()
            .zip(per_op_intents.par_iter())
            .map(|(op, intents)| {
                if self.cancel.load(Ordering::Relaxed) {
                    return Vec::new();
                }
                generate_payloads(op, intents)
            })
            .collect();
        self.check_cancelled(job_id, STAGE_PAYLOADS)?;
        let raw_payloads: Vec<Payload> = per_op_payloads.into_iter().flatten().collect();
        self.persist(
            job_id,
            STAGE_PAYLOADS,
            "3_payloads_raw.json",
            &raw_payloads,
            &mut written,
        )?;
        self.stage_done(job_id, STAGE_PAYLOADS);

        // Stage 4: enhancement, best-effort and optional.
        self.stage_start(job_id, STAGE_ENHANCE);
        let wants_enhancement = request
            .llm_config
            .as_ref()
            .and_then(|c| c.payload_enhancement.as_ref())
            .is_some();
        let payloads = match (wants_enhancement, self.provider) {
            (true, Some(provider)) => {
                let enhanced = enhance_happy_paths(
                    &raw_payloads,
                    &spec,
                    provider,
                    &self.breaker,
                    &self.enhance_policy,
                );
                self.persist(
                    job_id,
                    STAGE_ENHANCE,
                    "3_payloads_enhanced.json",
                    &enhanced,
                    &mut written,
                )?;
                enhanced
            }
            _ => raw_payloads,
        };
        self.stage_done(job_id, STAGE_ENHANCE);

        // Stage 5: fixture planning, HTTP dialect only.
        self.stage_start(job_id, STAGE_FIXTURES);
        let programs: Vec<Option<FixtureProgram>> =
            if request.source_dialect == SourceDialect::HttpContract {
                let analyses = analyze(&spec);
                let plans: Vec<SetupPlan> = analyses
                    .iter()
                    .map(|a| loom_fixture::plan(a, &spec, &payloads))
                    .collect();
                self.persist(
                    job_id,
                    STAGE_FIXTURES,
                    "4_fixture_plan.json",
                    &plans,
                    &mut written,
                )?;
                plans
                    .iter()
                    .map(|p| {
                        let program = compile(p);
                        (!program.is_empty()).then_some(program)
                    })
                    .collect()
            } else {
                spec.operations.iter().map(|_| None).collect()
            };
        self.stage_done(job_id, STAGE_FIXTURES);

        // Stage 6: render, one file per operation. A failed operation is
        // reported and skipped; the rest of the job completes.
        self.stage_start(job_id, STAGE_RENDER);
        let rendered: Vec<Result<(String, String), FailedOperation>> = spec
            .operations
            .par_iter()
            .enumerate()
            .map(|(i, op)| {
                if self.cancel.load(Ordering::Relaxed) {
                    return Err(FailedOperation {
                        operation_id: op.id.clone(),
                        detail: "cancelled".to_string(),
                    });
                }
                let op_payloads: Vec<Payload> = payloads
                    .iter()
                    .filter(|p| p.operation_id == op.id)
                    .cloned()
                    .collect();
                loom_render::render(
                    op,
                    &op_payloads,
                    programs[i].as_ref(),
                    request.target_framework,
                    request.effective_base_url(),
                )
                .map(|text| {
                    let name = loom_render::test_file_name(&op.id, request.target_framework);
                    (format!("tests/{}", name), text)
                })
                .map_err(|e| FailedOperation {
                    operation_id: op.id.clone(),
                    detail: e.to_string(),
                })
            })
            .collect();
        self.check_cancelled(job_id, STAGE_RENDER)?;

        let mut failed_operations = Vec::new();
        for result in rendered {
            match result {
                Ok((path, text)) => {
                    self.store.put(job_id, &path, text.as_bytes()).map_err(|e| {
                        self.fail(job_id, STAGE_RENDER, PipelineErrorKind::Store(e))
                    })?;
                    written.push(path);
                }
                Err(failure) => {
                    tracing::warn!(
                        operation_id = %failure.operation_id,
                        detail = %failure.detail,
                        "operation failed to render"
                    );
                    failed_operations.push(failure);
                }
            }
        }
        self.stage_done(job_id, STAGE_RENDER);

        Ok(JobOutcome {
            job_id: job_id.to_string(),
            written,
            failed_operations,
        })
    }

    // ==================== Stage plumbing ====================

    /// Fan work out per operation; results come back in source order.
    fn parallel_per_operation<T, F>(&self, spec: &Specification, f: F) -> Vec<T>
    where
        T: Default + Send,
        F: Fn(&loom_core::Operation) -> T + Send + Sync,
    {
        spec.operations
            .par_iter()
            .map(|op| {
                if self.cancel.load(Ordering::Relaxed) {
                    return T::default();
                }
                f(op)
            })
            .collect()
    }

    fn check_cancelled(&self, job_id: &str, stage: u8) -> Result<(), PipelineError> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(self.fail(job_id, stage, PipelineErrorKind::Cancelled));
        }
        Ok(())
    }

    fn persist<T: Serialize>(
        &self,
        job_id: &str,
        stage: u8,
        path: &str,
        value: &T,
        written: &mut Vec<String>,
    ) -> Result<(), PipelineError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| {
            self.fail(
                job_id,
                stage,
                PipelineErrorKind::Store(crate::StoreError {
                    path: path.to_string(),
                    detail: e.to_string(),
                }),
            )
        })?;
        self.store
            .put(job_id, path, &bytes)
            .map_err(|e| self.fail(job_id, stage, PipelineErrorKind::Store(e)))?;
        written.push(path.to_string());
        Ok(())
    }

    fn emit(&self, job_id: &str, stage_id: u8, status: StageStatus, percent: u8) {
        self.sink.emit(ProgressEvent {
            job_id: job_id.to_string(),
            stage_id,
            status,
            progress_percent: percent,
        });
    }

    fn stage_start(&self, job_id: &str, stage: u8) {
        tracing::info!(stage, "stage running");
        self.emit(job_id, stage, StageStatus::Running, percent_after(stage - 1));
    }

    fn stage_done(&self, job_id: &str, stage: u8) {
        tracing::info!(stage, "stage completed");
        self.emit(job_id, stage, StageStatus::Completed, percent_after(stage));
    }

    /// Mark the job failed: emit the final event, keep partial artifacts.
    fn fail(&self, job_id: &str, stage: u8, kind: PipelineErrorKind) -> PipelineError {
        self.emit(job_id, stage, StageStatus::Failed, percent_after(stage - 1));
        let error = PipelineError::new(job_id, stage, kind);
        tracing::error!(%error, "job failed");
        error
    }
}
