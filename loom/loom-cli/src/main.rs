//! Testloom command line.
//!
//! Reads a specification or source file, runs the generation pipeline and
//! writes artifacts (IR, intents, payloads, fixture plan, test files) to an
//! output directory.

use clap::Parser;
use loom_pipeline::{
    FsStore, GenerationRequest, PipelineDriver, ProgressEvent, ProgressSink, StageStatus,
};
use loom_core::{SourceDialect, TargetFramework};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "loom",
    about = "Generate executable test suites from API and source specifications"
)]
struct Args {
    /// Specification or source file to generate tests from.
    spec: PathBuf,

    /// Input dialect: http-contract, dynamic-source or typed-source.
    #[arg(long)]
    dialect: SourceDialect,

    /// Output framework: http-sync, http-async or function-direct.
    #[arg(long, default_value = "http-sync")]
    framework: TargetFramework,

    /// Base URL substituted into HTTP tests.
    #[arg(long)]
    base_url: Option<String>,

    /// Comma-separated intent allow-list; omit to generate everything.
    #[arg(long)]
    intents: Option<String>,

    /// Output directory for job artifacts.
    #[arg(long, default_value = "generated")]
    out: PathBuf,

    /// Job id; defaults to the spec file stem.
    #[arg(long)]
    job_id: Option<String>,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

/// Prints stage transitions as they happen.
struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn emit(&self, event: ProgressEvent) {
        match event.status {
            StageStatus::Running => {
                println!("[{:>3}%] stage {}/6 running", event.progress_percent, event.stage_id)
            }
            StageStatus::Completed => {
                println!("[{:>3}%] stage {}/6 completed", event.progress_percent, event.stage_id)
            }
            StageStatus::Failed => {
                println!("[{:>3}%] stage {}/6 FAILED", event.progress_percent, event.stage_id)
            }
            StageStatus::Pending => {}
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let source = match std::fs::read_to_string(&args.spec) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read {}: {}", args.spec.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut request = GenerationRequest::from_source(&source, args.dialect, args.framework);
    if let Some(base_url) = &args.base_url {
        request = request.with_base_url(base_url);
    }
    if let Some(intents) = &args.intents {
        request = request.with_target_intents(
            intents.split(',').map(|s| s.trim().to_string()).collect(),
        );
    }

    let job_id = args.job_id.clone().unwrap_or_else(|| {
        args.spec
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "job".to_string())
    });

    let store = FsStore::new(&args.out);
    let sink = StdoutSink;
    let driver = PipelineDriver::new(&store, &sink);

    match driver.run(&job_id, &request) {
        Ok(outcome) => {
            println!(
                "generated {} artifacts under {}",
                outcome.written.len(),
                args.out.join(&job_id).display()
            );
            if outcome.is_partial() {
                for failure in &outcome.failed_operations {
                    eprintln!(
                        "warning: {} failed to render: {}",
                        failure.operation_id, failure.detail
                    );
                }
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
