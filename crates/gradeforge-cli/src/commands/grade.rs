//! The `grade` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use gradeforge_core::engine::{BatchConfig, BatchEngine, ProgressReporter};
use gradeforge_core::reconcile::LogCorrect;
use gradeforge_core::report::{SubmissionRecord, SubmissionStatus};
use gradeforge_core::tester::Tester;
use gradeforge_core::traits::ImplementationLoader;
use gradeforge_runner::config::load_config_from;
use gradeforge_runner::LocalRunner;

use super::summary::summary_table;

/// Options for the `grade` subcommand, already merged from the command line.
pub struct GradeArgs {
    pub submissions: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
    pub stdout: bool,
    pub timeout: Option<u64>,
    pub parallelism: Option<usize>,
    pub tests: Vec<String>,
    pub log_correct: Option<LogCorrect>,
    pub json: Option<PathBuf>,
}

/// Progress reporter that prints one line per submission to stderr.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_submission_start(&self, path: &Path) {
        eprintln!("  Grading {}...", path.display());
    }

    fn on_submission_complete(&self, record: &SubmissionRecord) {
        let path = record.submission.display();
        match &record.status {
            SubmissionStatus::Graded { summary } => eprintln!(
                "  Graded {path}: {}/{} test functions clean, {} mistake(s) ({}ms)",
                summary.passed(),
                summary.scored(),
                summary.total_mistakes(),
                record.duration_ms
            ),
            SubmissionStatus::LoadFailed { reason } => {
                eprintln!("  Skipped {path}: {reason}")
            }
            SubmissionStatus::TimedOut { after_secs } => {
                eprintln!("  Timed out {path} after {after_secs}s")
            }
        }
    }

    fn on_batch_complete(&self, total: usize, graded: usize, elapsed: Duration) {
        eprintln!(
            "\nGraded {graded} of {total} submission(s) in {:.1}s",
            elapsed.as_secs_f64()
        );
    }
}

pub fn execute(mut tester: Tester, loader: Arc<dyn ImplementationLoader>, args: GradeArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;

    let timeout_secs = args.timeout.unwrap_or(config.timeout_secs);
    anyhow::ensure!(timeout_secs > 0, "timeout must be at least 1 second");
    let mut parallelism = args.parallelism.unwrap_or(config.parallelism);
    anyhow::ensure!(parallelism > 0, "parallelism must be at least 1");

    let to_stdout = args.stdout || config.stdout_reports;
    if to_stdout && parallelism > 1 {
        tracing::warn!("feedback goes to stdout; grading one submission at a time");
        parallelism = 1;
    }

    if let Some(log_correct) = args.log_correct.or(config.log_correct) {
        tester.set_log_correct(log_correct);
    }

    let report_dir = args.report_dir.unwrap_or(config.report_dir);
    let mut runner = LocalRunner::new(Arc::new(tester), loader)
        .with_timeout(Duration::from_secs(timeout_secs))
        .with_filter(args.tests);
    if !to_stdout {
        runner = runner.with_report_dir(report_dir.clone());
    }

    eprintln!(
        "Grading {} submission(s) (parallelism {parallelism}, timeout {timeout_secs}s)\n",
        args.submissions.len()
    );

    // Built by hand so that a worker stuck past its timeout does not keep the
    // process alive at shutdown.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let engine = BatchEngine::new(Arc::new(runner), BatchConfig { parallelism });
    let result = runtime.block_on(engine.run(&args.submissions, &ConsoleReporter));
    runtime.shutdown_background();
    let report = result?;

    eprintln!();
    eprintln!("{}", summary_table(&report));

    let json_path = match args.json {
        Some(path) => Some(path),
        None if !to_stdout => Some(report_dir.join(format!(
            "batch-{}.json",
            report.created_at.format("%Y%m%d-%H%M%S")
        ))),
        None => None,
    };
    if let Some(path) = json_path {
        report.save_json(&path)?;
        eprintln!("Batch report saved to: {}", path.display());
    }

    Ok(())
}
