//! gradeforge-runner: Plumbing around the grading engine.
//!
//! Loads configuration, maps submission files to implementations, writes
//! per-submission feedback files and grades each submission on its own
//! blocking worker under a timeout.

pub mod config;
pub mod loader;
pub mod setup;
pub mod sink;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;

use gradeforge_core::error::GradingError;
use gradeforge_core::feedback::StdoutSink;
use gradeforge_core::report::{SubmissionRecord, SubmissionStatus, SubmissionSummary};
use gradeforge_core::tester::Tester;
use gradeforge_core::traits::{ImplementationLoader, LogSink, SubmissionRunner};

use crate::sink::FileReportSink;

/// Grades submissions in-process, one blocking worker per submission.
///
/// Every submission gets its own console, input queue and report sink, so
/// several can be graded at once.
pub struct LocalRunner {
    tester: Arc<Tester>,
    loader: Arc<dyn ImplementationLoader>,
    /// `None` writes feedback to standard output.
    report_dir: Option<PathBuf>,
    timeout: Duration,
    filter: Option<Vec<String>>,
}

impl LocalRunner {
    pub fn new(tester: Arc<Tester>, loader: Arc<dyn ImplementationLoader>) -> Self {
        Self {
            tester,
            loader,
            report_dir: None,
            timeout: Duration::from_secs(30),
            filter: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Write feedback files into `dir` instead of standard output.
    pub fn with_report_dir(mut self, dir: PathBuf) -> Self {
        self.report_dir = Some(dir);
        self
    }

    /// Only run the named test functions.
    pub fn with_filter(mut self, names: Vec<String>) -> Self {
        self.filter = if names.is_empty() { None } else { Some(names) };
        self
    }
}

#[async_trait]
impl SubmissionRunner for LocalRunner {
    async fn grade_submission(&self, path: &Path) -> Result<SubmissionRecord> {
        let start = Instant::now();
        let tester = Arc::clone(&self.tester);
        let loader = Arc::clone(&self.loader);
        let filter = self.filter.clone();
        let submission = path.to_path_buf();

        // Created up front so a timed-out record can still point at it.
        let sink = match &self.report_dir {
            Some(dir) => Some(FileReportSink::create(dir, path)?),
            None => None,
        };
        let partial_report = sink.as_ref().map(|sink| sink.path().to_path_buf());

        let task = tokio::task::spawn_blocking(move || {
            grade_blocking(&tester, loader.as_ref(), &submission, sink, filter.as_deref())
        });

        // A timed-out worker cannot be stopped; it is left to finish on its own
        // and may keep appending to the partial report.
        let (status, report_path) = match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined.context("grading worker panicked")??,
            Err(_) => {
                tracing::warn!(
                    submission = %path.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "grading timed out"
                );
                (
                    SubmissionStatus::TimedOut {
                        after_secs: self.timeout.as_secs(),
                    },
                    partial_report,
                )
            }
        };

        Ok(SubmissionRecord {
            submission: path.to_path_buf(),
            status,
            report_path,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

fn grade_blocking(
    tester: &Tester,
    loader: &dyn ImplementationLoader,
    submission: &Path,
    sink: Option<FileReportSink>,
    filter: Option<&[String]>,
) -> Result<(SubmissionStatus, Option<PathBuf>)> {
    match sink {
        Some(mut sink) => {
            let result = tester.grade_selected(submission, loader, &mut sink, filter);
            let status = classify(result, &mut sink)?;
            let path = sink.finish()?;
            Ok((status, Some(path)))
        }
        None => {
            let mut sink = StdoutSink;
            let result = tester.grade_selected(submission, loader, &mut sink, filter);
            Ok((classify(result, &mut sink)?, None))
        }
    }
}

/// Per-submission errors become a status; fatal ones stop the batch.
fn classify(
    result: Result<SubmissionSummary, GradingError>,
    sink: &mut dyn LogSink,
) -> Result<SubmissionStatus> {
    match result {
        Ok(summary) => Ok(SubmissionStatus::Graded { summary }),
        Err(e) if !e.is_fatal() => {
            sink.log(&format!("\nCould not grade this submission: {e}"));
            Ok(SubmissionStatus::LoadFailed {
                reason: e.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradeforge_core::implementation::Implementation;
    use gradeforge_core::tester::TestFunction;
    use gradeforge_core::value::Value;
    use gradeforge_core::{args, Check};

    use crate::loader::RegistryLoader;

    fn counter(step: i64) -> Implementation {
        Implementation::new("counter").function("add_one", move |_, args| {
            let x = args.first().and_then(Value::as_int).unwrap_or(0);
            Ok(Value::Int(x + step))
        })
    }

    fn tester() -> Arc<Tester> {
        let mut tester = Tester::new(counter(1));
        tester.register(
            TestFunction::new("test_add_one", |t| {
                t.check(Check::expr("add_one(1)"), |cx| cx.call("add_one", args![1]));
                Ok(())
            })
            .tests(["add_one"]),
        );
        Arc::new(tester)
    }

    fn submission(root: &Path, dir: &str) -> PathBuf {
        let dir = root.join(dir);
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("foo.rs");
        std::fs::write(&file, "").unwrap();
        file
    }

    fn loader() -> Arc<dyn ImplementationLoader> {
        Arc::new(
            RegistryLoader::new()
                .register("good", || counter(1))
                .register("bad", || counter(2))
                .register("hang", || {
                    Implementation::new("hang").function("add_one", |_, _| {
                        std::thread::sleep(Duration::from_secs(2));
                        Ok(Value::Int(2))
                    })
                }),
        )
    }

    #[tokio::test]
    async fn grades_into_report_file() {
        let root = tempfile::tempdir().unwrap();
        let file = submission(root.path(), "bad");
        let reports = root.path().join("reports");
        let runner = LocalRunner::new(tester(), loader()).with_report_dir(reports.clone());

        let record = runner.grade_submission(&file).await.unwrap();
        let summary = record.summary().unwrap();
        assert_eq!(summary.total_mistakes(), 1);

        let report_path = record.report_path.unwrap();
        assert_eq!(report_path, reports.join("bad_foo_feedback.txt"));
        let text = std::fs::read_to_string(report_path).unwrap();
        assert!(text.contains("Automated testing for"));
        assert!(text.contains("add_one(1) should be 2, but it is 3"));
    }

    #[tokio::test]
    async fn missing_submission_is_recorded() {
        let root = tempfile::tempdir().unwrap();
        let runner = LocalRunner::new(tester(), loader()).with_report_dir(root.path().join("reports"));
        let record = runner
            .grade_submission(&root.path().join("ghost").join("foo.rs"))
            .await
            .unwrap();
        match record.status {
            SubmissionStatus::LoadFailed { reason } => assert!(reason.contains("does not exist")),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_submission_times_out() {
        let root = tempfile::tempdir().unwrap();
        let file = submission(root.path(), "hang");
        let runner = LocalRunner::new(tester(), loader())
            .with_report_dir(root.path().join("reports"))
            .with_timeout(Duration::from_millis(100));
        let record = runner.grade_submission(&file).await.unwrap();
        assert!(matches!(record.status, SubmissionStatus::TimedOut { .. }));
        let partial = record.report_path.unwrap();
        assert_eq!(partial, root.path().join("reports").join("hang_foo_feedback.txt"));
        assert!(partial.exists());
    }

    #[tokio::test]
    async fn fatal_errors_propagate() {
        let root = tempfile::tempdir().unwrap();
        let file = submission(root.path(), "good");
        let runner = LocalRunner::new(tester(), loader())
            .with_report_dir(root.path().join("reports"))
            .with_filter(vec!["test_nope".to_string()]);
        let err = runner.grade_submission(&file).await.unwrap_err();
        assert!(err.to_string().contains("test_nope"));
    }
}
