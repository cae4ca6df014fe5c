//! Batch orchestration.
//!
//! Drives a [`SubmissionRunner`] over many submissions. Records come back in
//! submission order whatever the parallelism; the first fatal error stops
//! the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::stream::{self, StreamExt};
use uuid::Uuid;

use crate::report::{BatchReport, SubmissionRecord, SubmissionStatus};
use crate::traits::SubmissionRunner;

/// Configuration for the batch engine.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum submissions graded at once. 1 grades strictly one after
    /// another.
    pub parallelism: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { parallelism: 1 }
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_submission_start(&self, path: &Path);
    fn on_submission_complete(&self, record: &SubmissionRecord);
    fn on_batch_complete(&self, total: usize, graded: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_submission_start(&self, _: &Path) {}
    fn on_submission_complete(&self, _: &SubmissionRecord) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: Duration) {}
}

/// Grades a batch of submissions.
pub struct BatchEngine {
    runner: Arc<dyn SubmissionRunner>,
    config: BatchConfig,
}

impl BatchEngine {
    pub fn new(runner: Arc<dyn SubmissionRunner>, config: BatchConfig) -> Self {
        Self { runner, config }
    }

    /// Grade every submission in `paths`.
    ///
    /// Returns an error, and stops grading, as soon as any submission hits a
    /// fatal grading error.
    pub async fn run(&self, paths: &[PathBuf], progress: &dyn ProgressReporter) -> Result<BatchReport> {
        let start = Instant::now();
        let id = Uuid::new_v4();
        let created_at = chrono::Utc::now();
        let parallelism = self.config.parallelism.max(1);

        tracing::info!(%id, submissions = paths.len(), parallelism, "starting batch");

        let mut pending = stream::iter(paths.iter().cloned())
            .map(|path| {
                let runner = Arc::clone(&self.runner);
                async move {
                    progress.on_submission_start(&path);
                    let result = runner.grade_submission(&path).await;
                    (path, result)
                }
            })
            .buffered(parallelism);

        let mut records = Vec::with_capacity(paths.len());
        while let Some((path, result)) = pending.next().await {
            match result {
                Ok(record) => {
                    if let SubmissionStatus::LoadFailed { reason } = &record.status {
                        tracing::warn!(submission = %path.display(), "{reason}");
                    }
                    progress.on_submission_complete(&record);
                    records.push(record);
                }
                Err(e) => {
                    tracing::error!("grading stopped at {}: {e:#}", path.display());
                    return Err(e.context(format!("grading stopped at {}", path.display())));
                }
            }
        }

        let elapsed = start.elapsed();
        let report = BatchReport {
            id,
            created_at,
            records,
            duration_ms: elapsed.as_millis() as u64,
        };
        progress.on_batch_complete(paths.len(), report.graded(), elapsed);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GradingError;
    use crate::report::SubmissionSummary;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fails fatally on paths containing "broken", reports load failures for
    /// paths containing "missing", and grades everything else.
    struct ScriptedRunner {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SubmissionRunner for ScriptedRunner {
        async fn grade_submission(&self, path: &Path) -> Result<SubmissionRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let name = path.to_string_lossy();
            if name.contains("slow") {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            if name.contains("broken") {
                return Err(GradingError::TooManyChecks {
                    test: "test_add_one".into(),
                    master: 1,
                }
                .into());
            }
            let status = if name.contains("missing") {
                SubmissionStatus::LoadFailed {
                    reason: format!("'{name}' does not exist"),
                }
            } else {
                SubmissionStatus::Graded {
                    summary: SubmissionSummary {
                        submission: path.to_path_buf(),
                        max_points: None,
                        tests: vec![],
                        confirmed_wrong: vec![],
                    },
                }
            };
            Ok(SubmissionRecord {
                submission: path.to_path_buf(),
                status,
                report_path: None,
                duration_ms: 0,
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        completed: Mutex<Vec<PathBuf>>,
        graded: AtomicUsize,
    }

    impl ProgressReporter for Recorder {
        fn on_submission_start(&self, _: &Path) {}
        fn on_submission_complete(&self, record: &SubmissionRecord) {
            self.completed.lock().unwrap().push(record.submission.clone());
        }
        fn on_batch_complete(&self, _: usize, graded: usize, _: Duration) {
            self.graded.store(graded, Ordering::SeqCst);
        }
    }

    fn engine(parallelism: usize) -> (Arc<ScriptedRunner>, BatchEngine) {
        let runner = Arc::new(ScriptedRunner {
            calls: AtomicUsize::new(0),
        });
        let engine = BatchEngine::new(runner.clone(), BatchConfig { parallelism });
        (runner, engine)
    }

    #[tokio::test]
    async fn load_failures_do_not_stop_the_batch() {
        let (_, engine) = engine(1);
        let paths = vec![PathBuf::from("a/foo.rs"), PathBuf::from("missing/foo.rs"), PathBuf::from("c/foo.rs")];
        let recorder = Recorder::default();
        let report = engine.run(&paths, &recorder).await.unwrap();
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.graded(), 2);
        assert_eq!(recorder.graded.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fatal_error_stops_the_batch() {
        let (runner, engine) = engine(1);
        let paths = vec![PathBuf::from("a/foo.rs"), PathBuf::from("broken/foo.rs"), PathBuf::from("c/foo.rs")];
        let err = engine.run(&paths, &NoopReporter).await.unwrap_err();
        assert!(format!("{err:#}").contains("too many checks"));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn parallel_batches_keep_submission_order() {
        let (_, engine) = engine(4);
        let paths = vec![PathBuf::from("slow/foo.rs"), PathBuf::from("b/foo.rs"), PathBuf::from("c/foo.rs")];
        let recorder = Recorder::default();
        let report = engine.run(&paths, &recorder).await.unwrap();
        let order: Vec<_> = report.records.iter().map(|r| r.submission.clone()).collect();
        assert_eq!(order, paths);
        assert_eq!(*recorder.completed.lock().unwrap(), paths);
    }
}
