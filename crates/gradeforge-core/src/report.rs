//! Grading summaries with JSON persistence.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one test function for one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub name: String,
    /// Manual test functions are never scored automatically.
    #[serde(default)]
    pub manual: bool,
    /// Mistakes found in the first run.
    pub mistakes: usize,
    /// Whether the submission run faulted outside a check.
    #[serde(default)]
    pub aborted: bool,
    /// Whether an ECF retry against the hybrid implementation happened.
    #[serde(default)]
    pub retried: bool,
    /// Mistakes found in the retry, when there was one.
    #[serde(default)]
    pub retry_mistakes: Option<usize>,
}

impl TestOutcome {
    pub(crate) fn manual(name: &str) -> Self {
        Self {
            name: name.to_string(),
            manual: true,
            mistakes: 0,
            aborted: false,
            retried: false,
            retry_mistakes: None,
        }
    }

    /// The retry came back clean, so the mistakes were carried forward from
    /// an earlier bug.
    pub fn solved_by_ecf(&self) -> bool {
        self.retry_mistakes == Some(0)
    }

    pub fn passed(&self) -> bool {
        !self.manual && self.mistakes == 0
    }
}

/// Everything one invocation of the tester found for a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionSummary {
    pub submission: PathBuf,
    #[serde(default)]
    pub max_points: Option<u32>,
    pub tests: Vec<TestOutcome>,
    /// Symbols confirmed wrong by the end of the run, sorted.
    pub confirmed_wrong: Vec<String>,
}

impl SubmissionSummary {
    pub fn total_mistakes(&self) -> usize {
        self.tests.iter().map(|t| t.mistakes).sum()
    }

    /// Test functions with no mistakes, manual ones excluded.
    pub fn passed(&self) -> usize {
        self.tests.iter().filter(|t| t.passed()).count()
    }

    pub fn scored(&self) -> usize {
        self.tests.iter().filter(|t| !t.manual).count()
    }
}

/// How grading one submission ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionStatus {
    Graded { summary: SubmissionSummary },
    LoadFailed { reason: String },
    TimedOut { after_secs: u64 },
}

/// One submission's entry in a batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub submission: PathBuf,
    pub status: SubmissionStatus,
    /// Where the feedback was written, if it went to a file.
    #[serde(default)]
    pub report_path: Option<PathBuf>,
    pub duration_ms: u64,
}

impl SubmissionRecord {
    pub fn summary(&self) -> Option<&SubmissionSummary> {
        match &self.status {
            SubmissionStatus::Graded { summary } => Some(summary),
            _ => None,
        }
    }
}

/// A complete grading run over many submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the batch started.
    pub created_at: DateTime<Utc>,
    /// Records in submission order.
    pub records: Vec<SubmissionRecord>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn graded(&self) -> usize {
        self.records.iter().filter(|r| r.summary().is_some()).count()
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: BatchReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> SubmissionSummary {
        SubmissionSummary {
            submission: PathBuf::from("flc37/foo.rs"),
            max_points: Some(10),
            tests: vec![
                TestOutcome {
                    name: "test_add_one".into(),
                    manual: false,
                    mistakes: 2,
                    aborted: false,
                    retried: false,
                    retry_mistakes: None,
                },
                TestOutcome {
                    name: "test_add_two".into(),
                    manual: false,
                    mistakes: 1,
                    aborted: false,
                    retried: true,
                    retry_mistakes: Some(0),
                },
                TestOutcome::manual("test_style"),
            ],
            confirmed_wrong: vec!["add_one".into()],
        }
    }

    #[test]
    fn summary_counts() {
        let s = summary();
        assert_eq!(s.total_mistakes(), 3);
        assert_eq!(s.passed(), 0);
        assert_eq!(s.scored(), 2);
        assert!(s.tests[1].solved_by_ecf());
        assert!(!s.tests[0].solved_by_ecf());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("batch.json");
        let report = BatchReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            records: vec![
                SubmissionRecord {
                    submission: PathBuf::from("flc37/foo.rs"),
                    status: SubmissionStatus::Graded { summary: summary() },
                    report_path: Some(PathBuf::from("reports/flc37_foo_feedback.txt")),
                    duration_ms: 12,
                },
                SubmissionRecord {
                    submission: PathBuf::from("zz99/foo.rs"),
                    status: SubmissionStatus::TimedOut { after_secs: 5 },
                    report_path: None,
                    duration_ms: 5000,
                },
            ],
            duration_ms: 5012,
        };
        report.save_json(&path).unwrap();

        let loaded = BatchReport::load_json(&path).unwrap();
        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.records, report.records);
        assert_eq!(loaded.graded(), 1);
    }

    #[test]
    fn status_is_tagged() {
        let record = SubmissionRecord {
            submission: PathBuf::from("a/foo.rs"),
            status: SubmissionStatus::LoadFailed {
                reason: "'a/foo.rs' does not exist".into(),
            },
            report_path: None,
            duration_ms: 0,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"]["kind"], "load_failed");
        assert_eq!(json["status"]["reason"], "'a/foo.rs' does not exist");
    }

    #[test]
    fn load_missing_file_has_context() {
        let err = BatchReport::load_json(Path::new("/nonexistent/batch.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read report"));
    }
}
