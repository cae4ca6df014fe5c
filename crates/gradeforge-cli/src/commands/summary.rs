//! The `summary` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::Table;

use gradeforge_core::report::{BatchReport, SubmissionStatus};

pub fn execute(report_path: &Path) -> Result<()> {
    let report = BatchReport::load_json(report_path)?;

    println!(
        "Batch {} ({}), {} submission(s), {} graded\n",
        report.id,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.records.len(),
        report.graded()
    );
    println!("{}", summary_table(&report));
    Ok(())
}

/// One row per submission, in batch order.
pub fn summary_table(report: &BatchReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Submission",
        "Status",
        "Clean",
        "Mistakes",
        "ECF solved",
        "Confirmed wrong",
        "Feedback",
    ]);

    for record in &report.records {
        let feedback = record
            .report_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());

        let row = match &record.status {
            SubmissionStatus::Graded { summary } => vec![
                record.submission.display().to_string(),
                "graded".to_string(),
                format!("{}/{}", summary.passed(), summary.scored()),
                summary.total_mistakes().to_string(),
                summary.tests.iter().filter(|t| t.solved_by_ecf()).count().to_string(),
                if summary.confirmed_wrong.is_empty() {
                    "-".to_string()
                } else {
                    summary.confirmed_wrong.join(", ")
                },
                feedback,
            ],
            SubmissionStatus::LoadFailed { .. } => vec![
                record.submission.display().to_string(),
                "not loaded".to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                feedback,
            ],
            SubmissionStatus::TimedOut { after_secs } => vec![
                record.submission.display().to_string(),
                format!("timed out ({after_secs}s)"),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                feedback,
            ],
        };
        table.add_row(row);
    }

    table
}
