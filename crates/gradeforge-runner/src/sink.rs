//! Per-submission feedback files.

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use gradeforge_core::traits::LogSink;

/// Writes each feedback line to a report file that never overwrites an
/// earlier one.
pub struct FileReportSink {
    path: PathBuf,
    writer: BufWriter<File>,
    failed: bool,
}

impl FileReportSink {
    /// Create `<report_dir>/<dir>_<stem>_feedback.txt`, or the first free
    /// `_feedback_<n>.txt` variant.
    pub fn create(report_dir: &Path, submission: &Path) -> Result<Self> {
        std::fs::create_dir_all(report_dir)
            .with_context(|| format!("failed to create report directory {}", report_dir.display()))?;

        let base = report_base_name(submission);
        let mut attempt = 0usize;
        loop {
            let name = if attempt == 0 {
                format!("{base}_feedback.txt")
            } else {
                format!("{base}_feedback_{attempt}.txt")
            };
            let path = report_dir.join(name);
            match File::options().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    tracing::debug!(report = %path.display(), "writing feedback");
                    return Ok(Self {
                        path,
                        writer: BufWriter::new(file),
                        failed: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to create report {}", path.display()))
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush the report and return its path. Fails if any line was lost.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer
            .flush()
            .with_context(|| format!("failed to write report {}", self.path.display()))?;
        if self.failed {
            anyhow::bail!("report {} is incomplete", self.path.display());
        }
        Ok(self.path)
    }
}

impl LogSink for FileReportSink {
    fn log(&mut self, message: &str) {
        if let Err(e) = writeln!(self.writer, "{message}") {
            if !self.failed {
                tracing::warn!(report = %self.path.display(), "failed to write feedback: {e}");
                self.failed = true;
            }
        }
    }
}

/// `<submission-dir>_<stem>`, or just `<stem>` for a bare file name.
pub fn report_base_name(submission: &Path) -> String {
    let stem = submission
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "submission".to_string());
    match submission
        .parent()
        .and_then(Path::file_name)
        .map(|d| d.to_string_lossy().into_owned())
    {
        Some(dir) => format!("{dir}_{stem}"),
        None => stem,
    }
}
