//! Seams between the engine and its collaborators.
//!
//! The engine performs no I/O of its own: feedback goes through a
//! [`LogSink`], submissions come from an [`ImplementationLoader`], and batch
//! execution is delegated to a [`SubmissionRunner`].

use std::path::Path;

use async_trait::async_trait;

use crate::error::LoadError;
use crate::implementation::Implementation;
use crate::report::SubmissionRecord;

/// Receives feedback lines for one submission.
pub trait LogSink {
    fn log(&mut self, message: &str);
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn log(&mut self, message: &str) {
        (**self).log(message);
    }
}

impl LogSink for Box<dyn LogSink + Send> {
    fn log(&mut self, message: &str) {
        (**self).log(message);
    }
}

/// Turns a submission file into an implementation.
pub trait ImplementationLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Implementation, LoadError>;
}

/// Grades one submission end to end.
#[async_trait]
pub trait SubmissionRunner: Send + Sync {
    /// Grade the submission at `path`.
    ///
    /// Per-submission problems (load failures, timeouts) are reported in the
    /// returned record. An `Err` means the grading run itself is broken and
    /// the batch must stop.
    async fn grade_submission(&self, path: &Path) -> anyhow::Result<SubmissionRecord>;
}
