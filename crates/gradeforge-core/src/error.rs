//! Grading error types.
//!
//! Student faults never show up here: they are part of the feedback. These
//! errors describe what the engine cannot recover from, split by whether the
//! whole grading run must stop.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a submission.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("'{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("'{}' is not a file", .0.display())]
    NotAFile(PathBuf),

    /// The file exists but no implementation adapter is registered for it.
    #[error("no implementation registered for '{}'", .0.display())]
    Unregistered(PathBuf),

    #[error("failed to read '{}': {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

/// Errors that stop grading.
#[derive(Debug, Error)]
pub enum GradingError {
    /// The submission run ended before yielding as many checks as the master.
    #[error(
        "test function '{test}' yielded too few checks for the submission \
         (master yielded {master}, submission stopped after {student})"
    )]
    TooFewChecks {
        test: String,
        master: usize,
        student: usize,
    },

    /// The submission run yielded checks past the end of the master run.
    #[error(
        "test function '{test}' yielded too many checks for the submission \
         (master yielded {master})"
    )]
    TooManyChecks { test: String, master: usize },

    /// The master implementation faulted, so the test function is broken.
    #[error("master implementation faulted in test function '{test}' at {location}:\n{detail}")]
    MasterFault {
        test: String,
        location: String,
        detail: String,
    },

    /// A test function declared a fixed name the master does not define.
    #[error("cannot patch '{symbol}': the master implementation does not define it")]
    UnknownSymbol { symbol: String },

    /// A test filter named a function that was never registered.
    #[error("no registered test function named '{0}'")]
    UnknownTest(String),

    #[error("failed to load submission: {0}")]
    Load(#[from] LoadError),

    #[error("setup hook failed for '{}': {message}", .path.display())]
    Setup { path: PathBuf, message: String },
}

impl GradingError {
    /// Returns `true` if this error is a grading-script defect that must
    /// abort the whole grading run, not just one submission.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, GradingError::Load(_) | GradingError::Setup { .. })
    }
}
