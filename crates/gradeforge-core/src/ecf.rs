//! Error carried forward.
//!
//! Once a test function finds mistakes, the symbols it declares as tested
//! are confirmed wrong and the hybrid implementation gets the master's
//! versions. Later test functions that depend on one of those symbols are
//! retried against the hybrid, so one bug is not penalized twice. Nothing is
//! ever un-confirmed or un-patched within a submission.

use std::collections::BTreeSet;

use crate::error::GradingError;
use crate::implementation::Implementation;

/// Which implementation a run of a test function uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// First run, against the plain submission.
    Normal,
    /// ECF retry, against the hybrid implementation.
    Retrying,
}

/// Per-submission ECF state.
#[derive(Debug, Default)]
pub struct EcfController {
    confirmed_wrong: BTreeSet<String>,
}

impl EcfController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirmed_wrong(&self) -> &BTreeSet<String> {
        &self.confirmed_wrong
    }

    /// Whether a mistaken run deserves a retry against the hybrid.
    pub fn should_retry(&self, attempt: Attempt, depends: &BTreeSet<String>) -> bool {
        attempt == Attempt::Normal && depends.iter().any(|d| self.confirmed_wrong.contains(d))
    }

    /// Confirm `tests` as wrong and patch them into `hybrid` from `master`.
    ///
    /// Names confirmed earlier are left alone. Returns the newly confirmed
    /// names.
    pub fn confirm(
        &mut self,
        tests: &BTreeSet<String>,
        master: &Implementation,
        hybrid: &mut Implementation,
    ) -> Result<Vec<String>, GradingError> {
        let mut newly = Vec::new();
        for name in tests {
            if self.confirmed_wrong.contains(name) {
                continue;
            }
            let patched = hybrid.patch_from(master, name)?;
            tracing::debug!(symbol = %name, patched, "confirmed wrong, patched into hybrid");
            self.confirmed_wrong.insert(name.clone());
            newly.push(name.clone());
        }
        Ok(newly)
    }
}
