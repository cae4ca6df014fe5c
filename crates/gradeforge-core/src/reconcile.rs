//! Pairing the master run's checks with the submission run's checks.
//!
//! The master run is fully materialized before the submission stream is
//! consumed. Pairing is strictly positional: the i-th check of the
//! submission is compared against the i-th check of the master, whatever
//! their expressions say.

use serde::{Deserialize, Serialize};

use crate::check::Check;
use crate::error::GradingError;
use crate::fault::Fault;
use crate::value::Value;

/// Which correct results to mention in feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCorrect {
    #[default]
    Nothing,
    Values,
    Output,
    Both,
}

impl LogCorrect {
    fn values(self) -> bool {
        matches!(self, LogCorrect::Values | LogCorrect::Both)
    }

    fn output(self) -> bool {
        matches!(self, LogCorrect::Output | LogCorrect::Both)
    }
}

/// Everything one run of a test function produced.
#[derive(Debug)]
pub struct RunRecord {
    pub checks: Vec<Check>,
    /// `Err` when the test function stopped on a fault outside any check.
    pub outcome: Result<(), Fault>,
}

impl RunRecord {
    pub fn stream(self) -> CheckStream {
        CheckStream {
            checks: self.checks.into_iter(),
            outcome: Some(self.outcome),
            yielded: 0,
        }
    }
}

/// What pulling the next element of a run produced.
#[derive(Debug)]
pub enum Pulled {
    Check(Check),
    /// The run raised before yielding another check.
    Fault(Fault),
    /// The run finished normally.
    Exhausted,
}

/// A submission run consumed one check at a time.
pub struct CheckStream {
    checks: std::vec::IntoIter<Check>,
    outcome: Option<Result<(), Fault>>,
    yielded: usize,
}

impl CheckStream {
    /// Pull the next element. After a fault the stream is exhausted.
    pub fn pull(&mut self) -> Pulled {
        if let Some(check) = self.checks.next() {
            self.yielded += 1;
            return Pulled::Check(check);
        }
        match self.outcome.take() {
            Some(Err(fault)) => Pulled::Fault(fault),
            _ => Pulled::Exhausted,
        }
    }

    pub fn yielded(&self) -> usize {
        self.yielded
    }
}

/// A discrepancy (or, optionally, a confirmation) found while comparing.
#[derive(Debug, Clone)]
pub enum Finding {
    /// The submission faulted where the master produced a value.
    Raised {
        expression: String,
        expected: Value,
        fault: Fault,
        note: Option<String>,
    },
    WrongValue {
        expression: String,
        expected: Value,
        actual: Value,
        note: Option<String>,
    },
    WrongOutput {
        expression: String,
        expected: Option<String>,
        actual: Option<String>,
        note: Option<String>,
    },
    CorrectValue {
        expression: String,
        value: Value,
    },
    CorrectOutput {
        expression: String,
        output: Option<String>,
    },
    /// The submission run faulted outside a check; the rest is not compared.
    Aborted { fault: Fault },
}

/// Result of reconciling one test function's two runs.
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub findings: Vec<Finding>,
    /// One flag per compared pair, plus one for an abort.
    pub mistakes: Vec<bool>,
    pub aborted: bool,
}

impl Reconciliation {
    pub fn mistake_count(&self) -> usize {
        self.mistakes.iter().filter(|m| **m).count()
    }

    pub fn has_mistakes(&self) -> bool {
        self.mistakes.iter().any(|m| *m)
    }
}

/// Pair `master` with the submission stream and classify every mismatch.
///
/// Returns a fatal [`GradingError`] when the test function itself is
/// broken: the master faulted, or the two runs yielded different numbers of
/// checks.
pub fn reconcile(
    test: &str,
    master: &[Check],
    mut student: CheckStream,
    log_correct: LogCorrect,
) -> Result<Reconciliation, GradingError> {
    let mut result = Reconciliation::default();

    for (index, expected) in master.iter().enumerate() {
        let actual = match student.pull() {
            Pulled::Check(check) => check,
            Pulled::Fault(fault) => {
                result.findings.push(Finding::Aborted { fault });
                result.mistakes.push(true);
                result.aborted = true;
                return Ok(result);
            }
            Pulled::Exhausted => {
                return Err(GradingError::TooFewChecks {
                    test: test.to_string(),
                    master: master.len(),
                    student: student.yielded(),
                });
            }
        };

        let expected_value = match &expected.value {
            Ok(value) => value,
            Err(fault) => {
                return Err(GradingError::MasterFault {
                    test: test.to_string(),
                    location: format!("check {} `{}`", index + 1, expected.expression),
                    detail: fault.detail(),
                });
            }
        };

        let mistake = compare(expected, expected_value, actual, log_correct, &mut result.findings);
        result.mistakes.push(mistake);
    }

    match student.pull() {
        Pulled::Exhausted => {}
        Pulled::Check(_) => {
            return Err(GradingError::TooManyChecks {
                test: test.to_string(),
                master: master.len(),
            });
        }
        Pulled::Fault(fault) => {
            result.findings.push(Finding::Aborted { fault });
            result.mistakes.push(true);
            result.aborted = true;
        }
    }

    Ok(result)
}

/// Compare one pair, pushing findings. Returns whether it was a mistake.
fn compare(
    expected: &Check,
    expected_value: &Value,
    actual: Check,
    log_correct: LogCorrect,
    findings: &mut Vec<Finding>,
) -> bool {
    let actual_value = match actual.value {
        Ok(value) => value,
        Err(fault) => {
            findings.push(Finding::Raised {
                expression: expected.expression.clone(),
                expected: expected_value.clone(),
                fault,
                note: expected.note.clone(),
            });
            return true;
        }
    };

    let mut mistake = false;

    if !expected.value_matches(&actual_value) {
        findings.push(Finding::WrongValue {
            expression: expected.expression.clone(),
            expected: expected_value.clone(),
            actual: actual_value,
            note: expected.note.clone(),
        });
        mistake = true;
    } else if log_correct.values() {
        findings.push(Finding::CorrectValue {
            expression: expected.expression.clone(),
            value: actual_value,
        });
    }

    if !expected.output_matches(actual.captured_output.as_deref()) {
        findings.push(Finding::WrongOutput {
            expression: expected.expression.clone(),
            expected: expected.captured_output.clone(),
            actual: actual.captured_output,
            note: expected.note.clone(),
        });
        mistake = true;
    } else if log_correct.output() && expected.captured_output.is_some() {
        findings.push(Finding::CorrectOutput {
            expression: expected.expression.clone(),
            output: actual.captured_output,
        });
    }

    mistake
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(expr: &str, value: impl Into<Value>) -> Check {
        Check::expr(expr).finish(Ok(value.into()), None)
    }

    fn printed(expr: &str, output: Option<&str>) -> Check {
        Check::expr(expr).finish(Ok(Value::None), output.map(String::from))
    }

    fn run(checks: Vec<Check>) -> CheckStream {
        RunRecord {
            checks,
            outcome: Ok(()),
        }
        .stream()
    }

    #[test]
    fn identical_runs_have_no_mistakes() {
        let master = vec![ok("f(1)", 2), ok("f(2)", 3)];
        let result = reconcile("t", &master, run(master.clone()), LogCorrect::Nothing).unwrap();
        assert!(!result.has_mistakes());
        assert!(result.findings.is_empty());
    }

    #[test]
    fn wrong_value_is_reported_against_master_expression() {
        let master = vec![ok("add_one(1)", 2)];
        let student = run(vec![ok("add_one(1)", 3)]);
        let result = reconcile("t", &master, student, LogCorrect::Nothing).unwrap();
        assert_eq!(result.mistake_count(), 1);
        match &result.findings[0] {
            Finding::WrongValue {
                expression,
                expected,
                actual,
                ..
            } => {
                assert_eq!(expression, "add_one(1)");
                assert_eq!(expected.as_int(), Some(2));
                assert_eq!(actual.as_int(), Some(3));
            }
            other => panic!("unexpected finding {other:?}"),
        }
    }

    #[test]
    fn pairing_is_positional() {
        let master = vec![ok("a()", 1), ok("b()", 2)];
        let swapped = run(vec![ok("b()", 2), ok("a()", 1)]);
        let result = reconcile("t", &master, swapped, LogCorrect::Nothing).unwrap();
        assert_eq!(result.mistake_count(), 2);
    }

    #[test]
    fn student_fault_aborts_remaining_checks() {
        let master = vec![ok("a()", 1), ok("b()", 2), ok("c()", 3)];
        let student = RunRecord {
            checks: vec![ok("a()", 1)],
            outcome: Err(Fault::new("ZeroDivisionError", "division by zero")),
        }
        .stream();
        let result = reconcile("t", &master, student, LogCorrect::Nothing).unwrap();
        assert!(result.aborted);
        assert_eq!(result.mistakes, vec![false, true]);
        assert!(matches!(result.findings[0], Finding::Aborted { .. }));
    }

    #[test]
    fn too_few_checks_is_fatal() {
        let master = vec![ok("a()", 1), ok("b()", 2)];
        let err = reconcile("t", &master, run(vec![ok("a()", 1)]), LogCorrect::Nothing).unwrap_err();
        assert!(matches!(
            err,
            GradingError::TooFewChecks {
                master: 2,
                student: 1,
                ..
            }
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn too_many_checks_is_fatal() {
        let master = vec![ok("a()", 1)];
        let err = reconcile("t", &master, run(vec![ok("a()", 1), ok("b()", 2)]), LogCorrect::Nothing)
            .unwrap_err();
        assert!(matches!(err, GradingError::TooManyChecks { master: 1, .. }));
    }

    #[test]
    fn master_fault_is_fatal() {
        let master = vec![Check::expr("a()").finish(Err(Fault::new("KeyError", "x")), None)];
        let err = reconcile("t", &master, run(vec![ok("a()", 1)]), LogCorrect::Nothing).unwrap_err();
        assert!(matches!(err, GradingError::MasterFault { .. }));
        assert!(err.to_string().contains("KeyError: x"));
    }

    #[test]
    fn raised_check_is_a_mistake_without_output_comparison() {
        let master = vec![printed("f()", Some("hi\n"))];
        let student = run(vec![Check::expr("f()").finish(Err(Fault::new("ValueError", "bad")), None)]);
        let result = reconcile("t", &master, student, LogCorrect::Nothing).unwrap();
        assert_eq!(result.findings.len(), 1);
        assert!(matches!(result.findings[0], Finding::Raised { .. }));
    }

    #[test]
    fn output_mismatch_is_separate_from_value() {
        let master = vec![printed("greet()", Some("hi\n"))];
        let student = run(vec![printed("greet()", None)]);
        let result = reconcile("t", &master, student, LogCorrect::Nothing).unwrap();
        assert_eq!(result.findings.len(), 1);
        match &result.findings[0] {
            Finding::WrongOutput { expected, actual, .. } => {
                assert_eq!(expected.as_deref(), Some("hi\n"));
                assert_eq!(actual.as_deref(), None);
            }
            other => panic!("unexpected finding {other:?}"),
        }
    }

    #[test]
    fn log_correct_adds_confirmations() {
        let master = vec![printed("greet()", Some("hi\n"))];
        let result = reconcile("t", &master, run(master.clone()), LogCorrect::Both).unwrap();
        assert!(!result.has_mistakes());
        assert_eq!(result.findings.len(), 2);
        assert!(matches!(result.findings[0], Finding::CorrectValue { .. }));
        assert!(matches!(result.findings[1], Finding::CorrectOutput { .. }));
    }

    #[test]
    fn trailing_fault_after_all_checks_is_contained() {
        let master = vec![ok("a()", 1)];
        let student = RunRecord {
            checks: vec![ok("a()", 1)],
            outcome: Err(Fault::new("RuntimeError", "late")),
        }
        .stream();
        let result = reconcile("t", &master, student, LogCorrect::Nothing).unwrap();
        assert!(result.aborted);
        assert!(result.has_mistakes());
    }
}
