//! Handles passed to test functions for one run against one implementation.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::check::{Check, CheckSpec};
use crate::context::CallContext;
use crate::fault::Fault;
use crate::input::InputQueue;
use crate::value::Value;

/// One run of a test function against one implementation.
///
/// Every call to [`check`](Self::check) records a [`Check`]; the engine pairs
/// the master run's checks with the submission run's checks by position.
/// Calls made outside a check are bare setup code: a fault there ends the run
/// (propagate it with `?`).
pub struct Trial<'a> {
    cx: CallContext<'a>,
    checks: Vec<Check>,
}

impl<'a> Trial<'a> {
    pub(crate) fn new(cx: CallContext<'a>) -> Self {
        Self {
            cx,
            checks: Vec::new(),
        }
    }

    pub fn cx(&self) -> &CallContext<'a> {
        &self.cx
    }

    /// Bare call outside any check.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, Fault> {
        self.cx.call(name, args)
    }

    /// Bare method call outside any check.
    pub fn call_method(&self, receiver: &mut Value, method: &str, args: Vec<Value>) -> Result<Value, Fault> {
        self.cx.call_method(receiver, method, args)
    }

    pub fn stdin(&self) -> &'a InputQueue {
        self.cx.stdin()
    }

    /// Evaluate `eval` as a check, capturing its output.
    ///
    /// Faults and panics raised by `eval` are recorded in the check rather
    /// than ending the run.
    pub fn check<F>(&mut self, spec: CheckSpec, eval: F)
    where
        F: FnOnce(&CallContext<'a>) -> Result<Value, Fault>,
    {
        for line in spec.input_lines() {
            self.cx.stdin().put(line.clone());
        }

        let console = self.cx.console();
        let scope = console.capture();
        let cx = &self.cx;
        let value = match catch_unwind(AssertUnwindSafe(|| eval(cx))) {
            Ok(value) => value,
            Err(payload) => Err(Fault::from_panic(payload.as_ref())),
        };
        let handle = scope.handle();
        drop(scope);

        self.checks.push(spec.finish(value, handle.produced()));
    }

    /// Number of checks recorded so far.
    pub fn recorded(&self) -> usize {
        self.checks.len()
    }

    pub(crate) fn into_checks(self) -> Vec<Check> {
        self.checks
    }
}

/// The handles a manual test function receives: both implementations, and a
/// place to write free-form feedback.
pub struct Manual<'a> {
    pub master: CallContext<'a>,
    pub student: CallContext<'a>,
    lines: Vec<String>,
}

impl<'a> Manual<'a> {
    pub(crate) fn new(master: CallContext<'a>, student: CallContext<'a>) -> Self {
        Self {
            master,
            student,
            lines: Vec::new(),
        }
    }

    /// Add a line to the submission's feedback.
    pub fn log(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub(crate) fn into_lines(self) -> Vec<String> {
        self.lines
    }
}
