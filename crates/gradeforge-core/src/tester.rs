//! The evaluation engine.
//!
//! A [`Tester`] owns the master implementation and an ordered list of test
//! functions. Each invocation grades one submission: run the setup hook,
//! load the submission, then run every test function against the master and
//! the submission, reconcile the two runs and hand mistakes to the ECF
//! controller. Feedback goes only through the caller's [`LogSink`].

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capture::Console;
use crate::context::CallContext;
use crate::ecf::{Attempt, EcfController};
use crate::error::{GradingError, LoadError};
use crate::fault::Fault;
use crate::feedback;
use crate::implementation::Implementation;
use crate::input::InputQueue;
use crate::reconcile::{reconcile, LogCorrect, RunRecord};
use crate::report::{SubmissionSummary, TestOutcome};
use crate::traits::{ImplementationLoader, LogSink};
use crate::trial::{Manual, Trial};

/// Marker file written next to a submission once a run-once setup hook has
/// been applied to it.
pub const SETUP_MARKER: &str = ".gradeforge-setup";

/// Body of a checked test function.
pub type TestBody = dyn for<'a> Fn(&mut Trial<'a>) -> Result<(), Fault> + Send + Sync;

/// Body of a manual test function.
pub type ManualBody = dyn for<'a> Fn(&mut Manual<'a>) -> Result<(), Fault> + Send + Sync;

/// Per-submission preparation hook, given the submission file.
pub type SetupHook = dyn Fn(&Path) -> anyhow::Result<()> + Send + Sync;

#[derive(Clone)]
enum Body {
    Checked(Arc<TestBody>),
    Manual(Arc<ManualBody>),
}

/// A registered unit of grading logic.
#[derive(Clone)]
pub struct TestFunction {
    name: String,
    doc: Option<String>,
    tests: BTreeSet<String>,
    depends: BTreeSet<String>,
    body: Body,
}

impl TestFunction {
    /// A test function whose checks are reconciled against the master.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&mut Trial<'a>) -> Result<(), Fault> + Send + Sync + 'static,
    {
        Self::with_body(name.into(), Body::Checked(Arc::new(body)))
    }

    /// A free-form test function run once with both implementations.
    pub fn manual<F>(name: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&mut Manual<'a>) -> Result<(), Fault> + Send + Sync + 'static,
    {
        Self::with_body(name.into(), Body::Manual(Arc::new(body)))
    }

    fn with_body(name: String, body: Body) -> Self {
        Self {
            name,
            doc: None,
            tests: BTreeSet::new(),
            depends: BTreeSet::new(),
            body,
        }
    }

    /// Docstring shown verbatim under the test header.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Symbols this function checks. They are confirmed wrong, and patched in
    /// the hybrid implementation, as soon as it finds a mistake.
    pub fn tests<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tests.extend(names.into_iter().map(Into::into));
        self
    }

    /// Symbols this function's correctness assumes.
    pub fn depends<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.body, Body::Manual(_))
    }

    pub fn fixed_names(&self) -> &BTreeSet<String> {
        &self.tests
    }

    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.depends
    }
}

struct Setup {
    every_time: bool,
    hook: Arc<SetupHook>,
}

/// The grading engine for one assignment.
pub struct Tester {
    master: Implementation,
    tests: Vec<TestFunction>,
    setup: Option<Setup>,
    points: Option<u32>,
    note: Option<String>,
    log_correct: LogCorrect,
}

impl Tester {
    pub fn new(master: Implementation) -> Self {
        Self {
            master,
            tests: Vec::new(),
            setup: None,
            points: None,
            note: None,
            log_correct: LogCorrect::default(),
        }
    }

    /// Point total announced in the banner.
    pub fn points(mut self, points: u32) -> Self {
        self.points = Some(points);
        self
    }

    /// Grading note shown in the banner.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn log_correct(mut self, log_correct: LogCorrect) -> Self {
        self.log_correct = log_correct;
        self
    }

    pub fn set_log_correct(&mut self, log_correct: LogCorrect) {
        self.log_correct = log_correct;
    }

    /// Append a test function. Registration order is run order.
    pub fn register(&mut self, test: TestFunction) -> &mut Self {
        tracing::debug!(test = %test.name, manual = test.is_manual(), "registered test function");
        self.tests.push(test);
        self
    }

    /// Install the per-submission setup hook, replacing any earlier one.
    ///
    /// Unless `every_time` is set, the hook runs once per submission
    /// directory: a [`SETUP_MARKER`] file records that it was applied.
    pub fn setup<F>(&mut self, every_time: bool, hook: F) -> &mut Self
    where
        F: Fn(&Path) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.setup = Some(Setup {
            every_time,
            hook: Arc::new(hook),
        });
        self
    }

    pub fn master(&self) -> &Implementation {
        &self.master
    }

    /// Registered test functions in run order.
    pub fn test_functions(&self) -> &[TestFunction] {
        &self.tests
    }

    /// Grade one submission with every registered test function.
    pub fn grade(
        &self,
        student_file: &Path,
        loader: &dyn ImplementationLoader,
        log: &mut dyn LogSink,
    ) -> Result<SubmissionSummary, GradingError> {
        self.grade_selected(student_file, loader, log, None)
    }

    /// Grade one submission, optionally running only the named test
    /// functions (still in registration order).
    pub fn grade_selected(
        &self,
        student_file: &Path,
        loader: &dyn ImplementationLoader,
        log: &mut dyn LogSink,
        filter: Option<&[String]>,
    ) -> Result<SubmissionSummary, GradingError> {
        let selected = self.select(filter)?;

        if !student_file.exists() {
            return Err(LoadError::NotFound(student_file.to_path_buf()).into());
        }
        self.run_setup(student_file)?;
        let student = loader.load(student_file)?;

        tracing::info!(submission = %student_file.display(), tests = selected.len(), "grading submission");

        for line in feedback::banner(student_file, self.note.as_deref(), self.points) {
            log.log(&line);
        }

        let mut session = Session::new(&self.master, student, self.log_correct, log);
        let mut outcomes = Vec::with_capacity(selected.len());
        for test in selected {
            let outcome = match &test.body {
                Body::Checked(body) => session.run_test(test, body.as_ref(), Attempt::Normal)?,
                Body::Manual(body) => session.run_manual(test, body.as_ref()),
            };
            outcomes.push(outcome);
        }

        Ok(SubmissionSummary {
            submission: student_file.to_path_buf(),
            max_points: self.points,
            tests: outcomes,
            confirmed_wrong: session.ecf.confirmed_wrong().iter().cloned().collect(),
        })
    }

    fn select(&self, filter: Option<&[String]>) -> Result<Vec<&TestFunction>, GradingError> {
        let Some(names) = filter else {
            return Ok(self.tests.iter().collect());
        };
        if let Some(unknown) = names.iter().find(|n| !self.tests.iter().any(|t| &t.name == *n)) {
            return Err(GradingError::UnknownTest(unknown.clone()));
        }
        Ok(self
            .tests
            .iter()
            .filter(|t| names.iter().any(|n| n == &t.name))
            .collect())
    }

    fn run_setup(&self, student_file: &Path) -> Result<(), GradingError> {
        let Some(setup) = &self.setup else {
            return Ok(());
        };
        let marker = submission_dir(student_file).join(SETUP_MARKER);
        if !setup.every_time && marker.exists() {
            tracing::debug!(marker = %marker.display(), "setup already applied, skipping");
            return Ok(());
        }

        let setup_error = |message: String| GradingError::Setup {
            path: student_file.to_path_buf(),
            message,
        };
        (setup.hook)(student_file).map_err(|e| setup_error(format!("{e:#}")))?;
        if !setup.every_time {
            std::fs::write(&marker, "").map_err(|e| {
                setup_error(format!("failed to write marker {}: {e}", marker.display()))
            })?;
        }
        Ok(())
    }
}

fn submission_dir(student_file: &Path) -> PathBuf {
    match student_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Per-submission state, rebuilt for every invocation.
struct Session<'g> {
    master: &'g Implementation,
    student: Implementation,
    /// Shallow copy of `student`; confirmed-wrong symbols point at the master.
    hybrid: Implementation,
    ecf: EcfController,
    console: Console,
    input: InputQueue,
    log_correct: LogCorrect,
    log: &'g mut dyn LogSink,
}

impl<'g> Session<'g> {
    fn new(
        master: &'g Implementation,
        student: Implementation,
        log_correct: LogCorrect,
        log: &'g mut dyn LogSink,
    ) -> Self {
        Self {
            master,
            hybrid: student.clone(),
            student,
            ecf: EcfController::new(),
            console: Console::new(),
            input: InputQueue::new(),
            log_correct,
            log,
        }
    }

    fn header(&mut self, test: &TestFunction) {
        self.log.log(&feedback::test_header(&test.name));
        if let Some(doc) = &test.doc {
            self.log.log(&feedback::docstring(doc));
        }
    }

    fn run_test(
        &mut self,
        test: &TestFunction,
        body: &TestBody,
        attempt: Attempt,
    ) -> Result<TestOutcome, GradingError> {
        tracing::debug!(test = %test.name, ?attempt, "running test function");
        if attempt == Attempt::Normal {
            self.header(test);
        }

        self.input.clear();
        let master_run = run_checked(body, self.master, &self.console, &self.input);
        if let Err(fault) = master_run.outcome {
            return Err(GradingError::MasterFault {
                test: test.name.clone(),
                location: "test function body".to_string(),
                detail: fault.detail(),
            });
        }

        self.input.clear();
        let implementation = match attempt {
            Attempt::Normal => &self.student,
            Attempt::Retrying => &self.hybrid,
        };
        let student_run = run_checked(body, implementation, &self.console, &self.input);
        self.input.clear();

        let result = reconcile(&test.name, &master_run.checks, student_run.stream(), self.log_correct)?;
        for finding in &result.findings {
            self.log.log(&feedback::render(finding));
        }

        let mut outcome = TestOutcome {
            name: test.name.clone(),
            manual: false,
            mistakes: result.mistake_count(),
            aborted: result.aborted,
            retried: false,
            retry_mistakes: None,
        };

        if result.has_mistakes() {
            self.handle_ecf(test, body, attempt, &mut outcome)?;
        } else if attempt == Attempt::Normal {
            self.log.log(feedback::ALL_CLEAR_MESSAGE);
        }
        Ok(outcome)
    }

    fn handle_ecf(
        &mut self,
        test: &TestFunction,
        body: &TestBody,
        attempt: Attempt,
        outcome: &mut TestOutcome,
    ) -> Result<(), GradingError> {
        if self.ecf.should_retry(attempt, &test.depends) {
            self.log.log(feedback::RETRY_MESSAGE);
            let retry = self.run_test(test, body, Attempt::Retrying)?;
            if retry.mistakes == 0 {
                self.log.log(feedback::SOLVED_MESSAGE);
            }
            outcome.retried = true;
            outcome.retry_mistakes = Some(retry.mistakes);
        }

        let newly = self.ecf.confirm(&test.tests, self.master, &mut self.hybrid)?;
        if !newly.is_empty() {
            tracing::debug!(test = %test.name, confirmed = ?newly, "carrying error forward");
        }
        Ok(())
    }

    fn run_manual(&mut self, test: &TestFunction, body: &ManualBody) -> TestOutcome {
        tracing::debug!(test = %test.name, "running manual test function");
        self.header(test);
        self.input.clear();

        let mut manual = Manual::new(
            CallContext::new(self.master, &self.console, &self.input),
            CallContext::new(&self.student, &self.console, &self.input),
        );
        let outcome = match catch_unwind(AssertUnwindSafe(|| body(&mut manual))) {
            Ok(outcome) => outcome,
            Err(payload) => Err(Fault::from_panic(payload.as_ref())),
        };
        for line in manual.into_lines() {
            self.log.log(&line);
        }
        self.input.clear();

        let mut result = TestOutcome::manual(&test.name);
        if let Err(fault) = outcome {
            tracing::warn!(test = %test.name, fault = %fault.headline(), "manual test function faulted");
            self.log
                .log(&format!("\nFatal exception in manual test; test aborted.\n{fault}"));
            result.aborted = true;
        }
        result
    }
}

/// Run a checked test function body to completion against `implementation`.
fn run_checked(
    body: &TestBody,
    implementation: &Implementation,
    console: &Console,
    input: &InputQueue,
) -> RunRecord {
    let mut trial = Trial::new(CallContext::new(implementation, console, input));
    let outcome = match catch_unwind(AssertUnwindSafe(|| body(&mut trial))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(Fault::from_panic(payload.as_ref())),
    };
    RunRecord {
        checks: trial.into_checks(),
        outcome,
    }
}
