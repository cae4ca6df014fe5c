//! Checks: one evaluated expression and its captured output.

use std::fmt;
use std::sync::Arc;

use crate::fault::Fault;
use crate::interpolate;
use crate::value::Value;

/// Custom equality policy for check values: `(expected, actual)`.
pub type ValueComparator = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Custom equality policy for captured output: `(expected, actual)`, where
/// `None` means nothing was printed.
pub type OutputComparator = Arc<dyn Fn(Option<&str>, Option<&str>) -> bool + Send + Sync>;

/// Default value policy: equal values of the same runtime type.
pub fn default_value_eq(expected: &Value, actual: &Value) -> bool {
    expected.loosely_equals(actual) && expected.type_name() == actual.type_name()
}

/// Default output policy: exact equality, no output only matching no output.
pub fn default_output_eq(expected: Option<&str>, actual: Option<&str>) -> bool {
    expected == actual
}

/// Compare floats within an absolute tolerance; other values use the
/// default policy.
pub fn approx(tolerance: f64) -> ValueComparator {
    Arc::new(move |expected: &Value, actual: &Value| match (expected, actual) {
        (Value::Float(a), Value::Float(b)) => (a - b).abs() <= tolerance,
        _ => default_value_eq(expected, actual),
    })
}

/// Compare output ignoring trailing whitespace on every line.
pub fn output_ignoring_trailing_whitespace() -> OutputComparator {
    fn normalize(text: Option<&str>) -> Option<String> {
        let joined = text?
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = joined.trim_end().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    }
    Arc::new(|expected: Option<&str>, actual: Option<&str>| {
        normalize(expected) == normalize(actual)
    })
}

/// One comparison unit, recorded during a single run of a test function.
#[derive(Clone)]
pub struct Check {
    /// Expression text with bound values interpolated.
    pub expression: String,
    /// The evaluated value, or the fault raised while evaluating it.
    pub value: Result<Value, Fault>,
    /// Output printed while evaluating, `None` when nothing was printed.
    pub captured_output: Option<String>,
    /// Annotation shown in feedback only.
    pub note: Option<String>,
    comparator: Option<ValueComparator>,
    output_comparator: Option<OutputComparator>,
}

impl Check {
    /// Start describing a check for `expression`.
    pub fn expr(expression: impl Into<String>) -> CheckSpec {
        CheckSpec {
            template: expression.into(),
            bindings: Vec::new(),
            note: None,
            stdin: Vec::new(),
            comparator: None,
            output_comparator: None,
        }
    }

    /// Whether `actual` matches this check's value under its policy.
    pub fn value_matches(&self, actual: &Value) -> bool {
        match &self.value {
            Ok(expected) => match &self.comparator {
                Some(compare) => compare(expected, actual),
                None => default_value_eq(expected, actual),
            },
            Err(_) => false,
        }
    }

    /// Whether `actual` output matches this check's output under its policy.
    pub fn output_matches(&self, actual: Option<&str>) -> bool {
        let expected = self.captured_output.as_deref();
        match &self.output_comparator {
            Some(compare) => compare(expected, actual),
            None => default_output_eq(expected, actual),
        }
    }

    pub fn is_fault(&self) -> bool {
        self.value.is_err()
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check")
            .field("expression", &self.expression)
            .field("value", &self.value)
            .field("captured_output", &self.captured_output)
            .field("note", &self.note)
            .field("custom_comparator", &self.comparator.is_some())
            .field("custom_output_comparator", &self.output_comparator.is_some())
            .finish()
    }
}

/// Description of a check before it is evaluated.
#[derive(Clone)]
pub struct CheckSpec {
    template: String,
    bindings: Vec<(String, Value)>,
    note: Option<String>,
    stdin: Vec<String>,
    comparator: Option<ValueComparator>,
    output_comparator: Option<OutputComparator>,
}

impl CheckSpec {
    /// Bind a value for `{name}` placeholders in the expression and note.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.push((name.into(), value.into()));
        self
    }

    /// Annotation shown alongside a mismatch.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Fabricated input lines queued right before evaluation.
    pub fn stdin(mut self, line: impl Into<String>) -> Self {
        self.stdin.push(line.into());
        self
    }

    pub fn compare_with(mut self, comparator: ValueComparator) -> Self {
        self.comparator = Some(comparator);
        self
    }

    pub fn compare_output_with(mut self, comparator: OutputComparator) -> Self {
        self.output_comparator = Some(comparator);
        self
    }

    pub(crate) fn input_lines(&self) -> &[String] {
        &self.stdin
    }

    /// Attach evaluation results. Test functions normally let
    /// [`Trial::check`](crate::trial::Trial::check) do this.
    pub fn finish(self, value: Result<Value, Fault>, captured_output: Option<String>) -> Check {
        let expression = interpolate::render(&self.template, &self.bindings);
        let note = self
            .note
            .as_deref()
            .map(|note| interpolate::render(note, &self.bindings));
        Check {
            expression,
            value,
            captured_output,
            note,
            comparator: self.comparator,
            output_comparator: self.output_comparator,
        }
    }
}
