//! Feedback text and log sinks.
//!
//! The line vocabulary here is scraped by downstream tooling (banner of 70
//! `=`, `Automated testing for <path>`, `Maximum points: <N>`, and the
//! dashed test-function delimiter). Keep it stable.

use std::path::Path;

use crate::reconcile::Finding;
use crate::traits::LogSink;

/// Width of the `=` banner line.
pub const BANNER_WIDTH: usize = 70;

/// Width of the dashed test-function delimiter.
pub const HEADER_WIDTH: usize = 50;

pub const RETRY_MESSAGE: &str = "Trying again with helper functions corrected.";
pub const SOLVED_MESSAGE: &str = "Problem solved!";
pub const ALL_CLEAR_MESSAGE: &str = "All checks passed.";

/// Submission banner lines.
pub fn banner(submission: &Path, note: Option<&str>, points: Option<u32>) -> Vec<String> {
    let bar = "=".repeat(BANNER_WIDTH);
    let mut lines = vec![
        format!("\n\n{bar}"),
        format!("Automated testing for {}", submission.display()),
        bar,
    ];
    if let Some(note) = note {
        lines.push(format!("\n{note}"));
    }
    if let Some(points) = points {
        lines.push(format!("\nMaximum points: {points}"));
    }
    lines
}

/// `----------( test_name )----------`, centered in [`HEADER_WIDTH`] dashes.
pub fn test_header(name: &str) -> String {
    format!("\n{:-^width$}", format!("( {name} )"), width = HEADER_WIDTH)
}

/// A docstring shown verbatim under the header.
pub fn docstring(doc: &str) -> String {
    format!("\"\"\"{doc}\"\"\"")
}

/// Render one finding as feedback text.
pub fn render(finding: &Finding) -> String {
    match finding {
        Finding::Raised {
            expression,
            expected,
            fault,
            note,
        } => format!(
            "\n{expression} should be {}, but submission raised:\n{fault}{}",
            expected.repr(),
            render_note(note.as_deref())
        ),
        Finding::WrongValue {
            expression,
            expected,
            actual,
            note,
        } => format!(
            "\n{expression} should be {}, but it is {}{}",
            expected.repr(),
            actual.repr(),
            render_note(note.as_deref())
        ),
        Finding::WrongOutput {
            expression,
            expected,
            actual,
            note,
        } => format!(
            "\n{expression} should print:\n{}\nbut it prints:\n{}{}",
            output_block(expected.as_deref()),
            output_block(actual.as_deref()),
            render_note(note.as_deref())
        ),
        Finding::CorrectValue { expression, value } => {
            format!("\n{expression} is correctly {}", value.repr())
        }
        Finding::CorrectOutput { expression, output } => {
            format!("\n{expression} correctly prints:\n{}", output_block(output.as_deref()))
        }
        Finding::Aborted { fault } => {
            format!("\nFatal exception in student code; test aborted.\n{fault}")
        }
    }
}

fn render_note(note: Option<&str>) -> String {
    note.map(|n| format!("\n Note: {n}")).unwrap_or_default()
}

/// Captured output indented as a block; `(no output)` when nothing was printed.
fn output_block(output: Option<&str>) -> String {
    match output {
        None => "    (no output)".to_string(),
        Some(text) => text
            .trim_end_matches('\n')
            .lines()
            .map(|line| format!("    | {line}"))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Log sink writing each message to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn log(&mut self, message: &str) {
        println!("{message}");
    }
}

/// Log sink collecting messages in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub lines: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages joined as they would appear in a report file.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.text().contains(needle)
    }
}

impl LogSink for MemorySink {
    fn log(&mut self, message: &str) {
        self.lines.push(message.to_string());
    }
}
