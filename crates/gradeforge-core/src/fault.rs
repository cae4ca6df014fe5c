//! Faults raised by implementation code.
//!
//! A fault records where it travelled inside the implementation so that
//! feedback can show a student the frames in *their* code and nothing from
//! the harness.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One call frame inside an implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Where the implementation came from (usually the submission path).
    pub origin: String,
    /// Symbol that was executing.
    pub symbol: String,
    /// The symbol came from outside the submission, e.g. a master helper
    /// patched in for a retry. Hidden from students.
    #[serde(default)]
    pub foreign: bool,
}

/// A failure raised while evaluating implementation code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    /// Failure type, e.g. `ZeroDivisionError` or `panic`.
    pub kind: String,
    /// Human-readable failure message.
    pub message: String,
    /// Frames from outermost to innermost.
    #[serde(default)]
    pub frames: Vec<Frame>,
}

impl Fault {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            frames: Vec::new(),
        }
    }

    /// A call to a symbol the implementation does not define.
    pub fn missing_symbol(origin: &str, name: &str) -> Self {
        Self::new(
            "MissingSymbol",
            format!("{origin} does not define '{name}'"),
        )
    }

    /// A symbol was called with arguments it cannot handle.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }

    /// Build a fault from a caught panic payload.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::new("panic", message)
    }

    /// Record that the fault propagated out of `symbol`.
    pub(crate) fn unwound_through(mut self, origin: &str, symbol: &str, foreign: bool) -> Self {
        self.frames.insert(
            0,
            Frame {
                origin: origin.to_string(),
                symbol: symbol.to_string(),
                foreign,
            },
        );
        self
    }

    /// The `Kind: message` line.
    pub fn headline(&self) -> String {
        if self.message.is_empty() {
            self.kind.clone()
        } else {
            format!("{}: {}", self.kind, self.message)
        }
    }

    /// Full detail for instructors, frames from every implementation included.
    pub fn detail(&self) -> String {
        let mut out = String::from("Traceback (most recent call last):\n");
        for frame in &self.frames {
            out.push_str(&format!("  {}, in {}\n", frame.origin, frame.symbol));
        }
        out.push_str(&self.headline());
        out
    }
}

/// Student-facing excerpt: submission frames followed by the headline.
impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in self.frames.iter().filter(|frame| !frame.foreign) {
            writeln!(f, "  File \"{}\", in {}", frame.origin, frame.symbol)?;
        }
        f.write_str(&self.headline())
    }
}

impl std::error::Error for Fault {}
