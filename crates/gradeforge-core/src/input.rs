//! Fabricated console input.

use std::cell::RefCell;
use std::collections::VecDeque;

use thiserror::Error;

/// Errors raised when consuming fabricated input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Input was requested but the test author supplied none.
    #[error("input requested but no fabricated input remains")]
    Exhausted,
}

enum Pending {
    Ready(String),
    Deferred(Box<dyn FnOnce() -> String>),
}

/// FIFO queue standing in for interactive input.
///
/// Lines may be pushed ready-made or as producers evaluated only when the
/// line is consumed.
#[derive(Default)]
pub struct InputQueue {
    pending: RefCell<VecDeque<Pending>>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a line.
    pub fn put(&self, line: impl Into<String>) {
        self.pending
            .borrow_mut()
            .push_back(Pending::Ready(line.into()));
    }

    /// Queue a line computed when it is consumed.
    pub fn put_with(&self, producer: impl FnOnce() -> String + 'static) {
        self.pending
            .borrow_mut()
            .push_back(Pending::Deferred(Box::new(producer)));
    }

    /// Take the next line. An empty queue is an error, never a default.
    pub fn consume(&self) -> Result<String, InputError> {
        let next = self.pending.borrow_mut().pop_front();
        match next.ok_or(InputError::Exhausted)? {
            Pending::Ready(line) => Ok(line),
            Pending::Deferred(producer) => Ok(producer()),
        }
    }

    /// Drop all unconsumed input.
    pub fn clear(&self) {
        let dropped = {
            let mut pending = self.pending.borrow_mut();
            let n = pending.len();
            pending.clear();
            n
        };
        if dropped > 0 {
            tracing::debug!(dropped, "discarded unconsumed fabricated input");
        }
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }
}
