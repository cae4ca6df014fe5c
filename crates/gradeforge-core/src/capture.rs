//! Captured-output scopes.
//!
//! Implementations write through a [`Console`] instead of the process
//! stdout. [`Console::capture`] swaps in a fresh buffer for the lifetime of
//! the returned guard; the [`CaptureHandle`] keeps the buffer alive, so the
//! captured text can still be read after the guard is dropped.

use std::cell::RefCell;
use std::rc::Rc;

/// The output stream that implementation code prints to.
#[derive(Default)]
pub struct Console {
    active: RefCell<Option<Rc<RefCell<String>>>>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write text to the active capture buffer.
    ///
    /// Output produced while no capture is active is not scored; it is only
    /// traced.
    pub fn write(&self, text: &str) {
        match self.active.borrow().as_ref() {
            Some(buffer) => buffer.borrow_mut().push_str(text),
            None => tracing::trace!(output = text, "uncaptured console output"),
        }
    }

    /// Whether a capture scope is currently open.
    pub fn is_capturing(&self) -> bool {
        self.active.borrow().is_some()
    }

    /// Redirect output into a fresh buffer until the guard is dropped.
    pub fn capture(&self) -> CaptureScope<'_> {
        let buffer = Rc::new(RefCell::new(String::new()));
        let previous = self.active.borrow_mut().replace(Rc::clone(&buffer));
        CaptureScope {
            console: self,
            previous,
            handle: CaptureHandle { buffer },
        }
    }
}

/// Guard restoring the previous output target on every exit path,
/// including unwinding.
pub struct CaptureScope<'a> {
    console: &'a Console,
    previous: Option<Rc<RefCell<String>>>,
    handle: CaptureHandle,
}

impl CaptureScope<'_> {
    pub fn handle(&self) -> CaptureHandle {
        self.handle.clone()
    }
}

impl Drop for CaptureScope<'_> {
    fn drop(&mut self) {
        *self.console.active.borrow_mut() = self.previous.take();
    }
}

/// Read access to one capture buffer.
#[derive(Clone)]
pub struct CaptureHandle {
    buffer: Rc<RefCell<String>>,
}

impl CaptureHandle {
    /// Text captured so far.
    pub fn text(&self) -> String {
        self.buffer.borrow().clone()
    }

    /// Captured text, or `None` when nothing was produced.
    pub fn produced(&self) -> Option<String> {
        let text = self.buffer.borrow();
        if text.is_empty() {
            None
        } else {
            Some(text.clone())
        }
    }
}
