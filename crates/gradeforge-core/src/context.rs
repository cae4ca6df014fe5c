//! The handle implementation code runs against.

use std::fmt::Display;

use crate::capture::Console;
use crate::fault::Fault;
use crate::implementation::{Binding, Implementation, Symbol};
use crate::input::InputQueue;
use crate::value::Value;

/// Build an argument list of [`Value`]s.
///
/// ```
/// use gradeforge_core::{args, value::Value};
/// assert_eq!(args![1, "a"].len(), 2);
/// assert!(matches!(args![2.5][0], Value::Float(_)));
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$($crate::value::Value::from($arg)),*]
    };
}

/// Everything a symbol may touch while it runs: the implementation it
/// belongs to, the console it prints to and the fabricated input queue.
///
/// Calls between symbols go back through the context, so a helper patched
/// into a hybrid implementation is picked up by its callers.
pub struct CallContext<'a> {
    implementation: &'a Implementation,
    console: &'a Console,
    input: &'a InputQueue,
    /// Origin of the implementation the run started in; frames from any
    /// other origin are foreign.
    home: &'a str,
}

impl<'a> CallContext<'a> {
    pub fn new(implementation: &'a Implementation, console: &'a Console, input: &'a InputQueue) -> Self {
        Self {
            implementation,
            console,
            input,
            home: implementation.origin(),
        }
    }

    /// The context `binding` runs in: its own scope if it was patched in
    /// from elsewhere, otherwise this one.
    fn scoped(&self, binding: &'a Binding) -> CallContext<'a> {
        CallContext {
            implementation: binding.scope.as_deref().unwrap_or(self.implementation),
            console: self.console,
            input: self.input,
            home: self.home,
        }
    }

    fn is_foreign(&self, binding: &Binding) -> bool {
        &*binding.origin != self.home
    }

    pub fn implementation(&self) -> &'a Implementation {
        self.implementation
    }

    pub fn console(&self) -> &'a Console {
        self.console
    }

    /// The fabricated input queue, for test functions that preload input.
    pub fn stdin(&self) -> &'a InputQueue {
        self.input
    }

    /// Call a free function by name.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, Fault> {
        let Some(binding) = self.implementation.get(name) else {
            return Err(Fault::missing_symbol(self.implementation.origin(), name));
        };
        match &binding.symbol {
            Symbol::Function(f) => {
                let foreign = self.is_foreign(binding);
                f(&self.scoped(binding), args)
                    .map_err(|fault| fault.unwound_through(&binding.origin, name, foreign))
            }
            Symbol::Method(_) => Err(Fault::type_error(format!(
                "'{name}' is a method and needs an instance"
            ))),
        }
    }

    /// Call `receiver.method(args)`, dispatching on the receiver's class.
    pub fn call_method(&self, receiver: &mut Value, method: &str, args: Vec<Value>) -> Result<Value, Fault> {
        let name = format!("{}.{method}", receiver.type_name());
        let Some(binding) = self.implementation.get(&name) else {
            return Err(Fault::new(
                "AttributeError",
                format!("'{}' object has no attribute '{method}'", receiver.type_name()),
            ));
        };
        match &binding.symbol {
            Symbol::Method(f) => {
                let foreign = self.is_foreign(binding);
                f(&self.scoped(binding), receiver, args)
                    .map_err(|fault| fault.unwound_through(&binding.origin, &name, foreign))
            }
            Symbol::Function(_) => Err(Fault::type_error(format!("'{name}' is not a method"))),
        }
    }

    /// Print a line of output.
    pub fn print(&self, text: impl Display) {
        self.console.write(&format!("{text}\n"));
    }

    /// Write output without a trailing newline.
    pub fn write(&self, text: &str) {
        self.console.write(text);
    }

    /// Read a line of fabricated input, echoing the prompt and the line.
    pub fn input(&self, prompt: &str) -> Result<String, Fault> {
        self.console.write(prompt);
        let line = self
            .input
            .consume()
            .map_err(|e| Fault::new("EOFError", e.to_string()))?;
        self.console.write(&line);
        self.console.write("\n");
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Implementation {
        Implementation::new("sample.rs")
            .function("add_one", |_, args| match args.first() {
                Some(Value::Int(x)) => Ok(Value::Int(x + 1)),
                _ => Err(Fault::type_error("expected an int")),
            })
            .function("add_two", |cx, args| {
                let once = cx.call("add_one", args)?;
                cx.call("add_one", vec![once])
            })
            .function("greet", |cx, _| {
                let name = cx.input("name? ")?;
                cx.print(format!("hello {name}"));
                Ok(Value::None)
            })
            .function("Counter", |_, _| {
                Ok(Value::object("Counter", vec![("n".into(), Value::Int(0))]))
            })
            .method("Counter", "bump", |_, this, _| {
                let n = this.field("n").and_then(Value::as_int).unwrap_or(0);
                this.set_field("n", Value::Int(n + 1));
                Ok(Value::None)
            })
    }

    #[test]
    fn nested_calls_dispatch_through_table() {
        let implementation = sample();
        let (console, input) = (Console::new(), InputQueue::new());
        let cx = CallContext::new(&implementation, &console, &input);
        assert_eq!(cx.call("add_two", crate::args![1]).unwrap().as_int(), Some(3));
    }

    #[test]
    fn faults_record_frames() {
        let implementation = sample();
        let (console, input) = (Console::new(), InputQueue::new());
        let cx = CallContext::new(&implementation, &console, &input);
        let fault = cx.call("add_two", crate::args!["x"]).unwrap_err();
        let symbols: Vec<_> = fault.frames.iter().map(|f| f.symbol.as_str()).collect();
        assert_eq!(symbols, ["add_two", "add_one"]);
    }

    #[test]
    fn patched_symbols_call_their_own_helpers() {
        let master = sample();
        let mut hybrid = Implementation::new("flc37/foo.rs")
            .function("add_one", |_, _| Err(Fault::new("ValueError", "broken helper")))
            .function("add_two", |_, _| Ok(Value::Int(0)));
        hybrid.patch_from(&master, "add_two").unwrap();

        let (console, input) = (Console::new(), InputQueue::new());
        let cx = CallContext::new(&hybrid, &console, &input);
        assert_eq!(cx.call("add_two", crate::args![1]).unwrap().as_int(), Some(3));
        assert!(cx.call("add_one", crate::args![1]).is_err());
    }

    #[test]
    fn frames_outside_the_run_origin_are_foreign() {
        let master = sample();
        let mut hybrid = Implementation::new("flc37/foo.rs")
            .function("shout", |cx, args| cx.call("add_two", args));
        hybrid.patch_from(&master, "add_two").unwrap();

        let (console, input) = (Console::new(), InputQueue::new());
        let cx = CallContext::new(&hybrid, &console, &input);
        let fault = cx.call("shout", crate::args!["x"]).unwrap_err();
        let foreign: Vec<_> = fault.frames.iter().map(|f| (f.symbol.as_str(), f.foreign)).collect();
        assert_eq!(foreign, [("shout", false), ("add_two", true), ("add_one", true)]);
        assert!(!fault.to_string().contains("sample.rs"));
    }

    #[test]
    fn missing_symbol_is_a_fault() {
        let implementation = sample();
        let (console, input) = (Console::new(), InputQueue::new());
        let cx = CallContext::new(&implementation, &console, &input);
        let fault = cx.call("subtract", vec![]).unwrap_err();
        assert_eq!(fault.kind, "MissingSymbol");
    }

    #[test]
    fn input_is_echoed_into_capture() {
        let implementation = sample();
        let (console, input) = (Console::new(), InputQueue::new());
        let cx = CallContext::new(&implementation, &console, &input);
        input.put("pig");
        let scope = console.capture();
        cx.call("greet", vec![]).unwrap();
        assert_eq!(scope.handle().text(), "name? pig\nhello pig\n");
    }

    #[test]
    fn empty_input_faults() {
        let implementation = sample();
        let (console, input) = (Console::new(), InputQueue::new());
        let cx = CallContext::new(&implementation, &console, &input);
        assert_eq!(cx.call("greet", vec![]).unwrap_err().kind, "EOFError");
    }

    #[test]
    fn methods_mutate_receiver() {
        let implementation = sample();
        let (console, input) = (Console::new(), InputQueue::new());
        let cx = CallContext::new(&implementation, &console, &input);
        let mut counter = cx.call("Counter", vec![]).unwrap();
        cx.call_method(&mut counter, "bump", vec![]).unwrap();
        cx.call_method(&mut counter, "bump", vec![]).unwrap();
        assert_eq!(counter.field("n").and_then(Value::as_int), Some(2));
        let fault = cx.call_method(&mut counter, "reset", vec![]).unwrap_err();
        assert_eq!(fault.kind, "AttributeError");
    }
}
