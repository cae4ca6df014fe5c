//! Implementations as explicit dispatch tables.
//!
//! A master, student or hybrid implementation is a table from symbol name to
//! a callable. The hybrid implementation is a shallow copy of the student's
//! table whose entries can be overwritten with master bindings.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::context::CallContext;
use crate::error::GradingError;
use crate::fault::Fault;
use crate::value::Value;

/// A free function.
pub type FunctionFn = dyn Fn(&CallContext<'_>, Vec<Value>) -> Result<Value, Fault> + Send + Sync;

/// A method operating on a mutable receiver.
pub type MethodFn =
    dyn Fn(&CallContext<'_>, &mut Value, Vec<Value>) -> Result<Value, Fault> + Send + Sync;

/// A callable symbol.
#[derive(Clone)]
pub enum Symbol {
    Function(Arc<FunctionFn>),
    Method(Arc<MethodFn>),
}

/// A symbol together with the implementation it was defined in.
#[derive(Clone)]
pub struct Binding {
    pub origin: Arc<str>,
    pub symbol: Symbol,
    /// Implementation the symbol resolves its own calls in, when that is not
    /// the table it is bound in. Set on bindings patched in from a master.
    pub scope: Option<Arc<Implementation>>,
}

/// A named table of symbols.
#[derive(Clone)]
pub struct Implementation {
    origin: Arc<str>,
    symbols: BTreeMap<String, Binding>,
}

impl Implementation {
    /// Create an empty implementation. `origin` labels frames in faults.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: Arc::from(origin.into()),
            symbols: BTreeMap::new(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Relabel the implementation and every binding it defined itself.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        let old = Arc::clone(&self.origin);
        let new: Arc<str> = Arc::from(origin.into());
        for binding in self.symbols.values_mut() {
            if binding.origin == old {
                binding.origin = Arc::clone(&new);
            }
        }
        self.origin = new;
        self
    }

    /// Define a free function.
    pub fn function<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&CallContext<'_>, Vec<Value>) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        self.define(name, Symbol::Function(Arc::new(f)));
        self
    }

    /// Define a method, registered as `Class.method`.
    pub fn method<F>(mut self, class: &str, name: &str, f: F) -> Self
    where
        F: Fn(&CallContext<'_>, &mut Value, Vec<Value>) -> Result<Value, Fault>
            + Send
            + Sync
            + 'static,
    {
        self.define(&format!("{class}.{name}"), Symbol::Method(Arc::new(f)));
        self
    }

    /// Bind `name` in this implementation, replacing any previous binding.
    pub fn define(&mut self, name: &str, symbol: Symbol) {
        self.symbols.insert(
            name.to_string(),
            Binding {
                origin: Arc::clone(&self.origin),
                symbol,
                scope: None,
            },
        );
    }

    /// Remove a binding, e.g. to model a submission missing a function.
    pub fn remove(&mut self, name: &str) -> bool {
        self.symbols.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn symbol_names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    /// Overwrite `name`, and every `name.*` method, with the bindings from
    /// `master`.
    ///
    /// Patched symbols keep calling into `master`, so their own helpers are
    /// the master's. Returns the number of bindings replaced.
    pub fn patch_from(&mut self, master: &Implementation, name: &str) -> Result<usize, GradingError> {
        let prefix = format!("{name}.");
        let scope = Arc::new(master.clone());
        let patches: Vec<(String, Binding)> = master
            .symbols
            .iter()
            .filter(|(symbol, _)| symbol.as_str() == name || symbol.starts_with(&prefix))
            .map(|(symbol, binding)| {
                let mut binding = binding.clone();
                if binding.scope.is_none() {
                    binding.scope = Some(Arc::clone(&scope));
                }
                (symbol.clone(), binding)
            })
            .collect();

        if patches.is_empty() {
            return Err(GradingError::UnknownSymbol {
                symbol: name.to_string(),
            });
        }

        let count = patches.len();
        self.symbols.extend(patches);
        Ok(count)
    }

    /// Whether `name` currently resolves to a binding defined elsewhere.
    pub fn is_patched(&self, name: &str) -> bool {
        self.symbols
            .get(name)
            .is_some_and(|binding| binding.origin != self.origin)
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("origin", &self.origin)
            .field("symbols", &self.symbols.keys().collect::<Vec<_>>())
            .finish()
    }
}
