//! Evaluation environment
//!
//! [`EvalContext`] manages the variable bindings and ambient service handles
//! for one evaluation. Bindings are keyed by [`VarKey`] binding-site tokens,
//! not by surface names, so shadowed or recursive bindings cannot collide.
//!
//! Contexts are single-threaded by contract: service handles are `Rc`, and
//! one context is never shared live between evaluations. The only way state
//! escapes an evaluation is [`EvalContext::snapshot`], which closures use to
//! detach from later mutation of their defining scope.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::ast::VarKey;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::host_interface::{ModelAccess, TypeOracle};
use crate::runtime::values::Value;

/// Engine tuning knobs, carried by the context services.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Maximum nesting of closure applications before evaluation fails with a
    /// legible error instead of exhausting the native stack.
    pub max_call_depth: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            max_call_depth: 512,
        }
    }
}

/// Ambient service handles shared by reference between a context and all of
/// its snapshots: the object-model accessor, the type oracle, an optional
/// render target, and the call-depth counter.
#[derive(Clone)]
pub struct Services {
    model: Rc<dyn ModelAccess>,
    types: Rc<dyn TypeOracle>,
    output: Option<Rc<RefCell<dyn Write>>>,
    options: Rc<EvalOptions>,
    depth: Rc<Cell<usize>>,
}

impl Services {
    pub fn new(model: Rc<dyn ModelAccess>, types: Rc<dyn TypeOracle>) -> Self {
        Services {
            model,
            types,
            output: None,
            options: Rc::new(EvalOptions::default()),
            depth: Rc::new(Cell::new(0)),
        }
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = Rc::new(options);
        self
    }

    pub fn with_output(mut self, output: Rc<RefCell<dyn Write>>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn model(&self) -> &Rc<dyn ModelAccess> {
        &self.model
    }

    pub fn types(&self) -> &Rc<dyn TypeOracle> {
        &self.types
    }

    pub fn output(&self) -> Option<&Rc<RefCell<dyn Write>>> {
        self.output.as_ref()
    }

    /// Enters one closure application. The returned guard leaves it again on
    /// drop, also when the application fails.
    pub fn enter_call(&self) -> EvalResult<CallGuard> {
        let depth = self.depth.get() + 1;
        if depth > self.options.max_call_depth {
            return Err(EvalError::depth_exceeded(self.options.max_call_depth));
        }
        self.depth.set(depth);
        Ok(CallGuard {
            depth: Rc::clone(&self.depth),
        })
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("model", &self.model)
            .field("types", &self.types)
            .field("output", &self.output.as_ref().map(|_| "<render target>"))
            .field("options", &self.options)
            .field("depth", &self.depth.get())
            .finish()
    }
}

pub struct CallGuard {
    depth: Rc<Cell<usize>>,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

/// The mutable evaluation environment: unique-keyed variable bindings plus
/// the ambient [`Services`].
#[derive(Debug, Clone)]
pub struct EvalContext {
    services: Services,
    bindings: HashMap<VarKey, Value>,
}

impl EvalContext {
    pub fn new(model: Rc<dyn ModelAccess>, types: Rc<dyn TypeOracle>) -> Self {
        EvalContext {
            services: Services::new(model, types),
            bindings: HashMap::new(),
        }
    }

    pub fn with_services(services: Services) -> Self {
        EvalContext {
            services,
            bindings: HashMap::new(),
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Binds `key` in this context, replacing any earlier binding of the same
    /// key.
    pub fn define_var(&mut self, key: VarKey, value: Value) {
        self.bindings.insert(key, value);
    }

    /// The value bound to `key`; an undefined-variable failure if absent.
    pub fn get_var(&self, key: &VarKey) -> EvalResult<Value> {
        self.bindings
            .get(key)
            .cloned()
            .ok_or_else(|| EvalError::undefined_variable(key))
    }

    /// The value bound to `key`, or null if absent.
    pub fn get_var_or_null(&self, key: &VarKey) -> Value {
        self.bindings.get(key).cloned().unwrap_or(Value::Null)
    }

    pub fn delete_var(&mut self, key: &VarKey) {
        self.bindings.remove(key);
    }

    /// A new context holding a value-copy of the current bindings and the
    /// same service references. The single mechanism by which a closure
    /// detaches from later mutation of its defining scope.
    pub fn snapshot(&self) -> EvalContext {
        EvalContext {
            services: self.services.clone(),
            bindings: self.bindings.clone(),
        }
    }

    /// The active bindings, sorted by surface name, for failure diagnostics.
    pub fn bindings_snapshot(&self) -> Vec<(VarKey, Value)> {
        let mut bindings: Vec<(VarKey, Value)> = self
            .bindings
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        bindings.sort_by(|(a, _), (b, _)| a.name().cmp(b.name()));
        bindings
    }
}
