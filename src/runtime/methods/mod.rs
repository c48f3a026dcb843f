//! Generic method extension protocol
//!
//! Every built-in or pluggable function is a named node holding an argument
//! expression array; the evaluator computes the arguments left-to-right and
//! hands them to [`Method::apply`]. Two predicates describe a method to the
//! external optimizer: [`Method::can_fold`] marks context-independent methods
//! whose literal applications may be evaluated at compile time, and
//! [`Method::is_side_effect_free`] marks methods that may be reordered or
//! duplicated. Both default to true; time-, ambient-state- and
//! effect-dependent methods override them.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Expr;
use crate::runtime::environment::EvalContext;
use crate::runtime::error::EvalResult;
use crate::runtime::values::Value;

mod aggregate;
mod collections;
mod effects;
mod graph;
mod model;
mod sorting;
mod strings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == *n,
            Arity::AtLeast(n) => count >= *n,
            Arity::Range(min, max) => count >= *min && count <= *max,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
            Arity::Range(min, max) => write!(f, "{} to {}", min, max),
        }
    }
}

pub trait Method: fmt::Debug {
    fn name(&self) -> &'static str;

    fn arity(&self) -> Arity;

    /// Whether a call with all-literal arguments may be evaluated at compile
    /// time. False for time-, locale-, random- and ambient-state-dependent
    /// methods.
    fn can_fold(&self) -> bool {
        true
    }

    /// Whether the optimizer may reorder or duplicate calls. False for
    /// logging, persistence, abort and sleep.
    fn is_side_effect_free(&self) -> bool {
        true
    }

    /// Applies the method to already-evaluated arguments.
    fn apply(&self, args: &[Value], ctx: &mut EvalContext) -> EvalResult<Value>;
}

/// Maps surface names to method implementations for the front end.
/// Registering a duplicate name replaces the earlier entry.
#[derive(Debug, Default)]
pub struct MethodRegistry {
    methods: HashMap<&'static str, Rc<dyn Method>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        MethodRegistry::default()
    }

    /// A registry holding the full built-in library.
    pub fn with_builtins() -> Self {
        let mut registry = MethodRegistry::new();
        collections::register(&mut registry);
        aggregate::register(&mut registry);
        graph::register(&mut registry);
        sorting::register(&mut registry);
        strings::register(&mut registry);
        model::register(&mut registry);
        effects::register(&mut registry);
        registry
    }

    pub fn register(&mut self, method: Rc<dyn Method>) {
        self.methods.insert(method.name(), method);
    }

    pub fn resolve(&self, name: &str) -> Option<Rc<dyn Method>> {
        self.methods.get(name).cloned()
    }

    /// Builds a method-call node, if the name is registered.
    pub fn node(&self, name: &str, args: Vec<Expr>) -> Option<Expr> {
        self.resolve(name).map(|method| Expr::method(method, args))
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.methods.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
