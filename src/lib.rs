//! OQL - evaluation engine for an embedded object-query/scripting language
//!
//! A tree-walking interpreter over an immutable expression model that queries
//! and mutates a business-object graph behind a narrow accessor boundary.
//! The front end (parser, name resolution, optimizer) and the persistent
//! object model are external collaborators: this crate consumes a node tree
//! whose variable references are already bound to unique definition keys, and
//! talks to the object graph exclusively through [`runtime::ModelAccess`].
//!
//! The essentials:
//!
//! - closures capture an immutable snapshot of their defining scope
//!   ([`runtime::EvalContext::snapshot`]), with a fast path when a function
//!   is applied on the spot rather than escaping;
//! - object-model reads unify single objects and collections through
//!   flat-map semantics ([`runtime::flatmap::FlatMapOp`]);
//! - comparison and equality are null-aware ([`runtime::compare`]);
//! - graph recursion is cycle-safe through a global seen-set, and the
//!   built-in library is extensible through [`runtime::Method`].
//!
//! ```
//! use std::rc::Rc;
//! use oql::ast::{Expr, VarKey};
//! use oql::runtime::{eval_arg, EvalContext, MethodRegistry, Value};
//! use oql::runtime::stubs::StubModel;
//!
//! let model = Rc::new(StubModel::new());
//! let mut ctx = EvalContext::new(model.clone(), model);
//!
//! // x -> x + 1
//! let x = VarKey::new("x");
//! let succ = Expr::lambda(&x, Expr::add(Expr::var(&x), Expr::literal(1i64)));
//! let result = eval_arg(&succ, &mut ctx, Value::Int(41));
//! assert_eq!(result.ok(), Some(Value::Float(42.0)));
//!
//! let _registry = MethodRegistry::with_builtins();
//! ```

pub mod ast;
pub mod runtime;
pub mod visit;

pub use ast::{Expr, VarKey};
pub use runtime::{
    eval, eval_arg, eval_args, eval_with, Args, EvalContext, EvalError, EvalResult,
    MethodRegistry, Value,
};
pub use visit::{ExprPrinter, Visitor};
