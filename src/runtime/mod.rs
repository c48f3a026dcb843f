//! OQL Runtime System
//!
//! High-level evaluation entry points and small helpers. The heavy logic is
//! implemented in the submodules listed below.

pub mod args;
pub mod coerce;
pub mod compare;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod flatmap;
pub mod host_interface;
pub mod methods;
pub mod stubs;
pub mod values;

pub use args::Args;
pub use environment::{EvalContext, EvalOptions, Services};
pub use error::{EvalError, EvalResult, EvaluationFailure, FailureKind};
pub use evaluator::{apply_function, eval, eval_arg, eval_args, eval_with};
pub use host_interface::{ModelAccess, ObjRef, PartRef, TypeOracle, TypeRef};
pub use methods::{Arity, Method, MethodRegistry};
pub use values::{Closure, Function, Message, Value};
