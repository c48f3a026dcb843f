//! Sorting and folding built-ins

use std::cmp::Ordering;
use std::rc::Rc;

use crate::runtime::args::Args;
use crate::runtime::coerce::as_function;
use crate::runtime::compare::{compare_values, NullOrder};
use crate::runtime::environment::EvalContext;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::evaluator::apply_function;
use crate::runtime::methods::{Arity, Method, MethodRegistry};
use crate::runtime::values::{Function, Value};

pub fn register(registry: &mut MethodRegistry) {
    registry.register(Rc::new(Sort));
    registry.register(Rc::new(Desc));
    registry.register(Rc::new(Comparator));
    registry.register(Rc::new(Reduce));
}

/// `sort(list, comparator?)` - stable-sorts a copy of the input. Without a
/// comparator, ascending under the null-smallest natural order; with one, the
/// function's numeric result is read as `compare(a, b)` and a null result as
/// "equal".
#[derive(Debug)]
struct Sort;

impl Method for Sort {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn arity(&self) -> Arity {
        Arity::Range(1, 2)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let mut elements = args[0].elements();
        match args.get(1) {
            None => {
                elements.sort_by(|a, b| compare_values(a, b, NullOrder::Smallest));
            }
            Some(comparator) => {
                // sort_by cannot abort mid-sort; remember the first failure
                // and surface it afterwards.
                let mut failed: Option<EvalError> = None;
                elements.sort_by(|a, b| {
                    if failed.is_some() {
                        return Ordering::Equal;
                    }
                    match compare_with(comparator, a, b) {
                        Ok(ordering) => ordering,
                        Err(err) => {
                            failed = Some(err);
                            Ordering::Equal
                        }
                    }
                });
                if let Some(err) = failed {
                    return Err(err);
                }
            }
        }
        Ok(Value::List(elements))
    }
}

/// Interprets a function value as a two-argument comparator.
fn compare_with(comparator: &Value, a: &Value, b: &Value) -> EvalResult<Ordering> {
    let result = apply_function(comparator, &Args::some(vec![a.clone(), b.clone()]))?;
    match result {
        Value::Null => Ok(Ordering::Equal),
        Value::Int(i) => Ok(i.cmp(&0)),
        Value::Float(x) => Ok(x.total_cmp(&0.0)),
        other => Err(EvalError::conversion(format!(
            "comparator must yield a number, got {}",
            other
        ))),
    }
}

/// `desc(fn)` - wraps a function value so that, used as a comparator, it
/// yields the negated comparison; wrapping twice restores the original order.
#[derive(Debug)]
struct Desc;

impl Method for Desc {
    fn name(&self) -> &'static str {
        "desc"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let inner = as_function(&args[0])?;
        Ok(Value::Function(Function::Descending(Rc::new(inner))))
    }
}

/// `comparator(key_fn)` - derives a two-argument comparator from a
/// one-argument sort key, comparing key values under the null-smallest
/// policy.
#[derive(Debug)]
struct Comparator;

impl Method for Comparator {
    fn name(&self) -> &'static str {
        "comparator"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let key = as_function(&args[0])?;
        Ok(Value::Function(Function::KeyComparator(Rc::new(key))))
    }
}

/// `reduce(c, identity, fn)` - left-fold in the collection's iteration
/// order: `acc = fn(acc, element)`.
#[derive(Debug)]
struct Reduce;

impl Method for Reduce {
    fn name(&self) -> &'static str {
        "reduce"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let mut acc = args[1].clone();
        for element in args[0].elements() {
            acc = apply_function(&args[2], &Args::some(vec![acc, element]))?;
        }
        Ok(acc)
    }
}
