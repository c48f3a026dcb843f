//! Collection built-ins

use std::rc::Rc;

use indexmap::IndexSet;

use crate::runtime::args::Args;
use crate::runtime::coerce::as_i64;
use crate::runtime::compare::is_equal;
use crate::runtime::environment::EvalContext;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::evaluator::apply_function;
use crate::runtime::methods::{Arity, Method, MethodRegistry};
use crate::runtime::values::Value;

pub fn register(registry: &mut MethodRegistry) {
    registry.register(Rc::new(ListOf));
    registry.register(Rc::new(Singleton));
    registry.register(Rc::new(Union));
    registry.register(Rc::new(Size));
    registry.register(Rc::new(IsEmpty));
    registry.register(Rc::new(ContainsElement));
    registry.register(Rc::new(At));
    registry.register(Rc::new(Filter));
    registry.register(Rc::new(MapOver));
    registry.register(Rc::new(Foreach));
}

/// `list(v...)` - the arguments as a list.
#[derive(Debug)]
struct ListOf;

impl Method for ListOf {
    fn name(&self) -> &'static str {
        "list"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(0)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        Ok(Value::List(args.to_vec()))
    }
}

/// `singleton(v)` - a one-element set.
#[derive(Debug)]
struct Singleton;

impl Method for Singleton {
    fn name(&self) -> &'static str {
        "singleton"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let mut set = IndexSet::new();
        set.insert(args[0].clone());
        Ok(Value::Set(set))
    }
}

/// `union(c...)` - set union of the arguments; null arguments contribute
/// nothing, scalar arguments contribute themselves.
#[derive(Debug)]
struct Union;

impl Method for Union {
    fn name(&self) -> &'static str {
        "union"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(0)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let mut set = IndexSet::new();
        for arg in args {
            set.extend(arg.elements());
        }
        Ok(Value::Set(set))
    }
}

/// `size(c)` - element count; null counts zero, a scalar counts one.
#[derive(Debug)]
struct Size;

impl Method for Size {
    fn name(&self) -> &'static str {
        "size"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        Ok(Value::Int(args[0].collection_len() as i64))
    }
}

/// `is_empty(c)`
#[derive(Debug)]
struct IsEmpty;

impl Method for IsEmpty {
    fn name(&self) -> &'static str {
        "is_empty"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        Ok(Value::Bool(args[0].collection_len() == 0))
    }
}

/// `contains_element(c, v)` - membership under script equality, so `[1, 2]`
/// contains `1.0`.
#[derive(Debug)]
struct ContainsElement;

impl Method for ContainsElement {
    fn name(&self) -> &'static str {
        "contains_element"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let found = args[0]
            .elements()
            .iter()
            .any(|element| is_equal(element, &args[1]));
        Ok(Value::Bool(found))
    }
}

/// `at(container, key)` - map lookup under script equality, or list indexing
/// by number; a missing key or an out-of-range index yields null.
#[derive(Debug)]
struct At;

impl Method for At {
    fn name(&self) -> &'static str {
        "at"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        match &args[0] {
            Value::Null => Ok(Value::Null),
            Value::Map(map) => Ok(map
                .iter()
                .find(|(key, _)| is_equal(key, &args[1]))
                .map(|(_, value)| value.clone())
                .unwrap_or(Value::Null)),
            Value::List(list) => {
                let index = as_i64(&args[1])?;
                if index < 0 {
                    return Ok(Value::Null);
                }
                Ok(list.get(index as usize).cloned().unwrap_or(Value::Null))
            }
            other => Err(EvalError::conversion(format!(
                "cannot index into {}",
                other
            ))),
        }
    }
}

/// `filter(c, pred)` - the elements whose predicate result is truthy.
#[derive(Debug)]
struct Filter;

impl Method for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let mut out = Vec::new();
        for element in args[0].elements() {
            let keep = apply_function(&args[1], &Args::some(vec![element.clone()]))?;
            if keep.is_true() {
                out.push(element);
            }
        }
        Ok(Value::List(out))
    }
}

/// `map(c, fn)` - per-element results, in order; null results are kept.
#[derive(Debug)]
struct MapOver;

impl Method for MapOver {
    fn name(&self) -> &'static str {
        "map"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let mut out = Vec::new();
        for element in args[0].elements() {
            out.push(apply_function(&args[1], &Args::some(vec![element]))?);
        }
        Ok(Value::List(out))
    }
}

/// `foreach(c, fn)` - applies `fn` to every element purely for its effects.
#[derive(Debug)]
struct Foreach;

impl Method for Foreach {
    fn name(&self) -> &'static str {
        "foreach"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn can_fold(&self) -> bool {
        false
    }

    fn is_side_effect_free(&self) -> bool {
        false
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        for element in args[0].elements() {
            apply_function(&args[1], &Args::some(vec![element]))?;
        }
        Ok(Value::Null)
    }
}
