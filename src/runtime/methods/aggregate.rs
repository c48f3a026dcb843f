//! Numeric aggregation built-ins

use std::rc::Rc;

use crate::runtime::coerce::as_number;
use crate::runtime::environment::EvalContext;
use crate::runtime::error::EvalResult;
use crate::runtime::methods::{Arity, Method, MethodRegistry};
use crate::runtime::values::Value;

pub fn register(registry: &mut MethodRegistry) {
    registry.register(Rc::new(Sum));
    registry.register(Rc::new(Min));
    registry.register(Rc::new(Max));
    registry.register(Rc::new(Average));
    registry.register(Rc::new(Floor));
    registry.register(Rc::new(Ceil));
    registry.register(Rc::new(Round));
}

/// The numeric operands of an aggregation: arguments flattened one level,
/// nulls dropped.
fn operands(args: &[Value]) -> EvalResult<Vec<f64>> {
    let mut out = Vec::new();
    for arg in args {
        for element in arg.elements() {
            if element.is_null() {
                continue;
            }
            out.push(as_number(&element)?);
        }
    }
    Ok(out)
}

/// `sum(...)` - 0 for empty or all-null input.
#[derive(Debug)]
struct Sum;

impl Method for Sum {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(0)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        Ok(Value::Float(operands(args)?.iter().sum()))
    }
}

/// `min(...)` - null for empty or all-null input.
#[derive(Debug)]
struct Min;

impl Method for Min {
    fn name(&self) -> &'static str {
        "min"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(0)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let result = operands(args)?.into_iter().reduce(f64::min);
        Ok(result.map(Value::Float).unwrap_or(Value::Null))
    }
}

/// `max(...)` - null for empty or all-null input.
#[derive(Debug)]
struct Max;

impl Method for Max {
    fn name(&self) -> &'static str {
        "max"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(0)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let result = operands(args)?.into_iter().reduce(f64::max);
        Ok(result.map(Value::Float).unwrap_or(Value::Null))
    }
}

/// `average(...)` - null for empty or all-null input.
#[derive(Debug)]
struct Average;

impl Method for Average {
    fn name(&self) -> &'static str {
        "average"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(0)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let values = operands(args)?;
        if values.is_empty() {
            return Ok(Value::Null);
        }
        Ok(Value::Float(
            values.iter().sum::<f64>() / values.len() as f64,
        ))
    }
}

macro_rules! rounding_method {
    ($struct_name:ident, $name:literal, $op:ident) => {
        #[doc = concat!("`", $name, "(x)`")]
        #[derive(Debug)]
        struct $struct_name;

        impl Method for $struct_name {
            fn name(&self) -> &'static str {
                $name
            }

            fn arity(&self) -> Arity {
                Arity::Exact(1)
            }

            fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
                Ok(Value::Float(as_number(&args[0])?.$op()))
            }
        }
    };
}

rounding_method!(Floor, "floor", floor);
rounding_method!(Ceil, "ceil", ceil);
rounding_method!(Round, "round", round);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::runtime::evaluator::eval;
    use crate::runtime::stubs::StubModel;
    use pretty_assertions::assert_eq;

    fn context() -> EvalContext {
        let model = Rc::new(StubModel::new());
        EvalContext::new(model.clone(), model)
    }

    fn call(ctx: &mut EvalContext, name: &str, args: Vec<Value>) -> Option<Value> {
        let registry = MethodRegistry::with_builtins();
        let expr = registry
            .node(name, args.into_iter().map(Expr::literal).collect())
            .unwrap_or_else(|| panic!("{} not registered", name));
        eval(&expr, ctx).ok()
    }

    fn ints(values: &[i64]) -> Value {
        Value::List(values.iter().map(|i| Value::Int(*i)).collect())
    }

    #[test]
    fn sum_drops_nulls_and_defaults_to_zero() {
        let mut ctx = context();
        assert_eq!(
            call(&mut ctx, "sum", vec![Value::Int(3), Value::Int(5), Value::Null]),
            Some(Value::Float(8.0))
        );
        assert_eq!(
            call(&mut ctx, "sum", vec![ints(&[3, 3])]),
            Some(Value::Float(6.0))
        );
        assert_eq!(call(&mut ctx, "sum", vec![]), Some(Value::Float(0.0)));
        assert_eq!(
            call(&mut ctx, "sum", vec![Value::Null]),
            Some(Value::Float(0.0))
        );
    }

    #[test]
    fn min_and_max_default_to_null() {
        let mut ctx = context();
        assert_eq!(
            call(
                &mut ctx,
                "min",
                vec![Value::Int(3), Value::Int(5), Value::Int(-1)]
            ),
            Some(Value::Float(-1.0))
        );
        assert_eq!(
            call(&mut ctx, "max", vec![Value::Int(3), Value::Int(5), Value::Null]),
            Some(Value::Float(5.0))
        );
        assert_eq!(call(&mut ctx, "min", vec![]), Some(Value::Null));
        assert_eq!(call(&mut ctx, "max", vec![Value::Null]), Some(Value::Null));
    }

    #[test]
    fn average_skips_nulls_in_nested_collections() {
        let mut ctx = context();
        assert_eq!(
            call(
                &mut ctx,
                "average",
                vec![
                    Value::Null,
                    Value::List(vec![Value::Null, Value::Int(3)]),
                    Value::Null
                ]
            ),
            Some(Value::Float(3.0))
        );
        assert_eq!(
            call(&mut ctx, "average", vec![Value::Int(3), Value::Int(5)]),
            Some(Value::Float(4.0))
        );
        assert_eq!(call(&mut ctx, "average", vec![]), Some(Value::Null));
    }

    #[test]
    fn rounding() {
        let mut ctx = context();
        assert_eq!(
            call(&mut ctx, "floor", vec![Value::Float(2.5)]),
            Some(Value::Float(2.0))
        );
        assert_eq!(
            call(&mut ctx, "ceil", vec![Value::Float(2.5)]),
            Some(Value::Float(3.0))
        );
        assert_eq!(
            call(&mut ctx, "round", vec![Value::Float(2.4)]),
            Some(Value::Float(2.0))
        );
    }
}
