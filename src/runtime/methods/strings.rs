//! String and coercion built-ins

use std::rc::Rc;

use chrono::Utc;

use crate::runtime::coerce::{as_date, as_number, as_string};
use crate::runtime::environment::EvalContext;
use crate::runtime::error::EvalResult;
use crate::runtime::methods::{Arity, Method, MethodRegistry};
use crate::runtime::values::Value;

pub fn register(registry: &mut MethodRegistry) {
    registry.register(Rc::new(ToString));
    registry.register(Rc::new(ToNumber));
    registry.register(Rc::new(ToDate));
    registry.register(Rc::new(Now));
}

/// `to_string(v)` - plain-text rendition; null renders empty, integral
/// numbers render without a fraction.
#[derive(Debug)]
struct ToString;

impl Method for ToString {
    fn name(&self) -> &'static str {
        "to_string"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        Ok(Value::Str(as_string(&args[0])?))
    }
}

/// `to_number(v)` - numbers pass through, numeric strings parse; anything
/// else is a conversion failure.
#[derive(Debug)]
struct ToNumber;

impl Method for ToNumber {
    fn name(&self) -> &'static str {
        "to_number"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        Ok(Value::Float(as_number(&args[0])?))
    }
}

/// `to_date(v)` - dates pass through, numbers are epoch milliseconds,
/// strings parse as RFC 3339.
#[derive(Debug)]
struct ToDate;

impl Method for ToDate {
    fn name(&self) -> &'static str {
        "to_date"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        Ok(Value::Date(as_date(&args[0])?))
    }
}

/// `now()` - the current instant. Time-dependent, so never folded at compile
/// time.
#[derive(Debug)]
struct Now;

impl Method for Now {
    fn name(&self) -> &'static str {
        "now"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(0)
    }

    fn can_fold(&self) -> bool {
        false
    }

    fn apply(&self, _args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        Ok(Value::Date(Utc::now()))
    }
}
