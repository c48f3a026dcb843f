//! Tree-walking evaluator
//!
//! All evaluation funnels through [`eval_with`]: it delegates to the per-node
//! logic and attributes any not-yet-attributed failure to the failing node,
//! with the pending arguments and active bindings attached. Aborts and
//! already-attributed failures pass through unchanged, so a failure is
//! wrapped exactly once, at its origin.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::ast::{ArithOp, CompareKind, Expr};
use crate::runtime::args::Args;
use crate::runtime::coerce::{as_number, as_object_non_null};
use crate::runtime::compare::{compare_values, is_equal, text_of, NullOrder};
use crate::runtime::environment::EvalContext;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::flatmap::{AttributeRead, FlatMapOp};
use crate::runtime::values::{Closure, Function, Message, Value};

/// Evaluates `expr` with no pending arguments.
pub fn eval(expr: &Expr, ctx: &mut EvalContext) -> EvalResult<Value> {
    eval_with(expr, ctx, Args::none())
}

/// Evaluates `expr` as a function of one argument.
pub fn eval_arg(expr: &Expr, ctx: &mut EvalContext, arg: Value) -> EvalResult<Value> {
    eval_with(expr, ctx, Args::some(vec![arg]))
}

/// Evaluates `expr` as a function of several arguments.
pub fn eval_args(expr: &Expr, ctx: &mut EvalContext, values: Vec<Value>) -> EvalResult<Value> {
    eval_with(expr, ctx, Args::some(values))
}

/// The single evaluation boundary: evaluates `expr` against `ctx` and the
/// pending `args`, attributing failures to the node that raised them.
pub fn eval_with(expr: &Expr, ctx: &mut EvalContext, args: Args) -> EvalResult<Value> {
    match internal_eval(expr, ctx, &args) {
        Ok(value) => Ok(value),
        Err(err @ (EvalError::Abort(_) | EvalError::Failure(_))) => Err(err),
        Err(unattributed) => Err(unattributed.attributed(expr, &args, ctx.bindings_snapshot())),
    }
}

fn internal_eval(expr: &Expr, ctx: &mut EvalContext, args: &Args) -> EvalResult<Value> {
    match expr {
        Expr::Literal(value) => apply_function(value, args),

        Expr::Var(var) => {
            let value = ctx.get_var(&var.key)?;
            apply_function(&value, args)
        }

        Expr::Lambda(lambda) => match args.value() {
            // Fast path: the function is applied right here, so bind into the
            // current context instead of paying for a snapshot. The binding
            // is removed again when the body returns.
            Some(head) => {
                ctx.define_var(lambda.param.clone(), head.clone());
                let result = eval_with(&lambda.body, ctx, args.next());
                ctx.delete_var(&lambda.param);
                result
            }
            // The function value escapes: capture a snapshot so later
            // mutation of the defining scope cannot leak in.
            None => Ok(Value::Function(Function::Closure(Rc::new(Closure {
                param: lambda.param.clone(),
                body: Rc::clone(&lambda.body),
                captured: ctx.snapshot(),
            })))),
        },

        Expr::Call(call) => {
            let argument = eval(&call.argument, ctx)?;
            eval_with(&call.function, ctx, Args::cons(argument, args.clone()))
        }

        Expr::Block(exprs) => match exprs.split_last() {
            None => Ok(Value::Null),
            Some((last, init)) => {
                for child in init {
                    eval(child, ctx)?;
                }
                eval_with(last, ctx, args.clone())
            }
        },

        Expr::If(cond) => {
            let condition = eval(&cond.condition, ctx)?;
            if condition.is_true() {
                eval_with(&cond.then_branch, ctx, args.clone())
            } else {
                eval_with(&cond.else_branch, ctx, args.clone())
            }
        }

        Expr::And(and) => {
            let left = eval(&and.left, ctx)?;
            let result = if left.is_true() {
                eval(&and.right, ctx)?
            } else {
                Value::Bool(false)
            };
            apply_function(&result, args)
        }

        Expr::Or(or) => {
            let left = eval(&or.left, ctx)?;
            let result = if left.is_true() {
                // The actual left value, not a coerced boolean, so that
                // `x || default` yields x itself.
                left
            } else {
                eval(&or.right, ctx)?
            };
            apply_function(&result, args)
        }

        Expr::Not(inner) => {
            let value = eval(inner, ctx)?;
            apply_function(&Value::Bool(!value.is_true()), args)
        }

        Expr::Arith(arith) => {
            let left = eval(&arith.left, ctx)?;
            let right = eval(&arith.right, ctx)?;
            let result = eval_arith(arith.op, &left, &right)?;
            apply_function(&result, args)
        }

        Expr::Compare(cmp) => {
            let left = eval(&cmp.left, ctx)?;
            let right = eval(&cmp.right, ctx)?;
            let result = if left.is_null() || right.is_null() {
                // Three-valued logic: a null operand makes the relation null.
                Value::Null
            } else {
                let ordering = compare_values(&left, &right, NullOrder::Largest);
                Value::Bool(match cmp.kind {
                    CompareKind::Lt => ordering == Ordering::Less,
                    CompareKind::Le => ordering != Ordering::Greater,
                    CompareKind::Gt => ordering == Ordering::Greater,
                    CompareKind::Ge => ordering != Ordering::Less,
                })
            };
            apply_function(&result, args)
        }

        Expr::IsEqual(eq) => {
            let left = eval(&eq.left, ctx)?;
            let right = eval(&eq.right, ctx)?;
            apply_function(&Value::Bool(is_equal(&left, &right)), args)
        }

        Expr::Access(access) => {
            let base = eval(&access.target, ctx)?;
            let result = AttributeRead.eval_potential_flat_map(ctx, &base, &access.part)?;
            apply_function(&result, args)
        }

        Expr::Update(update) => {
            let target = eval(&update.target, ctx)?;
            let obj = as_object_non_null(&target)?;
            let value = eval(&update.value, ctx)?;
            log::trace!("updating {} on {}", update.part, obj);
            ctx.services().model().set_value(&obj, &update.part, value)?;
            Ok(Value::Null)
        }

        Expr::MethodCall(call) => {
            let arity = call.method.arity();
            if !arity.accepts(call.args.len()) {
                return Err(EvalError::arity_mismatch(
                    call.method.name(),
                    arity,
                    call.args.len(),
                ));
            }
            let mut values = Vec::with_capacity(call.args.len());
            for arg in &call.args {
                values.push(eval(arg, ctx)?);
            }
            let result = call.method.apply(&values, ctx)?;
            apply_function(&result, args)
        }
    }
}

/// Applies a value to pending arguments. Function values consume them; any
/// other value acts as a constant function that ignores its arguments, the
/// uniform behavior for "value used where function expected".
pub fn apply_function(value: &Value, args: &Args) -> EvalResult<Value> {
    if !args.has_value() {
        return Ok(value.clone());
    }
    match value {
        Value::Function(function) => apply(function, args),
        constant => Ok(constant.clone()),
    }
}

fn apply(function: &Function, args: &Args) -> EvalResult<Value> {
    match function {
        Function::Closure(closure) => match args.value() {
            None => Ok(Value::Function(function.clone())),
            Some(head) => {
                // Each application runs in a fresh copy of the captured
                // snapshot: recursive self-application cannot clobber an
                // outer call's binding, and the snapshot itself stays
                // immutable.
                let mut env = closure.captured.clone();
                let _guard = env.services().enter_call()?;
                env.define_var(closure.param.clone(), head.clone());
                eval_with(&closure.body, &mut env, args.next())
            }
        },

        Function::KeyComparator(key) => {
            let values = args.to_vec();
            if values.len() != 2 {
                return Err(EvalError::arity_mismatch("comparator", "exactly 2", values.len()));
            }
            let left = apply(key, &Args::some(vec![values[0].clone()]))?;
            let right = apply(key, &Args::some(vec![values[1].clone()]))?;
            let ordering = compare_values(&left, &right, NullOrder::Smallest);
            Ok(Value::Int(match ordering {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            }))
        }

        Function::Descending(inner) => match apply(inner, args)? {
            Value::Null => Ok(Value::Null),
            Value::Int(i) => Ok(Value::Int(-i)),
            Value::Float(x) => Ok(Value::Float(-x)),
            other => Err(EvalError::conversion(format!(
                "comparator must yield a number, got {}",
                other
            ))),
        },
    }
}

/// Arithmetic node semantics.
///
/// Collections map element-wise. `+` concatenates when either operand is
/// string-like (joining messages as messages) and otherwise treats a null
/// operand as the identity; the remaining operators propagate null and widen
/// both operands to double, with IEEE 754 semantics (division by zero yields
/// an infinity, not an error).
pub fn eval_arith(op: ArithOp, left: &Value, right: &Value) -> EvalResult<Value> {
    if left.is_collection() {
        let mut out = Vec::new();
        for element in left.elements() {
            out.push(eval_arith(op, &element, right)?);
        }
        return Ok(Value::List(out));
    }
    if right.is_collection() {
        let mut out = Vec::new();
        for element in right.elements() {
            out.push(eval_arith(op, left, &element)?);
        }
        return Ok(Value::List(out));
    }

    if let ArithOp::Add = op {
        if left.is_string_like() || right.is_string_like() {
            if matches!(left, Value::Message(_)) || matches!(right, Value::Message(_)) {
                let joined = Message::join(&to_message(left), &to_message(right));
                return Ok(Value::Message(Rc::new(joined)));
            }
            return Ok(Value::Str(format!("{}{}", text_of(left), text_of(right))));
        }
        if left.is_null() {
            return Ok(right.clone());
        }
        if right.is_null() {
            return Ok(left.clone());
        }
        return Ok(Value::Float(as_number(left)? + as_number(right)?));
    }

    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let l = as_number(left)?;
    let r = as_number(right)?;
    let result = match op {
        ArithOp::Sub => l - r,
        ArithOp::Mul => l * r,
        ArithOp::Div => l / r,
        ArithOp::Mod => l % r,
        ArithOp::Add => unreachable!("handled above"),
    };
    Ok(Value::Float(result))
}

fn to_message(value: &Value) -> Message {
    match value {
        Value::Message(m) => (**m).clone(),
        other => Message::Text(text_of(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::VarKey;
    use crate::runtime::environment::{EvalOptions, Services};
    use crate::runtime::error::FailureKind;
    use crate::runtime::stubs::StubModel;
    use pretty_assertions::assert_eq;

    fn context() -> EvalContext {
        let model = Rc::new(StubModel::new());
        EvalContext::new(model.clone(), model)
    }

    #[test]
    fn block_yields_last_child() {
        let mut ctx = context();
        let expr = Expr::block(vec![Expr::literal(1i64), Expr::literal(2i64)]);
        assert_eq!(eval(&expr, &mut ctx).ok(), Some(Value::Int(2)));
        assert_eq!(eval(&Expr::block(vec![]), &mut ctx).ok(), Some(Value::Null));
    }

    #[test]
    fn conditional_evaluates_exactly_one_branch() {
        let mut ctx = context();
        // The losing branch references an undefined variable; evaluating it
        // would fail.
        let missing = VarKey::new("missing");
        let expr = Expr::if_else(
            Expr::literal("x"),
            Expr::literal(1i64),
            Expr::var(&missing),
        );
        assert_eq!(eval(&expr, &mut ctx).ok(), Some(Value::Int(1)));
    }

    #[test]
    fn or_yields_the_actual_left_value() {
        let mut ctx = context();
        let expr = Expr::or(Expr::literal("value"), Expr::literal("default"));
        assert_eq!(
            eval(&expr, &mut ctx).ok(),
            Some(Value::Str("value".to_string()))
        );

        let expr = Expr::or(Expr::null(), Expr::literal("default"));
        assert_eq!(
            eval(&expr, &mut ctx).ok(),
            Some(Value::Str("default".to_string()))
        );
    }

    #[test]
    fn and_short_circuits_to_false() {
        let mut ctx = context();
        let missing = VarKey::new("missing");
        let expr = Expr::and(Expr::null(), Expr::var(&missing));
        assert_eq!(eval(&expr, &mut ctx).ok(), Some(Value::Bool(false)));

        let expr = Expr::and(Expr::literal(true), Expr::literal(7i64));
        assert_eq!(eval(&expr, &mut ctx).ok(), Some(Value::Int(7)));
    }

    #[test]
    fn arithmetic_widens_to_double() {
        let mut ctx = context();
        let expr = Expr::add(Expr::literal(1i64), Expr::literal(2i64));
        assert_eq!(eval(&expr, &mut ctx).ok(), Some(Value::Float(3.0)));

        let expr = Expr::div(Expr::literal(5i64), Expr::literal(2i64));
        assert_eq!(eval(&expr, &mut ctx).ok(), Some(Value::Float(2.5)));
    }

    #[test]
    fn division_by_zero_is_not_an_error() {
        let mut ctx = context();
        let expr = Expr::div(Expr::literal(5i64), Expr::literal(0i64));
        assert_eq!(
            eval(&expr, &mut ctx).ok(),
            Some(Value::Float(f64::INFINITY))
        );
    }

    #[test]
    fn null_addition_yields_the_other_operand() {
        assert_eq!(
            eval_arith(ArithOp::Add, &Value::Null, &Value::Int(1)).ok(),
            Some(Value::Int(1))
        );
        assert_eq!(
            eval_arith(ArithOp::Add, &Value::Int(1), &Value::Null).ok(),
            Some(Value::Int(1))
        );
        assert_eq!(
            eval_arith(ArithOp::Mul, &Value::Null, &Value::Int(5)).ok(),
            Some(Value::Null)
        );
        assert_eq!(
            eval_arith(ArithOp::Sub, &Value::Int(5), &Value::Null).ok(),
            Some(Value::Null)
        );
    }

    #[test]
    fn string_addition_concatenates() {
        assert_eq!(
            eval_arith(ArithOp::Add, &Value::Null, &Value::Str("x".to_string())).ok(),
            Some(Value::Str("x".to_string()))
        );
        assert_eq!(
            eval_arith(ArithOp::Add, &Value::Int(1), &Value::Str("2".to_string())).ok(),
            Some(Value::Str("12".to_string()))
        );
        assert_eq!(
            eval_arith(
                ArithOp::Add,
                &Value::Str("Hello".to_string()),
                &Value::Str("World".to_string())
            )
            .ok(),
            Some(Value::Str("HelloWorld".to_string()))
        );
    }

    #[test]
    fn message_addition_joins_messages() {
        let key = Value::Message(Rc::new(Message::Key("order.confirmed".to_string())));
        let joined = eval_arith(ArithOp::Add, &key, &Value::Str("!".to_string())).ok();
        match joined {
            Some(Value::Message(message)) => {
                assert_eq!(message.to_string(), "order.confirmed!");
            }
            other => panic!("expected a message, got {:?}", other),
        }
    }

    #[test]
    fn list_arithmetic_maps_element_wise() {
        let list = Value::List(vec![
            Value::Int(5),
            Value::Int(3),
            Value::Int(2),
            Value::Int(1),
        ]);
        assert_eq!(
            eval_arith(ArithOp::Add, &list, &Value::Int(2)).ok(),
            Some(Value::List(vec![
                Value::Float(7.0),
                Value::Float(5.0),
                Value::Float(4.0),
                Value::Float(3.0),
            ]))
        );
        assert_eq!(
            eval_arith(ArithOp::Add, &list, &Value::Str("!".to_string())).ok(),
            Some(Value::List(vec![
                Value::Str("5!".to_string()),
                Value::Str("3!".to_string()),
                Value::Str("2!".to_string()),
                Value::Str("1!".to_string()),
            ]))
        );
    }

    #[test]
    fn relational_with_null_is_null() {
        let mut ctx = context();
        let expr = Expr::gt(Expr::null(), Expr::literal(1i64));
        assert_eq!(eval(&expr, &mut ctx).ok(), Some(Value::Null));

        let expr = Expr::gt(Expr::literal(2i64), Expr::literal(1i64));
        assert_eq!(eval(&expr, &mut ctx).ok(), Some(Value::Bool(true)));

        let expr = Expr::compare(CompareKind::Ge, Expr::literal(1i64), Expr::literal(1.0));
        assert_eq!(eval(&expr, &mut ctx).ok(), Some(Value::Bool(true)));
    }

    #[test]
    fn lambda_applies_and_curries() {
        let mut ctx = context();
        let x = VarKey::new("x");
        let y = VarKey::new("y");
        // x -> y -> x / y
        let expr = Expr::lambda(
            &x,
            Expr::lambda(&y, Expr::div(Expr::var(&x), Expr::var(&y))),
        );
        let result = eval_args(&expr, &mut ctx, vec![Value::Int(5), Value::Int(2)]);
        assert_eq!(result.ok(), Some(Value::Float(2.5)));
    }

    #[test]
    fn fast_path_binding_is_removed_after_the_body() {
        let mut ctx = context();
        let x = VarKey::new("x");
        let expr = Expr::lambda(&x, Expr::var(&x));
        assert_eq!(
            eval_arg(&expr, &mut ctx, Value::Int(3)).ok(),
            Some(Value::Int(3))
        );
        assert!(ctx.get_var(&x).is_err());
    }

    #[test]
    fn closure_capture_isolation() {
        let mut ctx = context();
        let x = VarKey::new("x");
        ctx.define_var(x.clone(), Value::Int(1));

        // K = () -> x, built while x = 1.
        let lambda = Expr::lambda(&VarKey::new("ignored"), Expr::var(&x));
        let closure = match eval(&lambda, &mut ctx) {
            Ok(value) => value,
            Err(err) => panic!("closure construction failed: {}", err),
        };

        // Mutate the outer binding afterwards.
        ctx.define_var(x.clone(), Value::Int(2));

        let result = apply_function(&closure, &Args::some(vec![Value::Null]));
        assert_eq!(result.ok(), Some(Value::Int(1)));
    }

    #[test]
    fn value_where_function_expected_acts_as_constant() {
        let mut ctx = context();
        let expr = Expr::call(Expr::literal(42i64), Expr::literal(1i64));
        assert_eq!(eval(&expr, &mut ctx).ok(), Some(Value::Int(42)));
    }

    #[test]
    fn undefined_variable_is_attributed() {
        let mut ctx = context();
        let ghost = VarKey::new("ghost");
        let expr = Expr::var(&ghost);
        let err = match eval(&expr, &mut ctx) {
            Err(err) => err,
            Ok(value) => panic!("unexpected success: {}", value),
        };
        let failure = err.failure().cloned();
        assert!(failure.is_some());
        if let Some(failure) = failure {
            assert_eq!(failure.kind, FailureKind::UndefinedVariable);
            assert!(failure.message.contains("ghost"));
        }
    }

    #[test]
    fn failure_carries_arguments_and_bindings() {
        let mut ctx = context();
        let held = VarKey::new("held");
        ctx.define_var(held.clone(), Value::Int(9));

        let ghost = VarKey::new("ghost");
        let expr = Expr::call(Expr::var(&ghost), Expr::literal(5i64));
        let err = match eval(&expr, &mut ctx) {
            Err(err) => err,
            Ok(value) => panic!("unexpected success: {}", value),
        };
        let failure = match err.failure() {
            Some(failure) => failure.clone(),
            None => panic!("expected an attributed failure"),
        };
        assert_eq!(failure.args.to_vec(), vec![Value::Int(5)]);
        assert!(failure
            .bindings
            .iter()
            .any(|(key, value)| key.name() == "held" && *value == Value::Int(9)));
    }

    #[test]
    fn deep_application_chains_hit_the_depth_limit() {
        let model = Rc::new(StubModel::new());
        let services = Services::new(model.clone(), model)
            .with_options(EvalOptions { max_call_depth: 16 });
        let mut ctx = EvalContext::with_services(services);

        // g_0 = x -> 1; g_i = x -> g_{i-1}(x). Applying g_32 nests 33
        // closure applications.
        let x0 = VarKey::new("x");
        let base = Expr::lambda(&x0, Expr::literal(1i64));
        let mut current = match eval(&base, &mut ctx) {
            Ok(value) => value,
            Err(err) => panic!("closure construction failed: {}", err),
        };
        for _ in 0..32 {
            let g = VarKey::new("g");
            ctx.define_var(g.clone(), current);
            let x = VarKey::new("x");
            let wrapper = Expr::lambda(&x, Expr::call(Expr::var(&g), Expr::var(&x)));
            current = match eval(&wrapper, &mut ctx) {
                Ok(value) => value,
                Err(err) => panic!("closure construction failed: {}", err),
            };
        }

        let err = match apply_function(&current, &Args::some(vec![Value::Int(0)])) {
            Err(err) => err,
            Ok(value) => panic!("unexpected success: {}", value),
        };
        assert!(err.to_string().contains("depth"), "unexpected error: {}", err);
    }
}
