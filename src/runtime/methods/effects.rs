//! Effectful built-ins
//!
//! All of these override the optimizer predicates: none may be folded at
//! compile time, and none may be reordered or duplicated.

use std::io::Write;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use crate::runtime::coerce::{as_i64, as_string};
use crate::runtime::environment::EvalContext;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::methods::{Arity, Method, MethodRegistry};
use crate::runtime::values::Value;

pub fn register(registry: &mut MethodRegistry) {
    registry.register(Rc::new(Log));
    registry.register(Rc::new(Render));
    registry.register(Rc::new(Sleep));
    registry.register(Rc::new(Throw));
}

/// `log(message)` - emits through the `log` facade; the embedder chooses the
/// backend.
#[derive(Debug)]
struct Log;

impl Method for Log {
    fn name(&self) -> &'static str {
        "log"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn can_fold(&self) -> bool {
        false
    }

    fn is_side_effect_free(&self) -> bool {
        false
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        log::info!("{}", as_string(&args[0])?);
        Ok(Value::Null)
    }
}

/// `render(text)` - appends to the ambient render target; evaluating without
/// one is a legible failure.
#[derive(Debug)]
struct Render;

impl Method for Render {
    fn name(&self) -> &'static str {
        "render"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn can_fold(&self) -> bool {
        false
    }

    fn is_side_effect_free(&self) -> bool {
        false
    }

    fn apply(&self, args: &[Value], ctx: &mut EvalContext) -> EvalResult<Value> {
        let text = as_string(&args[0])?;
        let output = ctx
            .services()
            .output()
            .cloned()
            .ok_or_else(|| EvalError::general("no render target in this context"))?;
        output
            .borrow_mut()
            .write_all(text.as_bytes())
            .map_err(|err| EvalError::general(format!("render target failed: {}", err)))?;
        Ok(Value::Null)
    }
}

/// `sleep(millis)` - parks the calling thread. The only point where
/// evaluation yields the processor.
#[derive(Debug)]
struct Sleep;

impl Method for Sleep {
    fn name(&self) -> &'static str {
        "sleep"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn can_fold(&self) -> bool {
        false
    }

    fn is_side_effect_free(&self) -> bool {
        false
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let millis = as_i64(&args[0])?.max(0) as u64;
        thread::sleep(Duration::from_millis(millis));
        Ok(Value::Null)
    }
}

/// `throw(message)` - raises the user-abort signal. It unwinds to the
/// top-level caller past the wrap-and-attach error handling, so the message
/// surfaces verbatim.
#[derive(Debug)]
struct Throw;

impl Method for Throw {
    fn name(&self) -> &'static str {
        "throw"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn can_fold(&self) -> bool {
        false
    }

    fn is_side_effect_free(&self) -> bool {
        false
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        Err(EvalError::Abort(as_string(&args[0])?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::runtime::environment::Services;
    use crate::runtime::evaluator::eval;
    use crate::runtime::stubs::StubModel;
    use std::cell::RefCell;

    fn registry() -> MethodRegistry {
        MethodRegistry::with_builtins()
    }

    #[test]
    fn throw_aborts_with_the_verbatim_message() {
        let model = Rc::new(StubModel::new());
        let mut ctx = EvalContext::new(model.clone(), model);

        let expr = registry()
            .node("throw", vec![Expr::literal("validation failed")])
            .unwrap_or_else(|| panic!("throw not registered"));

        match eval(&expr, &mut ctx) {
            Err(EvalError::Abort(message)) => assert_eq!(message, "validation failed"),
            other => panic!("expected an abort, got {:?}", other),
        }
    }

    #[test]
    fn render_writes_to_the_ambient_target() {
        let model = Rc::new(StubModel::new());
        let buffer: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let services =
            Services::new(model.clone(), model).with_output(buffer.clone());
        let mut ctx = EvalContext::with_services(services);

        let expr = registry()
            .node("render", vec![Expr::literal("hello")])
            .unwrap_or_else(|| panic!("render not registered"));
        assert!(eval(&expr, &mut ctx).is_ok());
        assert_eq!(&*buffer.borrow(), b"hello");
    }

    #[test]
    fn render_without_a_target_fails_legibly() {
        let model = Rc::new(StubModel::new());
        let mut ctx = EvalContext::new(model.clone(), model);

        let expr = registry()
            .node("render", vec![Expr::literal("hello")])
            .unwrap_or_else(|| panic!("render not registered"));
        let err = match eval(&expr, &mut ctx) {
            Err(err) => err,
            Ok(value) => panic!("unexpected success: {}", value),
        };
        assert!(err.to_string().contains("render target"), "message: {}", err);
    }
}
