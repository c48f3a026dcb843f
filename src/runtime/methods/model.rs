//! Object-model built-ins
//!
//! The script-visible face of the [`ModelAccess`] boundary. All read-like
//! operations go through flat-map semantics so a caller may hand them a
//! single object or a prior query result; writes stay on the `Update` node,
//! which demands an explicit single target.

use std::rc::Rc;

use crate::runtime::coerce::{as_object, as_part, as_type};
use crate::runtime::environment::EvalContext;
use crate::runtime::error::EvalResult;
use crate::runtime::flatmap::{AttributeRead, FlatMapOp};
use crate::runtime::host_interface::{PartRef, TypeRef};
use crate::runtime::methods::{Arity, Method, MethodRegistry};
use crate::runtime::values::Value;

pub fn register(registry: &mut MethodRegistry) {
    registry.register(Rc::new(Get));
    registry.register(Rc::new(Delete));
    registry.register(Rc::new(Referers));
    registry.register(Rc::new(InstanceOf));
    registry.register(Rc::new(All));
}

/// `get(target, part)` - dynamic attribute read: like the `Access` node, but
/// with the attribute descriptor computed at run time.
#[derive(Debug)]
struct Get;

impl Method for Get {
    fn name(&self) -> &'static str {
        "get"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn can_fold(&self) -> bool {
        false
    }

    fn apply(&self, args: &[Value], ctx: &mut EvalContext) -> EvalResult<Value> {
        let part = as_part(&args[1])?;
        AttributeRead.eval_potential_flat_map(ctx, &args[0], &part)
    }
}

/// `delete(target)` - removes the target object(s) from the model; nulls in
/// a collection target are skipped by flat-map semantics.
#[derive(Debug)]
struct Delete;

#[derive(Debug)]
struct DeleteOp;

impl FlatMapOp for DeleteOp {
    type Param = ();

    fn eval_direct(&self, ctx: &mut EvalContext, base: &Value, _param: &()) -> EvalResult<Value> {
        match as_object(base)? {
            None => Ok(Value::Null),
            Some(obj) => {
                log::debug!("deleting {}", obj);
                ctx.services().model().delete_object(&obj)?;
                Ok(Value::Null)
            }
        }
    }
}

impl Method for Delete {
    fn name(&self) -> &'static str {
        "delete"
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
        DeleteOp.eval_potential_flat_map(ctx, &args[0], &())?;
        Ok(Value::Null)
    }
}

/// `referers(target, reference)` - the objects whose `reference` attribute
/// points at the target; collection results from several targets are spliced
/// into one list.
#[derive(Debug)]
struct Referers;

#[derive(Debug)]
struct ReferersOp;

impl FlatMapOp for ReferersOp {
    type Param = PartRef;

    fn eval_direct(
        &self,
        ctx: &mut EvalContext,
        base: &Value,
        reference: &PartRef,
    ) -> EvalResult<Value> {
        match as_object(base)? {
            None => Ok(Value::Null),
            Some(obj) => {
                let referers = ctx.services().model().referers(&obj, reference)?;
                Ok(Value::List(referers.into_iter().map(Value::Obj).collect()))
            }
        }
    }
}

impl Method for Referers {
    fn name(&self) -> &'static str {
        "referers"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn can_fold(&self) -> bool {
        false
    }

    fn apply(&self, args: &[Value], ctx: &mut EvalContext) -> EvalResult<Value> {
        let reference = as_part(&args[1])?;
        ReferersOp.eval_potential_flat_map(ctx, &args[0], &reference)
    }
}

/// `instance_of(target, type)` - dynamic type test; null is an instance of
/// nothing. Over a collection the per-element booleans are collected.
#[derive(Debug)]
struct InstanceOf;

#[derive(Debug)]
struct InstanceOfOp;

impl FlatMapOp for InstanceOfOp {
    type Param = TypeRef;

    fn eval_direct(
        &self,
        ctx: &mut EvalContext,
        base: &Value,
        ty: &TypeRef,
    ) -> EvalResult<Value> {
        match as_object(base)? {
            None => Ok(Value::Bool(false)),
            Some(obj) => {
                let actual = ctx.services().model().type_of(&obj)?;
                Ok(Value::Bool(ctx.services().types().is_subtype(&actual, ty)))
            }
        }
    }
}

impl Method for InstanceOf {
    fn name(&self) -> &'static str {
        "instance_of"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn can_fold(&self) -> bool {
        false
    }

    fn apply(&self, args: &[Value], ctx: &mut EvalContext) -> EvalResult<Value> {
        let ty = as_type(&args[1])?;
        InstanceOfOp.eval_potential_flat_map(ctx, &args[0], &ty)
    }
}

/// `all(type)` - all instances of a type, including subtype instances.
#[derive(Debug)]
struct All;

impl Method for All {
    fn name(&self) -> &'static str {
        "all"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn can_fold(&self) -> bool {
        false
    }

    fn apply(&self, args: &[Value], ctx: &mut EvalContext) -> EvalResult<Value> {
        let ty = as_type(&args[0])?;
        let instances = ctx.services().model().all_instances(&ty)?;
        Ok(Value::List(instances.into_iter().map(Value::Obj).collect()))
    }
}
