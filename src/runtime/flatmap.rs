//! Singular/collection unification for object-model operations
//!
//! Object-model operations are naturally single-object, but callers routinely
//! hold a prior query result that may be a single object or a collection.
//! [`FlatMapOp`] lifts a single-object primitive over collections so call
//! sites never special-case: implementors provide `eval_direct` only and get
//! the collection behavior for free.

use crate::runtime::coerce::as_object;
use crate::runtime::environment::EvalContext;
use crate::runtime::error::EvalResult;
use crate::runtime::host_interface::PartRef;
use crate::runtime::values::Value;

pub trait FlatMapOp {
    /// Auxiliary argument passed through to every per-element evaluation.
    type Param;

    /// The single-object primitive.
    fn eval_direct(
        &self,
        ctx: &mut EvalContext,
        base: &Value,
        param: &Self::Param,
    ) -> EvalResult<Value>;

    /// Applies `eval_direct` to every element of a collection `base`: null
    /// results are dropped, collection-typed results are spliced in one level
    /// deep, scalar results are appended.
    fn eval_flat_map(
        &self,
        ctx: &mut EvalContext,
        base: &Value,
        param: &Self::Param,
    ) -> EvalResult<Value> {
        let mut out = Vec::new();
        for element in base.elements() {
            let result = self.eval_direct(ctx, &element, param)?;
            match result {
                Value::Null => {}
                Value::List(items) => out.extend(items),
                Value::Set(items) => out.extend(items),
                scalar => out.push(scalar),
            }
        }
        Ok(Value::List(out))
    }

    /// Dispatches on the shape of `base`: collections flat-map, everything
    /// else evaluates directly.
    fn eval_potential_flat_map(
        &self,
        ctx: &mut EvalContext,
        base: &Value,
        param: &Self::Param,
    ) -> EvalResult<Value> {
        if base.is_collection() {
            self.eval_flat_map(ctx, base, param)
        } else {
            self.eval_direct(ctx, base, param)
        }
    }
}

/// Attribute read: the primitive behind the `Access` node and the dynamic
/// `get` method. Reading an attribute of null yields null (and is dropped
/// when flat-mapped).
#[derive(Debug)]
pub struct AttributeRead;

impl FlatMapOp for AttributeRead {
    type Param = PartRef;

    fn eval_direct(
        &self,
        ctx: &mut EvalContext,
        base: &Value,
        part: &PartRef,
    ) -> EvalResult<Value> {
        match as_object(base)? {
            None => Ok(Value::Null),
            Some(obj) => ctx.services().model().get_value(&obj, part),
        }
    }
}
