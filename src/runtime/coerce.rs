//! Value-coercion helpers
//!
//! Each helper either produces the requested representation or fails with a
//! conversion error naming the offending value; the node boundary attaches
//! the failing expression on the way out. Null handling follows the script
//! conventions: a one-element collection is transparently unwrapped before
//! conversion, and string renditions of null are empty.

use chrono::{DateTime, TimeZone, Utc};

use crate::runtime::compare::text_of;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::host_interface::{ObjRef, PartRef, TypeRef};
use crate::runtime::values::{Function, Value};

/// Unwraps a one-element collection; null for an empty one. More than one
/// element is a conversion failure.
pub fn as_single_element(value: &Value) -> EvalResult<Value> {
    if !value.is_collection() {
        return Ok(value.clone());
    }
    let elements = value.elements();
    match elements.len() {
        0 => Ok(Value::Null),
        1 => Ok(elements.into_iter().next().unwrap_or(Value::Null)),
        n => Err(EvalError::conversion(format!(
            "expected a single element but {} has {} elements",
            value, n
        ))),
    }
}

/// Numeric rendition of a value; numbers pass through, numeric strings parse.
pub fn as_number(value: &Value) -> EvalResult<f64> {
    let single = as_single_element(value)?;
    match &single {
        Value::Null => Ok(0.0),
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::Str(s) => s.parse::<f64>().map_err(|_| {
            EvalError::conversion(format!("cannot read {} as a number", single))
        }),
        _ => Err(EvalError::conversion(format!(
            "cannot use {} as a number",
            single
        ))),
    }
}

pub fn as_i64(value: &Value) -> EvalResult<i64> {
    Ok(as_number(value)? as i64)
}

/// Plain-text rendition; null renders as the empty string.
pub fn as_string(value: &Value) -> EvalResult<String> {
    Ok(text_of(&as_single_element(value)?))
}

/// Object rendition, allowing null (for navigation over missing relations).
pub fn as_object(value: &Value) -> EvalResult<Option<ObjRef>> {
    let single = as_single_element(value)?;
    match single {
        Value::Null => Ok(None),
        Value::Obj(obj) => Ok(Some(obj)),
        other => Err(EvalError::conversion(format!(
            "cannot use {} as an object",
            other
        ))),
    }
}

pub fn as_object_non_null(value: &Value) -> EvalResult<ObjRef> {
    as_object(value)?.ok_or_else(|| EvalError::conversion("unexpected null object".to_string()))
}

pub fn as_type(value: &Value) -> EvalResult<TypeRef> {
    match as_single_element(value)? {
        Value::Type(ty) => Ok(ty),
        other => Err(EvalError::conversion(format!(
            "cannot use {} as a type",
            other
        ))),
    }
}

pub fn as_part(value: &Value) -> EvalResult<PartRef> {
    match as_single_element(value)? {
        Value::Part(part) => Ok(part),
        other => Err(EvalError::conversion(format!(
            "cannot use {} as an attribute",
            other
        ))),
    }
}

/// Function rendition for operations that require a real function value
/// (comparator derivation); plain values are rejected here, unlike at
/// application sites where they act as constant functions.
pub fn as_function(value: &Value) -> EvalResult<Function> {
    match value {
        Value::Function(f) => Ok(f.clone()),
        other => Err(EvalError::conversion(format!(
            "cannot use {} as a function",
            other
        ))),
    }
}

/// Date rendition: dates pass through, numbers are epoch milliseconds, and
/// strings parse as RFC 3339.
pub fn as_date(value: &Value) -> EvalResult<DateTime<Utc>> {
    let single = as_single_element(value)?;
    match &single {
        Value::Date(d) => Ok(*d),
        Value::Int(_) | Value::Float(_) => {
            let millis = as_i64(&single)?;
            Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
                EvalError::conversion(format!("{} is out of range for a date", single))
            })
        }
        Value::Str(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|err| {
                EvalError::conversion(format!("cannot read {} as a date: {}", single, err))
            }),
        _ => Err(EvalError::conversion(format!(
            "cannot use {} as a date",
            single
        ))),
    }
}
