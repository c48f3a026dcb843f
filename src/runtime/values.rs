//! Runtime value model
//!
//! Represents values during execution (different from the AST, which
//! represents the program). Values are cheap to clone: compound values either
//! own small vectors or share their payload behind `Rc`.
//!
//! `Value` implements structural `Eq`/`Hash` so values can populate seen-sets
//! and memo tables (floats are hashed via `OrderedFloat`, maps and sets are
//! hashed order-independently). Script-level equality, which additionally
//! unwraps one-element collections and normalizes numbers, lives in
//! [`crate::runtime::compare`].

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;

use crate::ast::{Expr, VarKey};
use crate::runtime::environment::EvalContext;
use crate::runtime::host_interface::{ObjRef, PartRef, TypeRef};

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Message(Rc<Message>),
    Date(DateTime<Utc>),
    List(Vec<Value>),
    Set(IndexSet<Value>),
    Map(IndexMap<Value, Value>),
    Obj(ObjRef),
    Type(TypeRef),
    Part(PartRef),
    Function(Function),
}

/// A localized-message key, composable by the `+` operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Message {
    /// Reference into a resource bundle.
    Key(String),
    /// Literal text spliced between keys.
    Text(String),
    /// Several messages joined in order.
    Sequence(Vec<Message>),
}

impl Message {
    /// Joins two messages into one, flattening nested sequences one level.
    pub fn join(left: &Message, right: &Message) -> Message {
        let mut parts = Vec::new();
        left.push_into(&mut parts);
        right.push_into(&mut parts);
        Message::Sequence(parts)
    }

    fn push_into(&self, out: &mut Vec<Message>) {
        match self {
            Message::Sequence(parts) => out.extend(parts.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Key(key) => write!(f, "{}", key),
            Message::Text(text) => write!(f, "{}", text),
            Message::Sequence(parts) => {
                for part in parts {
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
        }
    }
}

/// A function value: either a script closure or a comparator derived from
/// another function value.
#[derive(Debug, Clone)]
pub enum Function {
    Closure(Rc<Closure>),
    /// Two-argument comparator derived from a one-argument sort key
    /// (null-smallest policy).
    KeyComparator(Rc<Function>),
    /// Negates the comparison of the wrapped function; wrapping twice
    /// restores the original order.
    Descending(Rc<Function>),
}

/// A script closure: one parameter, a body, and an immutable snapshot of the
/// defining context taken at capture time.
#[derive(Debug, Clone)]
pub struct Closure {
    pub param: VarKey,
    pub body: Rc<Expr>,
    pub captured: EvalContext,
}

impl PartialEq for Function {
    fn eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::Closure(a), Function::Closure(b)) => Rc::ptr_eq(a, b),
            (Function::KeyComparator(a), Function::KeyComparator(b)) => a == b,
            (Function::Descending(a), Function::Descending(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Function {}

impl Hash for Function {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Function::Closure(c) => {
                state.write_u8(0);
                (Rc::as_ptr(c) as usize).hash(state);
            }
            Function::KeyComparator(inner) => {
                state.write_u8(1);
                inner.hash(state);
            }
            Function::Descending(inner) => {
                state.write_u8(2);
                inner.hash(state);
            }
        }
    }
}

impl Value {
    /// Whether the value is considered equivalent to `true` in a boolean
    /// context. False exactly for null, `false`, an empty collection or map,
    /// and the empty string; everything else (including `"false"`) is true.
    pub fn is_true(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Set(s) => !s.is_empty(),
            Value::Map(m) => !m.is_empty(),
            _ => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value is a collection in the flat-map/equality sense.
    /// Maps are not collections here; they only participate in truthiness
    /// and structural equality.
    pub fn is_collection(&self) -> bool {
        matches!(self, Value::List(_) | Value::Set(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn is_string_like(&self) -> bool {
        matches!(self, Value::Str(_) | Value::Message(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "number",
            Value::Str(_) => "string",
            Value::Message(_) => "message",
            Value::Date(_) => "date",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Obj(_) => "object",
            Value::Type(_) => "type",
            Value::Part(_) => "attribute",
            Value::Function(_) => "function",
        }
    }

    /// The elements of a collection value; null yields no elements and any
    /// other value yields itself, so callers can treat every value as a
    /// collection.
    pub fn elements(&self) -> Vec<Value> {
        match self {
            Value::Null => Vec::new(),
            Value::List(l) => l.clone(),
            Value::Set(s) => s.iter().cloned().collect(),
            other => vec![other.clone()],
        }
    }

    /// Collection size under the same coercion as [`Value::elements`].
    pub fn collection_len(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::List(l) => l.len(),
            Value::Set(s) => s.len(),
            _ => 1,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => OrderedFloat(*a) == OrderedFloat(*b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Message(a), Value::Message(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Obj(a), Value::Obj(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Part(a), Value::Part(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => state.write_u8(0),
            Value::Bool(b) => {
                state.write_u8(1);
                b.hash(state);
            }
            Value::Int(i) => {
                state.write_u8(2);
                i.hash(state);
            }
            Value::Float(f) => {
                state.write_u8(3);
                OrderedFloat(*f).hash(state);
            }
            Value::Str(s) => {
                state.write_u8(4);
                s.hash(state);
            }
            Value::Message(m) => {
                state.write_u8(5);
                m.hash(state);
            }
            Value::Date(d) => {
                state.write_u8(6);
                d.timestamp_millis().hash(state);
            }
            Value::List(l) => {
                state.write_u8(7);
                for item in l {
                    item.hash(state);
                }
            }
            Value::Set(s) => {
                state.write_u8(8);
                unordered_hash(s.iter(), state);
            }
            Value::Map(m) => {
                state.write_u8(9);
                unordered_hash(m.iter(), state);
            }
            Value::Obj(o) => {
                state.write_u8(10);
                o.hash(state);
            }
            Value::Type(t) => {
                state.write_u8(11);
                t.hash(state);
            }
            Value::Part(p) => {
                state.write_u8(12);
                p.hash(state);
            }
            Value::Function(f) => {
                state.write_u8(13);
                f.hash(state);
            }
        }
    }
}

/// Hash that does not depend on iteration order, so equal sets and maps hash
/// equally regardless of insertion history.
fn unordered_hash<H: Hasher, T: Hash>(items: impl Iterator<Item = T>, state: &mut H) {
    let mut acc: u64 = 0;
    for item in items {
        let mut hasher = DefaultHasher::new();
        item.hash(&mut hasher);
        acc = acc.wrapping_add(hasher.finish());
    }
    state.write_u64(acc);
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => {
                // Integral numbers render without a floating point marker.
                if x.is_finite() && x.floor() == *x && x.abs() < 1e15 {
                    write!(f, "{}", *x as i64)
                } else {
                    write!(f, "{}", x)
                }
            }
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Message(m) => write!(f, "#message({})", m),
            Value::Date(d) => write!(f, "date(\"{}\")", d.to_rfc3339()),
            Value::List(l) => {
                let items: Vec<String> = l.iter().map(|item| item.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Set(s) => {
                let items: Vec<String> = s.iter().map(|item| item.to_string()).collect();
                write!(f, "set({})", items.join(", "))
            }
            Value::Map(m) => {
                let items: Vec<String> =
                    m.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Value::Obj(o) => write!(f, "{}", o),
            Value::Type(t) => write!(f, "{}", t),
            Value::Part(p) => write!(f, "{}", p),
            Value::Function(_) => write!(f, "#<function>"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}
