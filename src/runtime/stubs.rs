//! In-memory stub object model
//!
//! A small [`ModelAccess`]/[`TypeOracle`] implementation for tests and for
//! embedding the engine without a persistent backend. Objects live in an
//! insertion-ordered table so enumeration results are deterministic.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use indexmap::IndexMap;

use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::host_interface::{ModelAccess, ObjRef, PartRef, TypeOracle, TypeRef};
use crate::runtime::values::Value;

#[derive(Debug)]
struct StubObject {
    ty: TypeRef,
    attrs: HashMap<String, Value>,
}

#[derive(Debug, Default)]
pub struct StubModel {
    objects: RefCell<IndexMap<ObjRef, StubObject>>,
    parents: RefCell<HashMap<TypeRef, TypeRef>>,
    next_id: Cell<u64>,
}

impl StubModel {
    pub fn new() -> Self {
        StubModel::default()
    }

    /// Declares `child` to be a direct subtype of `parent`.
    pub fn set_supertype(&self, child: &TypeRef, parent: &TypeRef) {
        self.parents
            .borrow_mut()
            .insert(child.clone(), parent.clone());
    }

    /// Creates a fresh object of the given type.
    pub fn new_object(&self, ty: &TypeRef) -> ObjRef {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let obj = ObjRef::new(id);
        self.objects.borrow_mut().insert(
            obj.clone(),
            StubObject {
                ty: ty.clone(),
                attrs: HashMap::new(),
            },
        );
        obj
    }

    pub fn contains(&self, obj: &ObjRef) -> bool {
        self.objects.borrow().contains_key(obj)
    }

    fn points_at(value: &Value, target: &ObjRef) -> bool {
        match value {
            Value::Obj(o) => o == target,
            Value::List(items) => items.iter().any(|v| Self::points_at(v, target)),
            Value::Set(items) => items.iter().any(|v| Self::points_at(v, target)),
            _ => false,
        }
    }
}

impl ModelAccess for StubModel {
    fn get_value(&self, obj: &ObjRef, part: &PartRef) -> EvalResult<Value> {
        let objects = self.objects.borrow();
        let entry = objects
            .get(obj)
            .ok_or_else(|| EvalError::general(format!("{} does not exist", obj)))?;
        Ok(entry.attrs.get(part.name()).cloned().unwrap_or(Value::Null))
    }

    fn set_value(&self, obj: &ObjRef, part: &PartRef, value: Value) -> EvalResult<()> {
        let mut objects = self.objects.borrow_mut();
        let entry = objects
            .get_mut(obj)
            .ok_or_else(|| EvalError::general(format!("{} does not exist", obj)))?;
        entry.attrs.insert(part.name().to_string(), value);
        Ok(())
    }

    fn delete_object(&self, obj: &ObjRef) -> EvalResult<()> {
        self.objects
            .borrow_mut()
            .shift_remove(obj)
            .map(|_| ())
            .ok_or_else(|| EvalError::general(format!("{} does not exist", obj)))
    }

    fn referers(&self, obj: &ObjRef, reference: &PartRef) -> EvalResult<Vec<ObjRef>> {
        let objects = self.objects.borrow();
        Ok(objects
            .iter()
            .filter(|(_, entry)| {
                entry
                    .attrs
                    .get(reference.name())
                    .map(|value| Self::points_at(value, obj))
                    .unwrap_or(false)
            })
            .map(|(id, _)| id.clone())
            .collect())
    }

    fn all_instances(&self, ty: &TypeRef) -> EvalResult<Vec<ObjRef>> {
        let objects = self.objects.borrow();
        Ok(objects
            .iter()
            .filter(|(_, entry)| self.is_subtype(&entry.ty, ty))
            .map(|(id, _)| id.clone())
            .collect())
    }

    fn type_of(&self, obj: &ObjRef) -> EvalResult<TypeRef> {
        let objects = self.objects.borrow();
        objects
            .get(obj)
            .map(|entry| entry.ty.clone())
            .ok_or_else(|| EvalError::general(format!("{} does not exist", obj)))
    }
}

impl TypeOracle for StubModel {
    fn is_subtype(&self, sub: &TypeRef, sup: &TypeRef) -> bool {
        if sub == sup {
            return true;
        }
        let parents = self.parents.borrow();
        let mut cursor = sub.clone();
        while let Some(parent) = parents.get(&cursor) {
            if parent == sup {
                return true;
            }
            cursor = parent.clone();
        }
        false
    }
}
