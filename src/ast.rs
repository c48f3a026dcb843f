//! Expression node model
//!
//! The closed set of AST variants the engine evaluates. Nodes are produced by
//! the front end (parser, name resolver, optimizer — all external): every
//! variable reference arrives already bound to its [`VarKey`], and an external
//! optimizer may rewrite child slots before evaluation. The evaluator itself
//! never mutates the tree.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::runtime::host_interface::PartRef;
use crate::runtime::methods::Method;
use crate::runtime::values::Value;

/// Unforgeable identity of one variable binding site.
///
/// Two lexically distinct bindings never share a key, even when they share a
/// surface name; the name is carried for diagnostics only and does not
/// participate in identity.
#[derive(Debug, Clone)]
pub struct VarKey {
    id: u64,
    name: Rc<str>,
}

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

impl VarKey {
    /// Mints a fresh key. Call once per binding site.
    pub fn new(name: &str) -> Self {
        VarKey {
            id: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for VarKey {
    fn eq(&self, other: &VarKey) -> bool {
        self.id == other.id
    }
}

impl Eq for VarKey {}

impl std::hash::Hash for VarKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for VarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name)
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Var(VarRef),
    Lambda(LambdaExpr),
    Call(CallExpr),
    Block(Vec<Expr>),
    If(IfExpr),
    And(BinaryExpr),
    Or(BinaryExpr),
    Not(Box<Expr>),
    Arith(ArithExpr),
    Compare(CompareExpr),
    IsEqual(BinaryExpr),
    Access(AccessExpr),
    Update(UpdateExpr),
    MethodCall(MethodCallExpr),
}

#[derive(Debug, Clone)]
pub struct VarRef {
    pub key: VarKey,
}

#[derive(Debug, Clone)]
pub struct LambdaExpr {
    pub param: VarKey,
    /// Shared so that creating a closure value does not copy the body.
    pub body: Rc<Expr>,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub function: Box<Expr>,
    pub argument: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct IfExpr {
    pub condition: Box<Expr>,
    pub then_branch: Box<Expr>,
    pub else_branch: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone)]
pub struct ArithExpr {
    pub op: ArithOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareKind {
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CompareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareKind::Lt => "<",
            CompareKind::Le => "<=",
            CompareKind::Gt => ">",
            CompareKind::Ge => ">=",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone)]
pub struct CompareExpr {
    pub kind: CompareKind,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct AccessExpr {
    pub target: Box<Expr>,
    pub part: PartRef,
}

#[derive(Debug, Clone)]
pub struct UpdateExpr {
    pub target: Box<Expr>,
    pub part: PartRef,
    pub value: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct MethodCallExpr {
    pub method: Rc<dyn Method>,
    pub args: Vec<Expr>,
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Expr {
        Expr::Literal(value.into())
    }

    pub fn null() -> Expr {
        Expr::Literal(Value::Null)
    }

    pub fn var(key: &VarKey) -> Expr {
        Expr::Var(VarRef { key: key.clone() })
    }

    pub fn lambda(param: &VarKey, body: Expr) -> Expr {
        Expr::Lambda(LambdaExpr {
            param: param.clone(),
            body: Rc::new(body),
        })
    }

    pub fn call(function: Expr, argument: Expr) -> Expr {
        Expr::Call(CallExpr {
            function: Box::new(function),
            argument: Box::new(argument),
        })
    }

    pub fn block(exprs: Vec<Expr>) -> Expr {
        Expr::Block(exprs)
    }

    pub fn if_else(condition: Expr, then_branch: Expr, else_branch: Expr) -> Expr {
        Expr::If(IfExpr {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    pub fn and(left: Expr, right: Expr) -> Expr {
        Expr::And(BinaryExpr {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn or(left: Expr, right: Expr) -> Expr {
        Expr::Or(BinaryExpr {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn not(expr: Expr) -> Expr {
        Expr::Not(Box::new(expr))
    }

    pub fn arith(op: ArithOp, left: Expr, right: Expr) -> Expr {
        Expr::Arith(ArithExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn add(left: Expr, right: Expr) -> Expr {
        Expr::arith(ArithOp::Add, left, right)
    }

    pub fn sub(left: Expr, right: Expr) -> Expr {
        Expr::arith(ArithOp::Sub, left, right)
    }

    pub fn mul(left: Expr, right: Expr) -> Expr {
        Expr::arith(ArithOp::Mul, left, right)
    }

    pub fn div(left: Expr, right: Expr) -> Expr {
        Expr::arith(ArithOp::Div, left, right)
    }

    pub fn compare(kind: CompareKind, left: Expr, right: Expr) -> Expr {
        Expr::Compare(CompareExpr {
            kind,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn gt(left: Expr, right: Expr) -> Expr {
        Expr::compare(CompareKind::Gt, left, right)
    }

    pub fn lt(left: Expr, right: Expr) -> Expr {
        Expr::compare(CompareKind::Lt, left, right)
    }

    pub fn is_equal(left: Expr, right: Expr) -> Expr {
        Expr::IsEqual(BinaryExpr {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn access(target: Expr, part: PartRef) -> Expr {
        Expr::Access(AccessExpr {
            target: Box::new(target),
            part,
        })
    }

    pub fn update(target: Expr, part: PartRef, value: Expr) -> Expr {
        Expr::Update(UpdateExpr {
            target: Box::new(target),
            part,
            value: Box::new(value),
        })
    }

    pub fn method(method: Rc<dyn Method>, args: Vec<Expr>) -> Expr {
        Expr::MethodCall(MethodCallExpr { method, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_with_the_same_name_do_not_collide() {
        let a = VarKey::new("x");
        let b = VarKey::new("x");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.name(), b.name());
    }
}
