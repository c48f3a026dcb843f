//! Tree passes over the closed node set
//!
//! [`Visitor`] is the double-dispatch contract for external passes (printing,
//! copying, type inference) over the expression model: one method per
//! variant, dispatched by [`Expr::visit`] through an exhaustive match, so a
//! new variant fails to compile until every pass handles it.
//!
//! [`ExprPrinter`] is the built-in printing pass; it also renders expressions
//! inside failure messages.

use std::fmt;

use crate::ast::{
    AccessExpr, ArithExpr, BinaryExpr, CallExpr, CompareExpr, Expr, IfExpr, LambdaExpr,
    MethodCallExpr, UpdateExpr, VarRef,
};
use crate::runtime::values::Value;

pub trait Visitor<R, A> {
    fn visit_literal(&mut self, value: &Value, arg: A) -> R;
    fn visit_var(&mut self, var: &VarRef, arg: A) -> R;
    fn visit_lambda(&mut self, lambda: &LambdaExpr, arg: A) -> R;
    fn visit_call(&mut self, call: &CallExpr, arg: A) -> R;
    fn visit_block(&mut self, exprs: &[Expr], arg: A) -> R;
    fn visit_if(&mut self, expr: &IfExpr, arg: A) -> R;
    fn visit_and(&mut self, expr: &BinaryExpr, arg: A) -> R;
    fn visit_or(&mut self, expr: &BinaryExpr, arg: A) -> R;
    fn visit_not(&mut self, expr: &Expr, arg: A) -> R;
    fn visit_arith(&mut self, expr: &ArithExpr, arg: A) -> R;
    fn visit_compare(&mut self, expr: &CompareExpr, arg: A) -> R;
    fn visit_is_equal(&mut self, expr: &BinaryExpr, arg: A) -> R;
    fn visit_access(&mut self, expr: &AccessExpr, arg: A) -> R;
    fn visit_update(&mut self, expr: &UpdateExpr, arg: A) -> R;
    fn visit_method_call(&mut self, expr: &MethodCallExpr, arg: A) -> R;
}

impl Expr {
    /// Dispatches to the visitor method for this node's variant.
    pub fn visit<R, A>(&self, visitor: &mut dyn Visitor<R, A>, arg: A) -> R {
        match self {
            Expr::Literal(value) => visitor.visit_literal(value, arg),
            Expr::Var(var) => visitor.visit_var(var, arg),
            Expr::Lambda(lambda) => visitor.visit_lambda(lambda, arg),
            Expr::Call(call) => visitor.visit_call(call, arg),
            Expr::Block(exprs) => visitor.visit_block(exprs, arg),
            Expr::If(expr) => visitor.visit_if(expr, arg),
            Expr::And(expr) => visitor.visit_and(expr, arg),
            Expr::Or(expr) => visitor.visit_or(expr, arg),
            Expr::Not(expr) => visitor.visit_not(expr, arg),
            Expr::Arith(expr) => visitor.visit_arith(expr, arg),
            Expr::Compare(expr) => visitor.visit_compare(expr, arg),
            Expr::IsEqual(expr) => visitor.visit_is_equal(expr, arg),
            Expr::Access(expr) => visitor.visit_access(expr, arg),
            Expr::Update(expr) => visitor.visit_update(expr, arg),
            Expr::MethodCall(expr) => visitor.visit_method_call(expr, arg),
        }
    }
}

/// Renders an expression in surface-like syntax.
#[derive(Debug, Default)]
pub struct ExprPrinter {
    out: String,
}

impl ExprPrinter {
    pub fn print(expr: &Expr) -> String {
        let mut printer = ExprPrinter::default();
        expr.visit(&mut printer, ());
        printer.out
    }

    fn child(&mut self, expr: &Expr) {
        expr.visit(self, ());
    }

    fn children(&mut self, exprs: &[Expr], separator: &str) {
        for (index, expr) in exprs.iter().enumerate() {
            if index > 0 {
                self.out.push_str(separator);
            }
            self.child(expr);
        }
    }
}

impl Visitor<(), ()> for ExprPrinter {
    fn visit_literal(&mut self, value: &Value, _arg: ()) {
        self.out.push_str(&value.to_string());
    }

    fn visit_var(&mut self, var: &VarRef, _arg: ()) {
        self.out.push('$');
        self.out.push_str(var.key.name());
    }

    fn visit_lambda(&mut self, lambda: &LambdaExpr, _arg: ()) {
        self.out.push_str(lambda.param.name());
        self.out.push_str(" -> ");
        self.child(&lambda.body);
    }

    fn visit_call(&mut self, call: &CallExpr, _arg: ()) {
        self.out.push('(');
        self.child(&call.function);
        self.out.push_str(")(");
        self.child(&call.argument);
        self.out.push(')');
    }

    fn visit_block(&mut self, exprs: &[Expr], _arg: ()) {
        self.out.push('{');
        self.children(exprs, "; ");
        self.out.push('}');
    }

    fn visit_if(&mut self, expr: &IfExpr, _arg: ()) {
        self.out.push('(');
        self.child(&expr.condition);
        self.out.push_str(" ? ");
        self.child(&expr.then_branch);
        self.out.push_str(" : ");
        self.child(&expr.else_branch);
        self.out.push(')');
    }

    fn visit_and(&mut self, expr: &BinaryExpr, _arg: ()) {
        self.out.push('(');
        self.child(&expr.left);
        self.out.push_str(" && ");
        self.child(&expr.right);
        self.out.push(')');
    }

    fn visit_or(&mut self, expr: &BinaryExpr, _arg: ()) {
        self.out.push('(');
        self.child(&expr.left);
        self.out.push_str(" || ");
        self.child(&expr.right);
        self.out.push(')');
    }

    fn visit_not(&mut self, expr: &Expr, _arg: ()) {
        self.out.push('!');
        self.child(expr);
    }

    fn visit_arith(&mut self, expr: &ArithExpr, _arg: ()) {
        self.out.push('(');
        self.child(&expr.left);
        self.out.push(' ');
        self.out.push_str(&expr.op.to_string());
        self.out.push(' ');
        self.child(&expr.right);
        self.out.push(')');
    }

    fn visit_compare(&mut self, expr: &CompareExpr, _arg: ()) {
        self.out.push('(');
        self.child(&expr.left);
        self.out.push(' ');
        self.out.push_str(&expr.kind.to_string());
        self.out.push(' ');
        self.child(&expr.right);
        self.out.push(')');
    }

    fn visit_is_equal(&mut self, expr: &BinaryExpr, _arg: ()) {
        self.out.push('(');
        self.child(&expr.left);
        self.out.push_str(" == ");
        self.child(&expr.right);
        self.out.push(')');
    }

    fn visit_access(&mut self, expr: &AccessExpr, _arg: ()) {
        self.child(&expr.target);
        self.out.push('.');
        self.out.push_str(expr.part.name());
    }

    fn visit_update(&mut self, expr: &UpdateExpr, _arg: ()) {
        self.child(&expr.target);
        self.out.push_str(".set(");
        self.out.push_str(expr.part.name());
        self.out.push_str(", ");
        self.child(&expr.value);
        self.out.push(')');
    }

    fn visit_method_call(&mut self, expr: &MethodCallExpr, _arg: ()) {
        self.out.push_str(expr.method.name());
        self.out.push('(');
        self.children(&expr.args, ", ");
        self.out.push(')');
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ExprPrinter::print(self))
    }
}
