//! Error handling for the evaluation engine
//!
//! Three kinds of failure flow through [`EvalError`]:
//!
//! - [`EvalError::Abort`]: intentional, script-raised termination. Unwinds to
//!   the top-level caller untouched so its message surfaces verbatim.
//! - [`EvalError::Failure`]: a failure already attributed to the expression
//!   that raised it, carrying the arguments in play and the bindings that were
//!   active. Passes through further node boundaries unchanged, so a failure is
//!   wrapped exactly once.
//! - [`EvalError::Unattributed`]: a failure that has not yet reached a node
//!   boundary (conversion errors, undefined variables, arity mismatches, …).
//!   The nearest boundary attaches the failing expression and re-tags it as a
//!   `Failure`.

use std::fmt;

use thiserror::Error;

use crate::ast::{Expr, VarKey};
use crate::runtime::args::Args;
use crate::runtime::values::Value;

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// Script-raised termination; never treated as an engine fault.
    #[error("script aborted: {0}")]
    Abort(String),

    /// A failure attributed to its originating expression.
    #[error("{0}")]
    Failure(Box<EvaluationFailure>),

    /// A failure that still needs to be attached to an expression.
    #[error("{message}")]
    Unattributed {
        kind: FailureKind,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    General,
    /// Raised by value-coercion helpers (to-number, to-object, to-date, …).
    Conversion,
    UndefinedVariable,
    ArityMismatch,
    DepthExceeded,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::General => "evaluation failed",
            FailureKind::Conversion => "conversion failed",
            FailureKind::UndefinedVariable => "undefined variable",
            FailureKind::ArityMismatch => "argument count mismatch",
            FailureKind::DepthExceeded => "call depth exceeded",
        };
        write!(f, "{}", label)
    }
}

/// Diagnostics payload of an attributed failure: the failing (sub)expression,
/// the pending argument list, and a snapshot of the active bindings.
#[derive(Debug, Clone)]
pub struct EvaluationFailure {
    pub kind: FailureKind,
    pub message: String,
    pub expr: Expr,
    pub args: Args,
    pub bindings: Vec<(VarKey, Value)>,
}

impl fmt::Display for EvaluationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} in `{}`", self.kind, self.message, self.expr)?;
        if self.args.has_value() {
            write!(f, " applied to {}", self.args)?;
        }
        if !self.bindings.is_empty() {
            let bindings: Vec<String> = self
                .bindings
                .iter()
                .map(|(key, value)| format!("{} = {}", key, value))
                .collect();
            write!(f, " with {}", bindings.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for EvaluationFailure {}

impl EvalError {
    pub fn general(message: impl Into<String>) -> EvalError {
        EvalError::Unattributed {
            kind: FailureKind::General,
            message: message.into(),
        }
    }

    pub fn conversion(message: impl Into<String>) -> EvalError {
        EvalError::Unattributed {
            kind: FailureKind::Conversion,
            message: message.into(),
        }
    }

    pub fn undefined_variable(key: &VarKey) -> EvalError {
        EvalError::Unattributed {
            kind: FailureKind::UndefinedVariable,
            message: format!("variable {} is not defined", key),
        }
    }

    pub fn arity_mismatch(function: &str, expected: impl fmt::Display, actual: usize) -> EvalError {
        EvalError::Unattributed {
            kind: FailureKind::ArityMismatch,
            message: format!(
                "{} expects {} arguments, got {}",
                function, expected, actual
            ),
        }
    }

    pub fn depth_exceeded(limit: usize) -> EvalError {
        EvalError::Unattributed {
            kind: FailureKind::DepthExceeded,
            message: format!("call depth exceeds the configured limit of {}", limit),
        }
    }

    /// Attaches the failing expression to a not-yet-attributed failure.
    /// Aborts and already-attributed failures pass through unchanged.
    pub fn attributed(
        self,
        expr: &Expr,
        args: &Args,
        bindings: Vec<(VarKey, Value)>,
    ) -> EvalError {
        match self {
            EvalError::Unattributed { kind, message } => {
                EvalError::Failure(Box::new(EvaluationFailure {
                    kind,
                    message,
                    expr: expr.clone(),
                    args: args.clone(),
                    bindings,
                }))
            }
            passthrough => passthrough,
        }
    }

    /// The attributed diagnostics, if this failure reached a node boundary.
    pub fn failure(&self) -> Option<&EvaluationFailure> {
        match self {
            EvalError::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}
