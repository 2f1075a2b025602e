// Field visibility conditionals
//
// A small boolean language over field values: comparisons, `and`, `or`,
// `not`, literals and field names. Nothing else is evaluated.

pub mod eval;
pub mod parser;

use crate::core::Value;
use thiserror::Error;

pub use parser::{parse_expr, CompareOp, Expr};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    #[error("Cannot parse conditional {expr:?}: {reason}")]
    Parse { expr: String, reason: String },

    #[error("Unknown name in conditional: {0}")]
    UnknownName(String),

    #[error("Cannot order a {left} value against a {right} value")]
    TypeMismatch {
        left: &'static str,
        right: &'static str,
    },

    #[error("Unsupported in conditional: {0}")]
    Unsupported(String),
}

/// Decides whether a field or page is enabled
pub trait ConditionEvaluator {
    /// Evaluate @expr, resolving names through @lookup
    fn evaluate(
        &self,
        lookup: &dyn Fn(&str) -> Option<Value>,
        expr: &str,
    ) -> Result<bool, ConditionError>;
}

/// The built-in evaluator for the grammar in [`parser`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprEvaluator;

impl ConditionEvaluator for ExprEvaluator {
    fn evaluate(
        &self,
        lookup: &dyn Fn(&str) -> Option<Value>,
        expr: &str,
    ) -> Result<bool, ConditionError> {
        let parsed = parse_expr(expr)?;
        eval::Evaluator::new(lookup).truth(&parsed)
    }
}
