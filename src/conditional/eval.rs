// Evaluation of parsed conditionals against current field values

use super::parser::{CompareOp, Expr};
use super::ConditionError;
use crate::core::Value;
use std::cmp::Ordering;

/// Runtime value of an operand
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Number(f64),
    Text(String),
    Absent,
    Table,
}

impl Operand {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Number(n) => Operand::Number(n),
            Value::Text(s) | Value::Variable(s) => Operand::Text(s),
            Value::Table(_) => Operand::Table,
            Value::Absent => Operand::Absent,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Operand::Number(_) => "number",
            Operand::Text(_) => "text",
            Operand::Absent => "absent",
            Operand::Table => "table",
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Operand::Number(n) => *n != 0.0,
            Operand::Text(s) => !s.is_empty(),
            Operand::Absent => false,
            Operand::Table => true,
        }
    }
}

pub(super) struct Evaluator<'a> {
    lookup: &'a dyn Fn(&str) -> Option<Value>,
}

impl<'a> Evaluator<'a> {
    pub(super) fn new(lookup: &'a dyn Fn(&str) -> Option<Value>) -> Self {
        Self { lookup }
    }

    pub(super) fn truth(&self, expr: &Expr) -> Result<bool, ConditionError> {
        match expr {
            Expr::Not(e) => Ok(!self.truth(e)?),
            // Short-circuit, so names on the untaken side are never looked up
            Expr::And(a, b) => Ok(self.truth(a)? && self.truth(b)?),
            Expr::Or(a, b) => Ok(self.truth(a)? || self.truth(b)?),
            Expr::Compare(a, op, b) => compare(&self.operand(a)?, *op, &self.operand(b)?),
            _ => Ok(self.operand(expr)?.truthy()),
        }
    }

    fn operand(&self, expr: &Expr) -> Result<Operand, ConditionError> {
        match expr {
            Expr::Number(n) => Ok(Operand::Number(*n)),
            Expr::Str(s) => Ok(Operand::Text(s.clone())),
            Expr::Bool(b) => Ok(Operand::Number(if *b { 1.0 } else { 0.0 })),
            Expr::Name(name) => (self.lookup)(name)
                .map(Operand::from_value)
                .ok_or_else(|| ConditionError::UnknownName(name.clone())),
            // A nested boolean used as an operand, e.g. `(a and b) == True`
            _ => Ok(Operand::Number(if self.truth(expr)? { 1.0 } else { 0.0 })),
        }
    }
}

fn compare(a: &Operand, op: CompareOp, b: &Operand) -> Result<bool, ConditionError> {
    if matches!(a, Operand::Table) || matches!(b, Operand::Table) {
        return Err(ConditionError::Unsupported(
            "tables can not be compared".to_string(),
        ));
    }

    let ordering = match (a, b) {
        (Operand::Number(x), Operand::Number(y)) => x.partial_cmp(y),
        (Operand::Text(x), Operand::Text(y)) => Some(x.cmp(y)),
        (Operand::Absent, Operand::Absent) => Some(Ordering::Equal),
        _ => None,
    };

    match (op, ordering) {
        (CompareOp::Eq, o) => Ok(o == Some(Ordering::Equal)),
        (CompareOp::Ne, o) => Ok(o != Some(Ordering::Equal)),
        (_, None) => Err(ConditionError::TypeMismatch {
            left: a.kind(),
            right: b.kind(),
        }),
        (CompareOp::Lt, Some(o)) => Ok(o == Ordering::Less),
        (CompareOp::Le, Some(o)) => Ok(o != Ordering::Greater),
        (CompareOp::Gt, Some(o)) => Ok(o == Ordering::Greater),
        (CompareOp::Ge, Some(o)) => Ok(o != Ordering::Less),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditional::parser::parse_expr;
    use crate::core::TableValue;

    fn lookup(name: &str) -> Option<Value> {
        match name {
            "rpm_limit" => Some(Value::Number(6500.0)),
            "zero" => Some(Value::Number(0.0)),
            "mode" => Some(Value::Text("sequential".into())),
            "empty" => Some(Value::Text(String::new())),
            "load" => Some(Value::Variable("map".into())),
            "spark" => Some(Value::Absent),
            "fuel" => Some(Value::Table(TableValue {
                interpolate: 0,
                interpolate_b: "rpm".into(),
                interpolate_c: "rpm".into(),
                x_axis: None,
                y_axis: None,
                data: vec![vec![0.0], vec![0.0]],
            })),
            _ => None,
        }
    }

    fn eval(expr: &str) -> Result<bool, ConditionError> {
        Evaluator::new(&lookup).truth(&parse_expr(expr)?)
    }

    #[test]
    fn test_truthiness() {
        assert!(eval("rpm_limit").unwrap());
        assert!(!eval("zero").unwrap());
        assert!(eval("mode").unwrap());
        assert!(!eval("empty").unwrap());
        assert!(!eval("spark").unwrap());
        assert!(eval("fuel").unwrap());
        assert!(eval("not spark and True").unwrap());
    }

    #[test]
    fn test_comparisons() {
        assert!(eval("rpm_limit > 6000").unwrap());
        assert!(!eval("rpm_limit <= 6000").unwrap());
        assert!(eval("mode == 'sequential'").unwrap());
        assert!(eval("load == \"map\"").unwrap());
        assert!(eval("'a' < 'b'").unwrap());
        assert!(eval("zero == False").unwrap());
        assert!(eval("(rpm_limit > 0 and zero == 0) == True").unwrap());
    }

    #[test]
    fn test_mismatched_kinds() {
        assert!(!eval("mode == 3").unwrap());
        assert!(eval("mode != 3").unwrap());
        assert!(matches!(
            eval("mode < 3"),
            Err(ConditionError::TypeMismatch { left: "text", right: "number" })
        ));
        assert!(matches!(eval("fuel == 1"), Err(ConditionError::Unsupported(_))));
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(
            eval("nope > 1"),
            Err(ConditionError::UnknownName("nope".into()))
        );
        // Never looked up thanks to short-circuiting
        assert!(eval("rpm_limit or nope").unwrap());
        assert!(!eval("zero and nope").unwrap());
    }
}
