//! Tree-walking evaluator over `serde_json::Value`

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;

use super::{BinaryOp, Expr, ExpressionError, LogicalOp, UnaryOp};
use crate::types::NodeInputs;

/// Named bindings visible to an expression
///
/// A name bound to `None` is defined but has no value (it evaluates to
/// `null`); an unbound name is an error.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: HashMap<String, Option<Value>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every gathered input under its positional key
    pub fn from_inputs(inputs: &NodeInputs) -> Self {
        let mut scope = Self::new();
        for (key, value) in inputs.iter() {
            scope.bind(key, value.cloned());
        }
        scope
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Option<Value>) {
        self.bindings.insert(name.into(), value);
    }

    fn lookup(&self, name: &str) -> Option<&Option<Value>> {
        self.bindings.get(name)
    }
}

/// Boolean coercion: `false`, `null`, `0` and `""` are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// String form of a value as it appears in templates and concatenation
///
/// Strings are raw, integral numbers have no fractional part, compound
/// values are compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

pub(super) fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(super) struct Evaluator<'a> {
    scope: &'a Scope,
}

impl<'a> Evaluator<'a> {
    pub(super) fn new(scope: &'a Scope) -> Self {
        Self { scope }
    }

    pub(super) fn evaluate(&self, expr: &Expr) -> Result<Value, ExpressionError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Identifier(name) => match self.scope.lookup(name) {
                Some(value) => Ok(value.clone().unwrap_or(Value::Null)),
                None => Err(ExpressionError::UnknownIdentifier(name.clone())),
            },
            Expr::Member(object, field) => {
                let target = self.evaluate(object)?;
                self.member(&target, field)
            }
            Expr::Index(object, index) => {
                let target = self.evaluate(object)?;
                let key = self.evaluate(index)?;
                self.index(&target, &key)
            }
            Expr::Unary(op, operand) => {
                let value = self.evaluate(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!is_truthy(&value))),
                    UnaryOp::Negate => Ok(number_value(-self.to_number(&value, "-")?)),
                    UnaryOp::Plus => Ok(number_value(self.to_number(&value, "+")?)),
                }
            }
            Expr::Binary(op, l, r) => {
                let left = self.evaluate(l)?;
                let right = self.evaluate(r)?;
                self.binary(*op, &left, &right)
            }
            Expr::Logical(op, l, r) => {
                let left = self.evaluate(l)?;
                match (op, is_truthy(&left)) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.evaluate(r),
                }
            }
            Expr::Conditional(condition, then_branch, else_branch) => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }
        }
    }

    fn member(&self, target: &Value, field: &str) -> Result<Value, ExpressionError> {
        match (target, field) {
            (Value::String(s), "length") => Ok(Value::from(s.chars().count())),
            (Value::Array(items), "length") => Ok(Value::from(items.len())),
            (Value::Object(map), _) => Ok(map.get(field).cloned().unwrap_or(Value::Null)),
            (Value::Null, _) => Err(ExpressionError::TypeMismatch {
                operation: format!("read property '{}'", field),
                expected: "object".to_string(),
                found: "null".to_string(),
            }),
            _ => Ok(Value::Null),
        }
    }

    fn index(&self, target: &Value, key: &Value) -> Result<Value, ExpressionError> {
        match (target, key) {
            (Value::Array(items), Value::Number(n)) => Ok(n
                .as_u64()
                .and_then(|i| items.get(i as usize))
                .cloned()
                .unwrap_or(Value::Null)),
            (Value::String(s), Value::Number(n)) => Ok(n
                .as_u64()
                .and_then(|i| s.chars().nth(i as usize))
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Null)),
            (Value::Object(_), _)
            | (Value::Array(_), Value::String(_))
            | (Value::String(_), Value::String(_)) => self.member(target, &display_value(key)),
            (Value::Null, _) => Err(ExpressionError::TypeMismatch {
                operation: "index".to_string(),
                expected: "array, string or object".to_string(),
                found: "null".to_string(),
            }),
            _ => Ok(Value::Null),
        }
    }

    fn binary(&self, op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExpressionError> {
        let symbol = op.symbol();
        match op {
            BinaryOp::Add => {
                if left.is_string() || right.is_string() {
                    Ok(Value::String(format!("{}{}", display_value(left), display_value(right))))
                } else {
                    let sum = self.to_number(left, symbol)? + self.to_number(right, symbol)?;
                    Ok(number_value(sum))
                }
            }
            BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Remainder => {
                let a = self.to_number(left, symbol)?;
                let b = self.to_number(right, symbol)?;
                let result = match op {
                    BinaryOp::Subtract => a - b,
                    BinaryOp::Multiply => a * b,
                    BinaryOp::Divide => a / b,
                    _ => a % b,
                };
                Ok(number_value(result))
            }
            BinaryOp::Less
            | BinaryOp::LessOrEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterOrEqual => {
                let ordering = self.compare(left, right, symbol)?;
                let result = match (op, ordering) {
                    (_, None) => false,
                    (BinaryOp::Less, Some(o)) => o == Ordering::Less,
                    (BinaryOp::LessOrEqual, Some(o)) => o != Ordering::Greater,
                    (BinaryOp::Greater, Some(o)) => o == Ordering::Greater,
                    (_, Some(o)) => o != Ordering::Less,
                };
                Ok(Value::Bool(result))
            }
            BinaryOp::StrictEqual => Ok(Value::Bool(strict_equals(left, right))),
            BinaryOp::StrictNotEqual => Ok(Value::Bool(!strict_equals(left, right))),
            BinaryOp::Equal => Ok(Value::Bool(loose_equals(left, right))),
            BinaryOp::NotEqual => Ok(Value::Bool(!loose_equals(left, right))),
        }
    }

    fn compare(
        &self,
        left: &Value,
        right: &Value,
        symbol: &str,
    ) -> Result<Option<Ordering>, ExpressionError> {
        if let (Value::String(a), Value::String(b)) = (left, right) {
            return Ok(Some(a.cmp(b)));
        }
        let a = self.to_number(left, symbol)?;
        let b = self.to_number(right, symbol)?;
        Ok(a.partial_cmp(&b))
    }

    fn to_number(&self, value: &Value, operation: &str) -> Result<f64, ExpressionError> {
        match value {
            Value::Number(n) => Ok(n.as_f64().unwrap_or(f64::NAN)),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Null => Ok(0.0),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Ok(0.0)
                } else {
                    Ok(trimmed.parse::<f64>().unwrap_or(f64::NAN))
                }
            }
            other => Err(ExpressionError::TypeMismatch {
                operation: operation.to_string(),
                expected: "number".to_string(),
                found: type_name(other).to_string(),
            }),
        }
    }
}

fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn loose_equals(left: &Value, right: &Value) -> bool {
    if strict_equals(left, right) {
        return true;
    }
    match (left, right) {
        (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Bool(_), Value::Number(_) | Value::String(_))
        | (Value::Number(_) | Value::String(_), Value::Bool(_)) => {
            let as_number = |v: &Value| match v {
                Value::Number(n) => n.as_f64(),
                Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                Value::String(s) if s.trim().is_empty() => Some(0.0),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            matches!((as_number(left), as_number(right)), (Some(a), Some(b)) if a == b)
        }
        _ => false,
    }
}
