//! Restricted expression language for `javascript` and `conditional` nodes
//!
//! Node code is never executed as a general-purpose program. Instead a
//! small grammar is parsed into an [`Expr`] tree and evaluated against the
//! node's named inputs:
//!
//! - literals: numbers, `'single'`/`"double"` strings, `true`, `false`, `null`
//! - identifiers bound to inputs (`input1`, `input2`, ...) and `variables`
//! - member and index access: `a.b`, `a[0]`, `s.length`
//! - unary `! - +`, binary `* / % + - < <= > >= == != === !==`
//! - short-circuit `&&` / `||` and the ternary `cond ? a : b`
//!
//! A program is a single expression, optionally written as
//! `return <expr>;` so that simple function bodies keep working.
//!
//! ```
//! use flow_engine::expression::{self, Scope};
//! use serde_json::json;
//!
//! let mut scope = Scope::new();
//! scope.bind("input1", Some(json!(5)));
//! assert_eq!(expression::evaluate("return input1 + 1", &scope).unwrap(), json!(6));
//! ```

mod eval;
mod lexer;
mod parser;

use std::fmt;

use serde_json::Value;
use thiserror::Error;

pub use eval::{display_value, is_truthy, Scope};
pub use parser::MAX_NESTING_DEPTH;

/// Errors raised while lexing, parsing or evaluating an expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedCharacter { found: char, position: usize },

    #[error("Unterminated string starting at position {0}")]
    UnterminatedString(usize),

    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Expression nests deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("{0} is not defined")]
    UnknownIdentifier(String),

    #[error("Type mismatch during '{operation}': expected {expected}, found {found}")]
    TypeMismatch {
        operation: String,
        expected: String,
        found: String,
    },
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
}

/// Binary operators with eager evaluation of both operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Remainder => "%",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::StrictEqual => "===",
            Self::StrictNotEqual => "!==",
        }
    }
}

/// Short-circuiting operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Identifier(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::String(s)) => write!(f, "{:?}", s),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Identifier(name) => write!(f, "{}", name),
            Expr::Member(object, field) => write!(f, "{}.{}", object, field),
            Expr::Index(object, index) => write!(f, "{}[{}]", object, index),
            Expr::Unary(op, operand) => {
                let symbol = match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Negate => "-",
                    UnaryOp::Plus => "+",
                };
                write!(f, "{}{}", symbol, operand)
            }
            Expr::Binary(op, l, r) => write!(f, "({} {} {})", l, op.symbol(), r),
            Expr::Logical(LogicalOp::And, l, r) => write!(f, "({} && {})", l, r),
            Expr::Logical(LogicalOp::Or, l, r) => write!(f, "({} || {})", l, r),
            Expr::Conditional(c, a, b) => write!(f, "({} ? {} : {})", c, a, b),
        }
    }
}

/// A parsed program, reusable across evaluations
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    expr: Expr,
}

impl Program {
    /// Parse source text into a program
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let tokens = lexer::tokenize(source)?;
        let expr = parser::Parser::new(tokens).parse_program()?;
        Ok(Self { expr })
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate against the given bindings
    pub fn evaluate(&self, scope: &Scope) -> Result<Value, ExpressionError> {
        eval::Evaluator::new(scope).evaluate(&self.expr)
    }
}

/// Parse and evaluate `source` in one step
pub fn evaluate(source: &str, scope: &Scope) -> Result<Value, ExpressionError> {
    Program::parse(source)?.evaluate(scope)
}

/// Parse and evaluate `source`, coercing the result to a boolean
pub fn evaluate_condition(source: &str, scope: &Scope) -> Result<bool, ExpressionError> {
    evaluate(source, scope).map(|v| is_truthy(&v))
}
