//! Recursive-descent parser producing an [`Expr`] tree
//!
//! Precedence, lowest first: ternary, `||`, `&&`, equality, comparison,
//! additive, multiplicative, unary, postfix (member/index).
//!
//! Nesting is bounded by [`MAX_NESTING_DEPTH`]: every parenthesised or
//! ternary sub-expression, prefix operator and chained binary or postfix
//! operator counts one level. The tree depth, and so the evaluator's
//! recursion, can never exceed it.

use serde_json::Value;

use super::eval::number_value;
use super::lexer::{Token, TokenKind};
use super::{BinaryOp, Expr, ExpressionError, LogicalOp, UnaryOp};

/// Deepest nesting accepted before parsing fails
pub const MAX_NESTING_DEPTH: usize = 128;

pub(super) struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
}

impl Parser {
    pub(super) fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            depth: 0,
        }
    }

    /// `["return"] expr [";"] EOF`
    pub(super) fn parse_program(&mut self) -> Result<Expr, ExpressionError> {
        if matches!(&self.peek().kind, TokenKind::Ident(name) if name == "return") {
            self.advance();
        }
        let expr = self.parse_expression()?;
        while self.eat(&TokenKind::Semicolon) {}
        if !self.check(&TokenKind::Eof) {
            return Err(self.error("expected end of expression"));
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> Result<Expr, ExpressionError> {
        self.descend()?;
        let expr = self.parse_conditional();
        self.depth -= 1;
        expr
    }

    fn parse_conditional(&mut self) -> Result<Expr, ExpressionError> {
        let condition = self.parse_or()?;
        if self.eat(&TokenKind::Question) {
            let then_branch = self.parse_expression()?;
            self.expect(&TokenKind::Colon, "expected ':' in conditional expression")?;
            let else_branch = self.parse_expression()?;
            return Ok(Expr::Conditional(
                Box::new(condition),
                Box::new(then_branch),
                Box::new(else_branch),
            ));
        }
        Ok(condition)
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let entry_depth = self.depth;
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::OrOr) {
            self.descend()?;
            let right = self.parse_and()?;
            left = Expr::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        self.depth = entry_depth;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let entry_depth = self.depth;
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::AndAnd) {
            self.descend()?;
            let right = self.parse_equality()?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        self.depth = entry_depth;
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ExpressionError> {
        let entry_depth = self.depth;
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqualEqual => BinaryOp::Equal,
                TokenKind::BangEqual => BinaryOp::NotEqual,
                TokenKind::EqualEqualEqual => BinaryOp::StrictEqual,
                TokenKind::BangEqualEqual => BinaryOp::StrictNotEqual,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.parse_comparison()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = entry_depth;
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        let entry_depth = self.depth;
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessOrEqual,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterOrEqual,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = entry_depth;
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ExpressionError> {
        let entry_depth = self.depth;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = entry_depth;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        let entry_depth = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Percent => BinaryOp::Remainder,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = entry_depth;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        let op = match self.peek().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Plus => UnaryOp::Plus,
            _ => return self.parse_postfix(),
        };
        self.advance();
        self.descend()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExpressionError> {
        let entry_depth = self.depth;
        let mut expr = self.parse_primary()?;
        loop {
            if matches!(self.peek().kind, TokenKind::Dot | TokenKind::LBracket) {
                self.descend()?;
            }
            if self.eat(&TokenKind::Dot) {
                match self.advance().kind {
                    TokenKind::Ident(name) => expr = Expr::Member(Box::new(expr), name),
                    _ => return Err(self.error_at_previous("expected property name after '.'")),
                }
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.parse_expression()?;
                self.expect(&TokenKind::RBracket, "expected ']'")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                self.depth = entry_depth;
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(number_value(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" | "undefined" => Expr::Literal(Value::Null),
                _ => Expr::Identifier(name),
            }),
            TokenKind::LParen => {
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "expected ')'")?;
                Ok(expr)
            }
            TokenKind::Eof => Err(self.error_at_previous("unexpected end of expression")),
            _ => Err(self.error_at_previous("unexpected token")),
        }
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(ExpressionError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        Ok(())
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, message: &str) -> Result<(), ExpressionError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn error(&self, message: &str) -> ExpressionError {
        ExpressionError::Syntax {
            position: self.peek().position,
            message: message.to_string(),
        }
    }

    fn error_at_previous(&self, message: &str) -> ExpressionError {
        let index = self.current.saturating_sub(1);
        ExpressionError::Syntax {
            position: self.tokens.get(index).map(|t| t.position).unwrap_or(0),
            message: message.to_string(),
        }
    }
}
