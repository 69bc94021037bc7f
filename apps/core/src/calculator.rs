//! Arithmetic expression evaluator.
//!
//! Precedence from lowest to highest: `+ -`, `* / %`, `^` (right-associative).
//! A unary sign binds tighter than `^` on its left, so `-2^2` is `4`, while the
//! exponent itself may carry a sign (`2^-3`).

use thiserror::Error;

const DISPLAY_DECIMALS: usize = 3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("parse failure at offset {offset}: {message}")]
    Parse { offset: usize, message: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("domain error: {0}")]
    Domain(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Op(char),
    Open,
    Close,
}

/// Cheap acceptance predicate: only digits, operators, parens, dots and
/// whitespace, with at least one digit. A bare number is its own value.
pub fn looks_like_expression(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return false;
    }
    let allowed = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_whitespace() || "+-*/%^().".contains(c));
    allowed && trimmed.chars().any(|c| c.is_ascii_digit())
}

pub fn evaluate(input: &str) -> Result<f64, EvalError> {
    let ast = parse(input)?;
    let value = eval(&ast)?;
    if !value.is_finite() {
        return Err(EvalError::Domain("result is not finite".to_string()));
    }
    Ok(value)
}

pub fn parse(input: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

pub fn eval(expr: &Expr) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Unary { op, operand } => {
            let value = eval(operand)?;
            Ok(match op {
                UnaryOp::Plus => value,
                UnaryOp::Minus => -value,
            })
        }
        Expr::Binary { op, left, right } => {
            let lhs = eval(left)?;
            let rhs = eval(right)?;
            match op {
                BinaryOp::Add => Ok(lhs + rhs),
                BinaryOp::Sub => Ok(lhs - rhs),
                BinaryOp::Mul => Ok(lhs * rhs),
                BinaryOp::Div if rhs == 0.0 => Err(EvalError::DivisionByZero),
                BinaryOp::Div => Ok(lhs / rhs),
                BinaryOp::Rem if rhs == 0.0 => Err(EvalError::DivisionByZero),
                BinaryOp::Rem => Ok(lhs % rhs),
                BinaryOp::Pow if lhs < 0.0 && rhs.fract() != 0.0 => Err(EvalError::Domain(
                    format!("negative base {lhs} with fractional exponent {rhs}"),
                )),
                BinaryOp::Pow => Ok(lhs.powf(rhs)),
            }
        }
    }
}

/// Integral values print without a decimal point; everything else is rounded
/// to three decimals with trailing zeros stripped.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return normalize_negative_zero(format!("{value:.0}"));
    }

    let fixed = format!("{value:.prec$}", prec = DISPLAY_DECIMALS);
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    };
    normalize_negative_zero(trimmed)
}

fn normalize_negative_zero(value: String) -> String {
    if value == "-0" {
        "0".to_string()
    } else {
        value
    }
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, EvalError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0;

    while index < chars.len() {
        let c = chars[index];
        if c.is_whitespace() {
            index += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = index;
            while index < chars.len() && (chars[index].is_ascii_digit() || chars[index] == '.') {
                index += 1;
            }
            let literal: String = chars[start..index].iter().collect();
            let value = literal.parse::<f64>().map_err(|_| EvalError::Parse {
                offset: start,
                message: format!("invalid number '{literal}'"),
            })?;
            tokens.push((start, Token::Number(value)));
            continue;
        }

        let token = match c {
            '+' | '-' | '*' | '/' | '%' | '^' => Token::Op(c),
            '(' => Token::Open,
            ')' => Token::Close,
            other => {
                return Err(EvalError::Parse {
                    offset: index,
                    message: format!("unexpected character '{other}'"),
                })
            }
        };
        tokens.push((index, token));
        index += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(_, token)| *token)
    }

    fn error(&self, message: &str) -> EvalError {
        let offset = self
            .tokens
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or_else(|| self.tokens.last().map(|(offset, _)| offset + 1).unwrap_or(0));
        EvalError::Parse {
            offset,
            message: message.to_string(),
        }
    }

    fn expression(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.term()?;
        while let Some(Token::Op(c @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let right = self.term()?;
            let op = if c == '+' { BinaryOp::Add } else { BinaryOp::Sub };
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.power()?;
        while let Some(Token::Op(c @ ('*' | '/' | '%'))) = self.peek() {
            self.pos += 1;
            let right = self.power()?;
            let op = match c {
                '*' => BinaryOp::Mul,
                '/' => BinaryOp::Div,
                _ => BinaryOp::Rem,
            };
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn power(&mut self) -> Result<Expr, EvalError> {
        let base = self.unary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.power()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        match self.peek() {
            Some(Token::Op('+')) => {
                self.pos += 1;
                Ok(Expr::Unary {
                    op: UnaryOp::Plus,
                    operand: Box::new(self.unary()?),
                })
            }
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(Expr::Unary {
                    op: UnaryOp::Minus,
                    operand: Box::new(self.unary()?),
                })
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        match self.peek() {
            Some(Token::Number(value)) => {
                self.pos += 1;
                Ok(Expr::Number(value))
            }
            Some(Token::Open) => {
                self.pos += 1;
                let inner = self.expression()?;
                if self.peek() != Some(Token::Close) {
                    return Err(self.error("expected ')'"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(_) => Err(self.error("expected a number or '('")),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
