//! Pattern formulas.
//!
//! A formula is plain arithmetic over the three variables a pattern can see:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := ('-' | '+') unary | atom
//! atom   := NUMBER | 'mul' | 'len' | 'bpm' | '(' expr ')'
//! ```
//!
//! Anything outside this grammar is rejected when the formula is parsed.

use std::fmt;

use thiserror::Error;

/// Deepest nesting of parentheses and unary signs a formula may use.
pub const MAX_DEPTH: usize = 64;

/// Longest formula, in tokens. Operator chains build left-deep trees, so
/// this bounds evaluation depth the way `MAX_DEPTH` bounds parsing.
pub const MAX_TOKENS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Var {
    Mul,
    Len,
    Bpm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(Var),
    Neg(Box<Expr>),
    Bin(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormulaError {
    #[error("unexpected character '{0}' at {1}")]
    UnexpectedChar(char, usize),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unknown variable '{0}' (expected mul, len or bpm)")]
    UnknownVariable(String),
    #[error("unexpected '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("formula nests deeper than {0} levels")]
    TooDeep(usize),
    #[error("formula is longer than {0} tokens")]
    TooLong(usize),
}

/// Values bound to the formula variables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bindings {
    pub mul: f64,
    pub len: f64,
    pub bpm: f64,
}

/// A parsed formula together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.expr()?;
        if let Some(tok) = parser.peek() {
            return Err(FormulaError::UnexpectedToken(tok.to_string()));
        }
        Ok(Self {
            source: source.trim().to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn eval(&self, bindings: &Bindings) -> f64 {
        eval(&self.expr, bindings)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn eval(expr: &Expr, b: &Bindings) -> f64 {
    match expr {
        Expr::Num(v) => *v,
        Expr::Var(Var::Mul) => b.mul,
        Expr::Var(Var::Len) => b.len,
        Expr::Var(Var::Bpm) => b.bpm,
        Expr::Neg(inner) => -eval(inner, b),
        Expr::Bin(op, lhs, rhs) => {
            let (l, r) = (eval(lhs, b), eval(rhs, b));
            match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => l / r,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Var(Var),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Num(v) => write!(f, "{v}"),
            Token::Var(Var::Mul) => f.write_str("mul"),
            Token::Var(Var::Len) => f.write_str("len"),
            Token::Var(Var::Bpm) => f.write_str("bpm"),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(i, ch)) = chars.peek() {
        if tokens.len() > MAX_TOKENS {
            return Err(FormulaError::TooLong(MAX_TOKENS));
        }
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' | '-' | '*' | '/' | '(' | ')' => {
                chars.next();
                tokens.push(match ch {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '(' => Token::LParen,
                    _ => Token::RParen,
                });
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut text = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        text.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = crate::number::parse_decimal(&text)
                    .ok_or(FormulaError::InvalidNumber(text))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let var = match ident.as_str() {
                    "mul" => Var::Mul,
                    "len" => Var::Len,
                    "bpm" => Var::Bpm,
                    _ => return Err(FormulaError::UnknownVariable(ident)),
                };
                tokens.push(Token::Var(var));
            }
            other => return Err(FormulaError::UnexpectedChar(other, i)),
        }
    }
    if tokens.len() > MAX_TOKENS {
        return Err(FormulaError::TooLong(MAX_TOKENS));
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
    }

    // Every recursive path (sign chains and parenthesised groups) passes
    // through here, so this is the one place depth is counted.
    fn unary(&mut self) -> Result<Expr, FormulaError> {
        if self.depth >= MAX_DEPTH {
            return Err(FormulaError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let expr = self.signed();
        self.depth -= 1;
        expr
    }

    fn signed(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Expr, FormulaError> {
        match self.bump() {
            Some(Token::Num(v)) => Ok(Expr::Num(v)),
            Some(Token::Var(v)) => Ok(Expr::Var(v)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(inner),
                    Some(tok) => Err(FormulaError::UnexpectedToken(tok.to_string())),
                    None => Err(FormulaError::UnexpectedEnd),
                }
            }
            Some(tok) => Err(FormulaError::UnexpectedToken(tok.to_string())),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }
}
