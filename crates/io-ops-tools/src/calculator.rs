//! Restricted arithmetic evaluator.
//!
//! Accepts numeric literals, `+ - * / % **`, unary `+ -` and parentheses.
//! Everything else is rejected at tokenization or parse time; nothing in
//! the input is ever executed. Semantics follow ordinary calculator rules
//! with `**` binding tighter than unary minus (`-2**2 == -4`) and `%` taking
//! the sign of the divisor.

use thiserror::Error;

/// Prefix of every evaluator error string.
pub const ERROR_PREFIX: &str = "Error evaluating expression: ";

/// Maximum nesting of parentheses / unary operators.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("empty expression")]
    Empty,

    #[error("unsupported or unsafe character {ch:?} at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite real number")]
    NonFinite,

    #[error("expression nested too deeply")]
    TooDeep,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pow,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Num(n) => n.to_string(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::Percent => "%".into(),
            Token::Pow => "**".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
        }
    }
}

/// Evaluate and format. Errors come back as `"Error evaluating expression: ..."`.
pub fn evaluate(expression: &str) -> String {
    match eval_expression(expression) {
        Ok(value) => format_number(value),
        Err(e) => format!("{ERROR_PREFIX}{e}"),
    }
}

/// Evaluate to a number.
pub fn eval_expression(expression: &str) -> Result<f64, EvalError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let value = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(EvalError::UnexpectedToken(tok.describe()));
    }
    if !value.is_finite() {
        return Err(EvalError::NonFinite);
    }
    Ok(value)
}

/// Whole numbers print positionally without a fractional part (`20`, not
/// `20.0`). Fractions below `1e-4` or from `1e16` up print in exponent form
/// with a signed two-digit exponent (`1e-07`).
fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Avoid "-0".
        return "0".into();
    }
    let magnitude = value.abs();
    if value.fract() != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        return exponent_form(value);
    }
    format!("{value}")
}

fn exponent_form(value: f64) -> String {
    let raw = format!("{value:e}");
    let Some((mantissa, exp)) = raw.split_once('e') else {
        return raw;
    };
    let (sign, digits) = match exp.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exp),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent only when followed by digits: 1e3, 2.5E-4
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| EvalError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Num(value));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Pow);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(EvalError::UnexpectedChar { ch: other, pos: i }),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn descend(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        Ok(())
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := factor (('*' | '/' | '%') factor)*
    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::Percent)) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = match op {
                Token::Star => value * rhs,
                Token::Slash => {
                    if rhs == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    value / rhs
                }
                _ => floored_mod(value, rhs)?,
            };
        }
        Ok(value)
    }

    // factor := ('+' | '-') factor | power
    fn factor(&mut self) -> Result<f64, EvalError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.descend()?;
                let v = self.factor();
                self.depth -= 1;
                v
            }
            Some(Token::Minus) => {
                self.pos += 1;
                self.descend()?;
                let v = self.factor().map(|v| -v);
                self.depth -= 1;
                v
            }
            _ => self.power(),
        }
    }

    // power := atom ['**' factor]   (right-associative)
    fn power(&mut self) -> Result<f64, EvalError> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Pow) {
            self.pos += 1;
            self.descend()?;
            let exponent = self.factor();
            self.depth -= 1;
            let exponent = exponent?;
            if base == 0.0 && exponent < 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            let value = base.powf(exponent);
            if !value.is_finite() {
                return Err(EvalError::NonFinite);
            }
            return Ok(value);
        }
        Ok(base)
    }

    // atom := NUMBER | '(' expr ')'
    fn atom(&mut self) -> Result<f64, EvalError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                self.descend()?;
                let value = self.expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    Some(tok) => Err(EvalError::UnexpectedToken(tok.describe())),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            Some(tok) => Err(EvalError::UnexpectedToken(tok.describe())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }
}

/// Modulo whose result takes the sign of the divisor.
fn floored_mod(a: f64, b: f64) -> Result<f64, EvalError> {
    if b == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    let mut r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
        r += b;
    }
    Ok(r)
}
