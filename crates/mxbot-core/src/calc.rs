//! Arithmetic for `!calc`: numbers, `+ - * / ^`, unary signs and parentheses.
//!
//! Grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := ('+' | '-') unary | power
//! power  := atom ('^' unary)?
//! atom   := number | '(' expr ')'
//! ```
//!
//! `^` is right-associative and binds tighter than unary minus (`-2^2 == -4`).

use std::fmt;

/// Parenthesis/unary nesting limit.
const MAX_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected '{found}' at position {pos}")]
    Unexpected { found: char, pos: usize },
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NonFinite,
    #[error("expression nested too deeply")]
    TooDeep,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, CalcError> {
    let mut out = Vec::new();
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        let (pos, c) = chars[i];
        let tok = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                    i += 1;
                }
                let end = chars.get(i).map(|(p, _)| *p).unwrap_or(input.len());
                let text = &input[pos..end];
                let n = text
                    .parse::<f64>()
                    .map_err(|_| CalcError::InvalidNumber(text.to_string()))?;
                out.push((pos, Token::Num(n)));
                continue;
            }
            found => return Err(CalcError::Unexpected { found, pos }),
        };
        out.push((pos, tok));
        i += 1;
    }
    Ok(out)
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<(usize, Token)>,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(_, t)| *t)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.peek();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn unexpected_here(&self) -> CalcError {
        match self.tokens.get(self.pos) {
            Some((p, _)) => CalcError::Unexpected {
                found: self.src[*p..].chars().next().unwrap_or('?'),
                pos: *p,
            },
            None => CalcError::UnexpectedEnd,
        }
    }

    fn enter(&mut self) -> Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.bump();
                    acc += self.term()?;
                }
                Some(Token::Minus) => {
                    self.bump();
                    acc -= self.term()?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut acc = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.bump();
                    acc *= self.unary()?;
                }
                Some(Token::Slash) => {
                    self.bump();
                    let rhs = self.unary()?;
                    if rhs == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    acc /= rhs;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn unary(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.bump();
                self.enter()?;
                let v = -self.unary()?;
                self.depth -= 1;
                Ok(v)
            }
            Some(Token::Plus) => {
                self.bump();
                self.enter()?;
                let v = self.unary()?;
                self.depth -= 1;
                Ok(v)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Caret) {
            self.bump();
            self.enter()?;
            let exp = self.unary()?;
            self.depth -= 1;
            return Ok(base.powf(exp));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Num(n)) => {
                self.bump();
                Ok(n)
            }
            Some(Token::LParen) => {
                self.bump();
                self.enter()?;
                let v = self.expr()?;
                if self.peek() != Some(Token::RParen) {
                    return Err(self.unexpected_here());
                }
                self.bump();
                self.depth -= 1;
                Ok(v)
            }
            _ => Err(self.unexpected_here()),
        }
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(input: &str) -> Result<f64, CalcError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }

    let mut p = Parser {
        src: input,
        tokens,
        pos: 0,
        depth: 0,
    };
    let v = p.expr()?;
    if p.pos < p.tokens.len() {
        return Err(p.unexpected_here());
    }
    if !v.is_finite() {
        return Err(CalcError::NonFinite);
    }
    Ok(v)
}

/// Calculator result rendered without a trailing `.0` for integral values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Number(pub f64);

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v.fract() == 0.0 && v.abs() < 1e15 {
            write!(f, "{}", v as i64)
        } else {
            write!(f, "{v}")
        }
    }
}
