//! Minimal arithmetic evaluator for substituted rarity expressions.
//!
//! Only decimal literals, `+ - * /`, unary signs and parentheses are accepted.

use crate::error::{CleanError, CleanResult};

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> CleanResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => {}
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' => tokens.push(Token::Star),
            '/' => tokens.push(Token::Slash),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '0'..='9' | '.' => {
                let start = i;
                while i + 1 < chars.len() && (chars[i + 1].is_ascii_digit() || chars[i + 1] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..=i].iter().collect();
                let number = literal
                    .parse()
                    .map_err(|_| CleanError::Arithmetic(format!("bad literal {:?}", literal)))?;
                tokens.push(Token::Number(number));
            }
            other => {
                return Err(CleanError::Arithmetic(format!(
                    "unexpected character {:?} in {:?}",
                    other, input
                )));
            }
        }
        i += 1;
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> CleanResult<f64> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> CleanResult<f64> {
        let mut value = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == Token::Star {
                value * rhs
            } else {
                if rhs == 0.0 {
                    return Err(CleanError::Arithmetic("division by zero".to_string()));
                }
                value / rhs
            };
        }
        Ok(value)
    }

    fn factor(&mut self) -> CleanResult<f64> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CleanError::Arithmetic("expression nested too deeply".to_string()));
        }
        let value = match self.next() {
            Some(Token::Number(n)) => n,
            Some(Token::Minus) => -self.factor()?,
            Some(Token::Plus) => self.factor()?,
            Some(Token::LParen) => {
                let inner = self.expr()?;
                if self.next() != Some(Token::RParen) {
                    return Err(CleanError::Arithmetic("unbalanced parentheses".to_string()));
                }
                inner
            }
            other => {
                return Err(CleanError::Arithmetic(format!("unexpected token {:?}", other)));
            }
        };
        self.depth -= 1;
        Ok(value)
    }
}

/// Evaluate an arithmetic expression to a finite number.
pub fn evaluate(input: &str) -> CleanResult<f64> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != tokens.len() {
        return Err(CleanError::Arithmetic(format!("trailing input in {:?}", input)));
    }
    if !value.is_finite() {
        return Err(CleanError::Arithmetic(format!("non-finite result for {:?}", input)));
    }
    Ok(value)
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
