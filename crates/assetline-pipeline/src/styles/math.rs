//! `resolve(expr)` evaluation.
//!
//! Expressions support `+ - * /`, parentheses and numbers with at most one
//! distinct unit. Expressions that still reference `$variables` are left in
//! place so the mixin pass can resolve them after substitution.

use super::StyleError;
use super::tree::{self, Node};

const FUNCTION: &str = "resolve(";

pub(crate) fn run(css: &str) -> Result<String, StyleError> {
    let mut nodes = tree::parse(css)?;
    resolve_nodes(&mut nodes)?;
    Ok(tree::print(&nodes))
}

/// Evaluate `resolve()` calls in every value and at-rule prelude.
pub(crate) fn resolve_nodes(nodes: &mut [Node]) -> Result<(), StyleError> {
    for node in nodes {
        match node {
            Node::Decl { value, .. } => *value = resolve_text(value)?,
            Node::Rule { children, .. } => resolve_nodes(children)?,
            Node::AtRule { name, .. } if name == "define-mixin" => {}
            Node::AtRule { prelude, block, .. } => {
                *prelude = resolve_text(prelude)?;
                if let Some(children) = block {
                    resolve_nodes(children)?;
                }
            }
            Node::Comment(_) => {}
        }
    }
    Ok(())
}

/// Replace each `resolve(...)` in `text` with its computed value.
pub(crate) fn resolve_text(text: &str) -> Result<String, StyleError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = find_call(rest) {
        out.push_str(&rest[..start]);
        let after = &rest[start + FUNCTION.len()..];
        let Some(len) = matching_paren(after) else {
            return Err(StyleError::Math {
                expr: rest[start..].to_owned(),
                message: "unbalanced parentheses".to_owned(),
            });
        };
        let expr = &after[..len];
        if expr.contains('$') {
            out.push_str(&rest[start..start + FUNCTION.len() + len + 1]);
        } else {
            out.push_str(&evaluate(expr)?);
        }
        rest = &after[len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Position of a `resolve(` call that is not part of a longer identifier.
fn find_call(text: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = text[offset..].find(FUNCTION) {
        let start = offset + pos;
        let preceded_by_ident = text[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !preceded_by_ident {
            return Some(start);
        }
        offset = start + FUNCTION.len();
    }
    None
}

/// Length of `text` up to the `)` closing an already-open paren.
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Evaluate an arithmetic expression and format the result.
pub(crate) fn evaluate(expr: &str) -> Result<String, StyleError> {
    let fail = |message: &str| StyleError::Math {
        expr: expr.to_owned(),
        message: message.to_owned(),
    };
    let tokens = tokenize(expr).map_err(|m| fail(&m))?;
    let mut parser = ExprParser { tokens, pos: 0 };
    let value = parser.expr().map_err(|m| fail(&m))?;
    if parser.pos != parser.tokens.len() {
        return Err(fail("unexpected trailing input"));
    }
    Ok(value.format())
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64, Option<String>),
    Op(char),
    Open,
    Close,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        match ch {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(ch));
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let number: String = chars[start..i].iter().collect();
                let number = number
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number `{number}`"))?;
                let unit_start = i;
                while i < chars.len() && (chars[i].is_ascii_alphabetic() || chars[i] == '%') {
                    i += 1;
                }
                let unit: String = chars[unit_start..i].iter().collect();
                tokens.push(Token::Number(number, (!unit.is_empty()).then_some(unit)));
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    Ok(tokens)
}

#[derive(Clone, Debug, PartialEq)]
struct Quantity {
    value: f64,
    unit: Option<String>,
}

impl Quantity {
    fn combine_unit(self, other: &Quantity) -> Result<Option<String>, String> {
        match (self.unit, &other.unit) {
            (Some(a), Some(b)) if &a != b => Err(format!("cannot mix units `{a}` and `{b}`")),
            (Some(a), _) => Ok(Some(a)),
            (None, b) => Ok(b.clone()),
        }
    }

    fn format(&self) -> String {
        let rounded = (self.value * 100_000.0).round() / 100_000.0;
        let mut s = format!("{rounded:.5}");
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        if s == "-0" {
            s = "0".to_owned();
        }
        format!("{s}{}", self.unit.as_deref().unwrap_or(""))
    }
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn expr(&mut self) -> Result<Quantity, String> {
        let mut left = self.term()?;
        while let Some(&Token::Op(op @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let right = self.term()?;
            let value = if op == '+' {
                left.value + right.value
            } else {
                left.value - right.value
            };
            left = Quantity {
                value,
                unit: left.combine_unit(&right)?,
            };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Quantity, String> {
        let mut left = self.factor()?;
        while let Some(&Token::Op(op @ ('*' | '/'))) = self.peek() {
            self.pos += 1;
            let right = self.factor()?;
            let value = if op == '*' {
                left.value * right.value
            } else {
                if right.value == 0.0 {
                    return Err("division by zero".to_owned());
                }
                left.value / right.value
            };
            left = Quantity {
                value,
                unit: left.combine_unit(&right)?,
            };
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Quantity, String> {
        match self.tokens.get(self.pos).cloned() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                let inner = self.factor()?;
                Ok(Quantity {
                    value: -inner.value,
                    unit: inner.unit,
                })
            }
            Some(Token::Open) => {
                self.pos += 1;
                let inner = self.expr()?;
                if self.peek() != Some(&Token::Close) {
                    return Err("expected `)`".to_owned());
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(Token::Number(value, unit)) => {
                self.pos += 1;
                Ok(Quantity { value, unit })
            }
            Some(other) => Err(format!("unexpected token {other:?}")),
            None => Err("unexpected end of expression".to_owned()),
        }
    }
}
