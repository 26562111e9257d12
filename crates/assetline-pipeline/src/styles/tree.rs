//! Minimal stylesheet tree shared by the style passes.
//!
//! The parser only knows about blocks, statements and comments. Selectors,
//! values and at-rule preludes are kept as raw text so each pass can treat
//! them the way it needs. Nested rules are accepted anywhere.

use std::fmt::Write as _;

use super::StyleError;

/// One node of a stylesheet.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Node {
    /// `selector { ... }`
    Rule {
        selector: String,
        children: Vec<Node>,
    },
    /// `@name prelude;` or `@name prelude { ... }`
    AtRule {
        name: String,
        prelude: String,
        block: Option<Vec<Node>>,
    },
    /// `property: value`
    Decl { property: String, value: String },
    /// `/* text */`, kept only when it starts with `!`.
    Comment(String),
}

impl Node {
    pub(crate) fn rule(selector: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Rule {
            selector: selector.into(),
            children,
        }
    }

    pub(crate) fn decl(property: impl Into<String>, value: impl Into<String>) -> Self {
        Node::Decl {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// Parse stylesheet text into nodes.
pub(crate) fn parse(source: &str) -> Result<Vec<Node>, StyleError> {
    let mut parser = Parser {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
    };
    let nodes = parser.block(false)?;
    Ok(nodes)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

enum Terminator {
    Semicolon,
    Open,
    Close,
    Eof,
}

impl Parser {
    fn error(&self, message: impl Into<String>) -> StyleError {
        StyleError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Consume a `/* ... */` comment, returning its body.
    fn comment(&mut self) -> Result<String, StyleError> {
        let start_line = self.line;
        self.bump();
        self.bump();
        let mut body = String::new();
        loop {
            match self.bump() {
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    return Ok(body);
                }
                Some(ch) => body.push(ch),
                None => {
                    return Err(StyleError::Parse {
                        line: start_line,
                        message: "unterminated comment".to_owned(),
                    });
                }
            }
        }
    }

    /// Parse nodes until `}` (when `nested`) or end of input.
    fn block(&mut self, nested: bool) -> Result<Vec<Node>, StyleError> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None if nested => return Err(self.error("unclosed block")),
                None => return Ok(nodes),
                Some('}') if nested => {
                    self.bump();
                    return Ok(nodes);
                }
                Some('}') => return Err(self.error("unexpected `}`")),
                Some('/') if self.peek_at(1) == Some('*') => {
                    let body = self.comment()?;
                    if body.starts_with('!') {
                        nodes.push(Node::Comment(body));
                    }
                }
                Some(';') => {
                    self.bump();
                }
                Some(_) => nodes.push(self.statement()?),
            }
        }
    }

    /// Read raw text up to a top-level `;`, `{` or `}`.
    fn chunk(&mut self) -> Result<(String, Terminator), StyleError> {
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            let Some(ch) = self.peek() else {
                return Ok((text, Terminator::Eof));
            };
            match ch {
                '"' | '\'' => {
                    self.bump();
                    text.push(ch);
                    self.string(ch, &mut text)?;
                }
                '/' if self.peek_at(1) == Some('*') => {
                    self.comment()?;
                }
                '(' | '[' => {
                    depth += 1;
                    self.bump();
                    text.push(ch);
                }
                ')' | ']' => {
                    depth = depth.saturating_sub(1);
                    self.bump();
                    text.push(ch);
                }
                ';' if depth == 0 => {
                    self.bump();
                    return Ok((text, Terminator::Semicolon));
                }
                '{' if depth == 0 => {
                    self.bump();
                    return Ok((text, Terminator::Open));
                }
                '}' if depth == 0 => return Ok((text, Terminator::Close)),
                _ => {
                    self.bump();
                    text.push(ch);
                }
            }
        }
    }

    fn string(&mut self, quote: char, text: &mut String) -> Result<(), StyleError> {
        loop {
            match self.bump() {
                Some('\\') => {
                    text.push('\\');
                    if let Some(escaped) = self.bump() {
                        text.push(escaped);
                    }
                }
                Some(ch) if ch == quote => {
                    text.push(ch);
                    return Ok(());
                }
                Some('\n') | None => return Err(self.error("unterminated string")),
                Some(ch) => text.push(ch),
            }
        }
    }

    fn statement(&mut self) -> Result<Node, StyleError> {
        let line = self.line;
        let (raw, terminator) = self.chunk()?;
        let text = collapse(&raw);

        if let Some(at) = text.strip_prefix('@') {
            let (name, prelude) = match at.find(|c: char| c.is_whitespace() || c == '(') {
                Some(i) => (&at[..i], at[i..].trim()),
                None => (at, ""),
            };
            let block = match terminator {
                Terminator::Open => Some(self.block(true)?),
                _ => None,
            };
            return Ok(Node::AtRule {
                name: name.to_owned(),
                prelude: prelude.to_owned(),
                block,
            });
        }

        match terminator {
            Terminator::Open => Ok(Node::Rule {
                selector: text,
                children: self.block(true)?,
            }),
            _ => {
                let Some((property, value)) = text.split_once(':') else {
                    return Err(StyleError::Parse {
                        line,
                        message: format!("expected declaration, found `{text}`"),
                    });
                };
                Ok(Node::decl(property.trim(), value.trim()))
            }
        }
    }
}

/// Collapse runs of whitespace outside strings into single spaces.
fn collapse(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut quote = None;
    let mut pending_space = false;
    let mut escaped = false;

    for ch in raw.trim().chars() {
        if let Some(q) = quote {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if ch == '"' || ch == '\'' {
            quote = Some(ch);
        }
        out.push(ch);
    }
    out
}

/// Split `text` on `separator` at nesting depth zero, outside strings.
///
/// Parts are trimmed; empty parts are dropped.
pub(crate) fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote = None;

    for ch in text.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            '(' | '[' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if c == separator && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    parts.push(current);

    parts
        .into_iter()
        .map(|p| p.trim().to_owned())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Print nodes as indented stylesheet text.
pub(crate) fn print(nodes: &[Node]) -> String {
    let mut out = String::new();
    print_nodes(nodes, 0, &mut out);
    out
}

fn print_nodes(nodes: &[Node], indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    for (i, node) in nodes.iter().enumerate() {
        if indent == 0 && i > 0 && !matches!(node, Node::Decl { .. }) {
            out.push('\n');
        }
        match node {
            Node::Rule { selector, children } => {
                let _ = writeln!(out, "{pad}{selector} {{");
                print_nodes(children, indent + 1, out);
                let _ = writeln!(out, "{pad}}}");
            }
            Node::AtRule {
                name,
                prelude,
                block,
            } => {
                let head = if prelude.is_empty() {
                    format!("@{name}")
                } else {
                    format!("@{name} {prelude}")
                };
                match block {
                    Some(children) => {
                        let _ = writeln!(out, "{pad}{head} {{");
                        print_nodes(children, indent + 1, out);
                        let _ = writeln!(out, "{pad}}}");
                    }
                    None => {
                        let _ = writeln!(out, "{pad}{head};");
                    }
                }
            }
            Node::Decl { property, value } => {
                let _ = writeln!(out, "{pad}{property}: {value};");
            }
            Node::Comment(body) => {
                let _ = writeln!(out, "{pad}/*{body}*/");
            }
        }
    }
}
