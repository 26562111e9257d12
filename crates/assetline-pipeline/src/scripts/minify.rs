//! JavaScript minification.
//!
//! A single pass that strips comments and collapses whitespace while copying
//! string, template and regex literals verbatim. `/*! ... */` license comments
//! are kept. A line break is kept wherever removing it could change
//! automatic semicolon insertion.

/// Whitespace seen since the last emitted character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Gap {
    None,
    Space,
    Newline,
}

/// Keywords after which `/` starts a regex literal.
pub(super) const REGEX_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// Minify `source`.
pub(crate) fn minify(source: &str) -> Result<String, String> {
    let mut minifier = Minifier {
        chars: source.chars().collect(),
        pos: 0,
        out: String::with_capacity(source.len()),
        gap: Gap::None,
        templates: Vec::new(),
    };
    minifier.run()?;
    Ok(minifier.out)
}

struct Minifier {
    chars: Vec<char>,
    pos: usize,
    out: String,
    gap: Gap,
    /// Brace depth inside each open `${ ... }` substitution.
    templates: Vec<usize>,
}

impl Minifier {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(&mut self) -> Result<(), String> {
        while let Some(ch) = self.peek(0) {
            match ch {
                c if c.is_whitespace() => {
                    let gap = if c == '\n' || c == '\r' {
                        Gap::Newline
                    } else {
                        Gap::Space
                    };
                    self.gap = self.gap.max(gap);
                    self.pos += 1;
                }
                '/' if self.peek(1) == Some('/') => self.line_comment(),
                '/' if self.peek(1) == Some('*') => self.block_comment()?,
                '"' | '\'' => {
                    self.flush(ch);
                    self.string(ch)?;
                }
                '`' => {
                    self.flush(ch);
                    self.out.push(ch);
                    self.pos += 1;
                    self.template()?;
                }
                '/' if self.regex_allowed() => {
                    self.flush(ch);
                    self.regex()?;
                }
                '}' if self.templates.last() == Some(&0) => {
                    self.templates.pop();
                    self.gap = Gap::None;
                    self.out.push(ch);
                    self.pos += 1;
                    self.template()?;
                }
                '{' | '}' => {
                    if let Some(depth) = self.templates.last_mut() {
                        if ch == '{' {
                            *depth += 1;
                        } else {
                            *depth -= 1;
                        }
                    }
                    self.flush(ch);
                    self.out.push(ch);
                    self.pos += 1;
                }
                _ => {
                    self.flush(ch);
                    self.out.push(ch);
                    self.pos += 1;
                }
            }
        }

        if !self.templates.is_empty() {
            return Err("unterminated template literal".to_owned());
        }
        Ok(())
    }

    /// Emit the separator owed by the pending gap before `next`.
    fn flush(&mut self, next: char) {
        let gap = std::mem::replace(&mut self.gap, Gap::None);
        let Some(prev) = self.out.chars().next_back() else {
            return;
        };
        match gap {
            Gap::None => {}
            Gap::Newline if ends_statement(prev) && starts_statement(next) => self.out.push('\n'),
            Gap::Space | Gap::Newline => {
                if needs_space(prev, next) {
                    self.out.push(' ');
                }
            }
        }
    }

    fn line_comment(&mut self) {
        while let Some(ch) = self.peek(0) {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.pos += 1;
        }
        self.gap = self.gap.max(Gap::Space);
    }

    fn block_comment(&mut self) -> Result<(), String> {
        let start = self.pos;
        let preserved = self.peek(2) == Some('!');
        self.pos += 2;
        loop {
            match self.peek(0) {
                Some('*') if self.peek(1) == Some('/') => {
                    self.pos += 2;
                    break;
                }
                Some(_) => self.pos += 1,
                None => return Err("unterminated block comment".to_owned()),
            }
        }

        let comment: String = self.chars[start..self.pos].iter().collect();
        if preserved {
            if !self.out.is_empty() {
                self.out.push('\n');
            }
            self.out.push_str(&comment);
            self.gap = Gap::Newline;
        } else if comment.contains('\n') {
            self.gap = Gap::Newline;
        } else {
            self.gap = self.gap.max(Gap::Space);
        }
        Ok(())
    }

    fn string(&mut self, quote: char) -> Result<(), String> {
        self.out.push(quote);
        self.pos += 1;
        while let Some(ch) = self.peek(0) {
            self.out.push(ch);
            self.pos += 1;
            match ch {
                '\\' => {
                    if let Some(escaped) = self.peek(0) {
                        self.out.push(escaped);
                        self.pos += 1;
                    }
                }
                '\n' => return Err("unterminated string literal".to_owned()),
                c if c == quote => return Ok(()),
                _ => {}
            }
        }
        Err("unterminated string literal".to_owned())
    }

    /// Copy template text up to the closing backtick or the next `${`.
    fn template(&mut self) -> Result<(), String> {
        while let Some(ch) = self.peek(0) {
            self.out.push(ch);
            self.pos += 1;
            match ch {
                '\\' => {
                    if let Some(escaped) = self.peek(0) {
                        self.out.push(escaped);
                        self.pos += 1;
                    }
                }
                '`' => return Ok(()),
                '$' if self.peek(0) == Some('{') => {
                    self.out.push('{');
                    self.pos += 1;
                    self.templates.push(0);
                    return Ok(());
                }
                _ => {}
            }
        }
        Err("unterminated template literal".to_owned())
    }

    fn regex(&mut self) -> Result<(), String> {
        self.out.push('/');
        self.pos += 1;
        let mut in_class = false;
        loop {
            let Some(ch) = self.peek(0) else {
                return Err("unterminated regex literal".to_owned());
            };
            self.out.push(ch);
            self.pos += 1;
            match ch {
                '\\' => {
                    if let Some(escaped) = self.peek(0) {
                        self.out.push(escaped);
                        self.pos += 1;
                    }
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                '\n' => return Err("unterminated regex literal".to_owned()),
                _ => {}
            }
        }
        while let Some(flag) = self.peek(0).filter(|c| c.is_ascii_alphabetic()) {
            self.out.push(flag);
            self.pos += 1;
        }
        Ok(())
    }

    /// Whether a `/` at the current position starts a regex literal.
    fn regex_allowed(&self) -> bool {
        let Some(prev) = self.out.chars().next_back() else {
            return true;
        };
        if is_word_char(prev) {
            let word: String = self
                .out
                .chars()
                .rev()
                .take_while(|c| is_word_char(*c))
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            return REGEX_KEYWORDS.contains(&word.as_str());
        }
        !matches!(prev, ')' | ']' | '}' | '"' | '\'' | '`')
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '\\'
}

fn ends_statement(ch: char) -> bool {
    is_word_char(ch) || matches!(ch, ')' | ']' | '}' | '"' | '\'' | '`' | '+' | '-' | '/')
}

fn starts_statement(ch: char) -> bool {
    is_word_char(ch)
        || matches!(
            ch,
            '(' | '[' | '{' | '"' | '\'' | '`' | '+' | '-' | '/' | '!' | '~'
        )
}

/// Whether `prev` and `next` must stay separated by a space.
fn needs_space(prev: char, next: char) -> bool {
    // `a + +b`, `a - -b`, `a / /re/`
    if matches!((prev, next), ('+', '+') | ('-', '-') | ('/', '/' | '*')) {
        return true;
    }
    is_word_char(prev) && is_word_char(next)
}
