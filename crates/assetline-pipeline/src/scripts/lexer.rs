//! Literal and comment spans of JavaScript source.
//!
//! Module rewriting works on raw text, so it has to know which bytes are
//! code. This scan follows the same literal rules as the minifier: strings,
//! template text, regex literals and comments are covered; `${ ... }`
//! substitutions inside templates are code again.

use std::ops::Range;

use regex::{Match, Regex};

use super::minify::REGEX_KEYWORDS;

/// Sorted, non-overlapping byte ranges covered by literals and comments.
#[derive(Debug)]
pub(crate) struct Literals {
    spans: Vec<Range<usize>>,
}

impl Literals {
    pub(crate) fn scan(source: &str) -> Self {
        let mut lexer = Lexer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            spans: Vec::new(),
            templates: Vec::new(),
            prev: None,
            word: 0..0,
        };
        lexer.run();
        Self {
            spans: lexer.spans,
        }
    }

    /// Whether byte `pos` is outside every literal and comment.
    pub(crate) fn is_code(&self, pos: usize) -> bool {
        let index = self.spans.partition_point(|span| span.end <= pos);
        !self.spans.get(index).is_some_and(|span| span.contains(&pos))
    }

    /// First match of `re` in `text` that starts in code.
    pub(crate) fn find<'t>(&self, re: &Regex, text: &'t str) -> Option<Match<'t>> {
        re.find_iter(text).find(|m| self.is_code(m.start()))
    }
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    spans: Vec<Range<usize>>,
    /// Brace depth inside each open `${ ... }` substitution.
    templates: Vec<usize>,
    /// Last significant byte of code.
    prev: Option<u8>,
    /// Last word of code, used to tell regex literals from division.
    word: Range<usize>,
}

impl Lexer<'_> {
    fn at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn run(&mut self) {
        while let Some(byte) = self.at(0) {
            let start = self.pos;
            match byte {
                b'/' if self.at(1) == Some(b'/') => {
                    self.skip_until(|b| b == b'\n');
                    self.spans.push(start..self.pos);
                }
                b'/' if self.at(1) == Some(b'*') => {
                    self.block_comment();
                    self.spans.push(start..self.pos);
                }
                b'"' | b'\'' => {
                    self.pos += 1;
                    self.quoted(byte);
                    self.spans.push(start..self.pos);
                    self.prev = Some(byte);
                }
                b'`' => {
                    self.pos += 1;
                    self.template(start);
                }
                b'/' if self.regex_allowed() => {
                    self.regex();
                    self.spans.push(start..self.pos);
                    self.prev = Some(b'/');
                    self.word = 0..0;
                }
                b'}' if self.templates.last() == Some(&0) => {
                    self.templates.pop();
                    self.pos += 1;
                    self.template(start);
                }
                b if b.is_ascii_whitespace() => self.pos += 1,
                b if is_word_byte(b) => {
                    self.skip_until(|b| !is_word_byte(b));
                    self.word = start..self.pos;
                    self.prev = Some(b);
                }
                b => {
                    if let Some(depth) = self.templates.last_mut() {
                        match b {
                            b'{' => *depth += 1,
                            b'}' => *depth = depth.saturating_sub(1),
                            _ => {}
                        }
                    }
                    self.pos += 1;
                    self.prev = Some(b);
                }
            }
        }
    }

    fn skip_until(&mut self, stop: impl Fn(u8) -> bool) {
        while self.at(0).is_some_and(|b| !stop(b)) {
            self.pos += 1;
        }
    }

    fn block_comment(&mut self) {
        self.pos += 2;
        while let Some(byte) = self.at(0) {
            self.pos += 1;
            if byte == b'*' && self.at(0) == Some(b'/') {
                self.pos += 1;
                return;
            }
        }
    }

    fn quoted(&mut self, quote: u8) {
        while let Some(byte) = self.at(0) {
            self.pos += 1;
            match byte {
                b'\\' => self.pos += 1,
                b'\n' => return,
                b if b == quote => return,
                _ => {}
            }
        }
        self.pos = self.pos.min(self.bytes.len());
    }

    /// Template text from `start` up to the closing backtick or the next
    /// `${`, which opens a substitution.
    fn template(&mut self, start: usize) {
        while let Some(byte) = self.at(0) {
            self.pos += 1;
            match byte {
                b'\\' => self.pos += 1,
                b'`' => break,
                b'$' if self.at(0) == Some(b'{') => {
                    self.pos += 1;
                    self.templates.push(0);
                    break;
                }
                _ => {}
            }
        }
        self.pos = self.pos.min(self.bytes.len());
        self.spans.push(start..self.pos);
        self.prev = Some(b'`');
    }

    fn regex(&mut self) {
        self.pos += 1;
        let mut in_class = false;
        while let Some(byte) = self.at(0) {
            self.pos += 1;
            match byte {
                b'\\' => self.pos += 1,
                b'[' => in_class = true,
                b']' => in_class = false,
                b'/' if !in_class => break,
                b'\n' => return,
                _ => {}
            }
        }
        self.pos = self.pos.min(self.bytes.len());
        self.skip_until(|b| !b.is_ascii_alphabetic());
    }

    /// Whether a `/` at the current position starts a regex literal.
    fn regex_allowed(&self) -> bool {
        match self.prev {
            None => true,
            Some(b) if is_word_byte(b) => self
                .source
                .get(self.word.clone())
                .is_some_and(|word| REGEX_KEYWORDS.contains(&word)),
            Some(b) => !matches!(b, b')' | b']' | b'}' | b'"' | b'\'' | b'`'),
        }
    }
}

/// Identifier bytes; non-ASCII bytes belong to identifiers.
fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'$' | b'\\') || !byte.is_ascii()
}
