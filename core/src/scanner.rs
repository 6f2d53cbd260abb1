use std::iter;

use thiserror::Error;

use crate::diagnostics::{DiagnosticSink, NullDiagnosticSink};
use crate::token::{self, Token, TokenType};
use crate::types::Literal;

/// Scans `source` in one pass, discarding diagnostics as they are reported. They are still
/// available afterwards through [`Scanned::errors`].
pub fn scan(source: &str) -> Scanned {
    Scanner::new(source.to_string()).scan_tokens(&mut NullDiagnosticSink)
}

/// What the scanner does with the character that starts a lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Single(TokenType),
    OneOrTwo { one: TokenType, two: TokenType },
    Slash,
    Whitespace,
    Newline,
    Quote,
    Digit,
    Alpha,
    Unexpected,
}

fn classify(c: char) -> Rule {
    match c {
        // Single character tokens
        '(' => Rule::Single(TokenType::LeftParen),
        ')' => Rule::Single(TokenType::RightParen),
        '{' => Rule::Single(TokenType::LeftBrace),
        '}' => Rule::Single(TokenType::RightBrace),
        ',' => Rule::Single(TokenType::Comma),
        '.' => Rule::Single(TokenType::Dot),
        '-' => Rule::Single(TokenType::Minus),
        '+' => Rule::Single(TokenType::Plus),
        ';' => Rule::Single(TokenType::Semicolon),
        '*' => Rule::Single(TokenType::Star),

        // One or two character tokens
        '!' => Rule::OneOrTwo {
            one: TokenType::Bang,
            two: TokenType::BangEqual,
        },
        '=' => Rule::OneOrTwo {
            one: TokenType::Equal,
            two: TokenType::EqualEqual,
        },
        '<' => Rule::OneOrTwo {
            one: TokenType::Less,
            two: TokenType::LessEqual,
        },
        '>' => Rule::OneOrTwo {
            one: TokenType::Greater,
            two: TokenType::GreaterEqual,
        },

        // Division or comments
        '/' => Rule::Slash,

        // A "\r\n" pair is whitespace followed by one newline
        ' ' | '\r' | '\t' => Rule::Whitespace,
        '\n' => Rule::Newline,
        '"' => Rule::Quote,

        c if is_digit(c) => Rule::Digit,
        c if is_alpha(c) => Rule::Alpha,
        _ => Rule::Unexpected,
    }
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_alphanumeric(c: char) -> bool {
    is_alpha(c) || is_digit(c)
}

/// Turns one source buffer into tokens. A scanner runs exactly once: [`Scanner::scan_tokens`]
/// consumes it.
pub struct Scanner {
    source: String,
    // Byte offset of every char in `source`, followed by `source.len()`.
    boundaries: Vec<usize>,
    tokens: Vec<Token>,
    errors: Vec<ScanError>,
    start: usize,
    current: usize,
    line: u32,
}

impl Scanner {
    pub fn new(source: String) -> Self {
        let boundaries = source
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(iter::once(source.len()))
            .collect();

        Scanner {
            source,
            boundaries,
            tokens: Vec::new(),
            errors: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scans the whole buffer. Every lexical error is reported to `sink` when it is found and
    /// recorded in the result; scanning always carries on to the end of the buffer.
    pub fn scan_tokens(mut self, sink: &mut dyn DiagnosticSink) -> Scanned {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token(sink);
        }

        self.tokens.push(Token::eof(self.line));

        Scanned {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    fn len(&self) -> usize {
        self.boundaries.len() - 1
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.len()
    }

    fn scan_token(&mut self, sink: &mut dyn DiagnosticSink) {
        let rule = match self.advance() {
            Some(c) => classify(c),
            None => return,
        };

        match rule {
            Rule::Single(token_type) => self.add_token(token_type, None),
            Rule::OneOrTwo { one, two } => {
                let token_type = if self.matches('=') { two } else { one };
                self.add_token(token_type, None)
            }
            Rule::Slash => {
                if self.matches('/') {
                    self.line_comment()
                } else if self.matches('*') {
                    self.block_comment(sink)
                } else {
                    self.add_token(TokenType::Slash, None)
                }
            }
            Rule::Whitespace => {}
            Rule::Newline => self.line += 1,
            Rule::Quote => self.string(sink),
            Rule::Digit => self.number(sink),
            Rule::Alpha => self.identifier(),
            Rule::Unexpected => self.error(sink, self.line, ScanErrorKind::UnexpectedCharacter),
        }
    }

    fn line_comment(&mut self) {
        // A comment goes until the end of the line
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
    }

    fn block_comment(&mut self, sink: &mut dyn DiagnosticSink) {
        let line = self.line;

        while let Some(c) = self.peek() {
            if c == '*' && self.peek_next() == Some('/') {
                self.advance();
                self.advance();
                return;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        self.error(sink, line, ScanErrorKind::UnterminatedComment);
    }

    fn string(&mut self, sink: &mut dyn DiagnosticSink) {
        let line = self.line;

        while let Some(c) = self.peek() {
            if c == '"' {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.error(sink, line, ScanErrorKind::UnterminatedString);
            return;
        }

        // Consume the closing "
        self.advance();

        // Trim surrounding quotes
        let value = self.slice(self.start + 1, self.current - 1).to_string();
        self.add_token(TokenType::String, Some(Literal::String(value)))
    }

    fn number(&mut self, sink: &mut dyn DiagnosticSink) {
        while self.peek().is_some_and(is_digit) {
            self.advance();
        }

        // Look for a fractional part
        if self.peek() == Some('.') && self.peek_next().is_some_and(is_digit) {
            // Consume .
            self.advance();

            while self.peek().is_some_and(is_digit) {
                self.advance();
            }
        }

        let parsed = self.lexeme().parse::<f64>();
        match parsed {
            Ok(value) => self.add_token(TokenType::Number, Some(Literal::Number(value))),
            Err(_) => self.error(sink, self.line, ScanErrorKind::InvalidNumber),
        }
    }

    fn identifier(&mut self) {
        while self.peek().is_some_and(is_alphanumeric) {
            self.advance();
        }

        let token_type = token::keyword(self.lexeme()).unwrap_or(TokenType::Identifier);
        self.add_token(token_type, None)
    }

    fn char_at(&self, index: usize) -> Option<char> {
        let offset = *self.boundaries.get(index)?;
        self.source.get(offset..)?.chars().next()
    }

    fn slice(&self, from: usize, to: usize) -> &str {
        &self.source[self.boundaries[from]..self.boundaries[to]]
    }

    fn lexeme(&self) -> &str {
        self.slice(self.start, self.current)
    }

    fn peek(&self) -> Option<char> {
        self.char_at(self.current)
    }

    fn peek_next(&self) -> Option<char> {
        self.char_at(self.current + 1)
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() != Some(expected) {
            return false;
        }

        self.current += 1;

        true
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current += 1;
        Some(c)
    }

    fn add_token(&mut self, token_type: TokenType, literal: Option<Literal>) {
        let lexeme = self.lexeme().to_string();
        self.tokens
            .push(Token::new(token_type, lexeme, literal, self.line));
    }

    fn error(&mut self, sink: &mut dyn DiagnosticSink, line: u32, kind: ScanErrorKind) {
        sink.report(line, &kind.to_string());
        self.errors.push(ScanError::new(line, kind));
    }
}

/// The outcome of one scan pass: the tokens, always ending with a single [`TokenType::Eof`],
/// and every error found along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Scanned {
    tokens: Vec<Token>,
    errors: Vec<ScanError>,
}

impl Scanned {
    pub fn tokens(&self) -> &[Token] {
        self.tokens.as_slice()
    }

    pub fn errors(&self) -> &[ScanError] {
        self.errors.as_slice()
    }

    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    pub fn into_parts(self) -> (Vec<Token>, Vec<ScanError>) {
        (self.tokens, self.errors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("[line {line}] Error: {kind}")]
pub struct ScanError {
    line: u32,
    kind: ScanErrorKind,
}

impl ScanError {
    pub fn new(line: u32, kind: ScanErrorKind) -> Self {
        ScanError { line, kind }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn kind(&self) -> ScanErrorKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScanErrorKind {
    #[error("Unexpected character.")]
    UnexpectedCharacter,
    #[error("Unterminated string.")]
    UnterminatedString,
    #[error("Unterminated multiline comment.")]
    UnterminatedComment,
    /// The digit run could not be read as a floating-point value.
    #[error("Invalid number.")]
    InvalidNumber,
}
