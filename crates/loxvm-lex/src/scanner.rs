//! On-demand scanner producing one token per call.
//!
//! The scanner is stateless across calls except for its scan position and
//! line number. It skips whitespace and both `//` line and `/* */` block
//! comments (block comments do not nest; an unterminated block comment
//! simply reaches the end of input). Escape sequences inside string
//! literals are NOT processed here; decoding them belongs to the compiler.
//! The scanner does keep the line counter honest across embedded newlines.
//!
//! Scan errors surface as tokens of kind [`TokenKind::Error`] whose lexeme
//! is the message; the compiler reports and skips them.

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Token, TokenKind};

/// Returns true for characters that may appear in an identifier after the
/// first: ASCII alphanumerics and underscore.
#[inline]
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Returns true for characters that may start an identifier.
#[inline]
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// The Lox scanner.
///
/// # Example
///
/// ```
/// use loxvm_lex::{Scanner, TokenKind};
///
/// let mut scanner = Scanner::new("print 1;");
/// assert_eq!(scanner.scan_token().kind, TokenKind::Print);
/// assert_eq!(scanner.scan_token().kind, TokenKind::Number);
/// assert_eq!(scanner.scan_token().kind, TokenKind::Semicolon);
/// assert_eq!(scanner.scan_token().kind, TokenKind::Eof);
/// ```
pub struct Scanner<'src> {
    cursor: Cursor<'src>,
    /// Start position of the token currently being scanned.
    token_start: usize,
}

impl<'src> Scanner<'src> {
    /// Creates a scanner over the given source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            token_start: 0,
        }
    }

    /// Scans and returns the next token.
    pub fn scan_token(&mut self) -> Token<'src> {
        self.skip_whitespace_and_comments();
        self.token_start = self.cursor.position();

        if self.cursor.is_at_end() {
            return self.make_token(TokenKind::Eof);
        }

        let c = self.cursor.current_char();
        self.cursor.advance();

        match c {
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            '{' => self.make_token(TokenKind::LeftBrace),
            '}' => self.make_token(TokenKind::RightBrace),
            ',' => self.make_token(TokenKind::Comma),
            '.' => self.make_token(TokenKind::Dot),
            ';' => self.make_token(TokenKind::Semicolon),
            '+' => self.make_token(TokenKind::Plus),
            '*' => self.make_token(TokenKind::Star),
            '/' => self.make_token(TokenKind::Slash),
            '-' => {
                if self.cursor.match_char('>') {
                    self.make_token(TokenKind::Arrow)
                } else {
                    self.make_token(TokenKind::Minus)
                }
            }
            '!' => {
                if self.cursor.match_char('=') {
                    self.make_token(TokenKind::BangEqual)
                } else {
                    self.make_token(TokenKind::Bang)
                }
            }
            '=' => {
                if self.cursor.match_char('=') {
                    self.make_token(TokenKind::EqualEqual)
                } else {
                    self.make_token(TokenKind::Equal)
                }
            }
            '<' => {
                if self.cursor.match_char('=') {
                    self.make_token(TokenKind::LessEqual)
                } else {
                    self.make_token(TokenKind::Less)
                }
            }
            '>' => {
                if self.cursor.match_char('=') {
                    self.make_token(TokenKind::GreaterEqual)
                } else {
                    self.make_token(TokenKind::Greater)
                }
            }
            '"' => self.scan_string(),
            c if c.is_ascii_digit() => self.scan_number(),
            c if is_ident_start(c) => self.scan_identifier(),
            _ => self.error_token("Unexpected character."),
        }
    }

    /// Skips whitespace, `//` line comments, and `/* */` block comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.cursor.current_char() {
                ' ' | '\r' | '\t' | '\n' => self.cursor.advance(),
                '/' => match self.cursor.char_at(1) {
                    '/' => {
                        while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                            self.cursor.advance();
                        }
                    }
                    '*' => {
                        self.cursor.advance();
                        self.cursor.advance();
                        // Block comments do not nest; hitting the end of
                        // input here is not an error.
                        while !self.cursor.is_at_end() {
                            if self.cursor.current_char() == '*' && self.cursor.char_at(1) == '/' {
                                self.cursor.advance();
                                self.cursor.advance();
                                break;
                            }
                            self.cursor.advance();
                        }
                    }
                    _ => return,
                },
                _ => return,
            }
        }
    }

    /// Scans a double-quoted string literal. The returned lexeme keeps the
    /// enclosing quotes; escapes are left for the compiler.
    fn scan_string(&mut self) -> Token<'src> {
        while !self.cursor.is_at_end() && self.cursor.current_char() != '"' {
            if self.cursor.current_char() == '\\' {
                // Skip the backslash and whatever it escapes, so an escaped
                // quote does not end the literal. Decoding happens later.
                self.cursor.advance();
            }
            self.cursor.advance();
        }

        if self.cursor.is_at_end() {
            return self.error_token("Unterminated string");
        }

        self.cursor.advance();
        self.make_token(TokenKind::String)
    }

    /// Scans a number: one or more digits, optionally followed by `.` and
    /// one or more digits. No exponent form, no hex.
    fn scan_number(&mut self) -> Token<'src> {
        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }

        if self.cursor.current_char() == '.' && self.cursor.char_at(1).is_ascii_digit() {
            self.cursor.advance();
            while self.cursor.current_char().is_ascii_digit() {
                self.cursor.advance();
            }
        }

        self.make_token(TokenKind::Number)
    }

    /// Scans an identifier or keyword.
    fn scan_identifier(&mut self) -> Token<'src> {
        while is_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }

        let text = self.cursor.slice_from(self.token_start);
        let kind = keyword_from_ident(text).unwrap_or(TokenKind::Identifier);
        self.make_token(kind)
    }

    /// Builds a token spanning from the recorded start to the current
    /// position.
    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token {
            kind,
            lexeme: self.cursor.slice_from(self.token_start),
            line: self.cursor.line(),
        }
    }

    /// Builds an error token carrying `message` as its lexeme.
    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token {
            kind: TokenKind::Error,
            lexeme: message,
            line: self.cursor.line(),
        }
    }
}
