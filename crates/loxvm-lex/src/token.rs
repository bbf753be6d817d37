//! Token model for the Lox scanner.
//!
//! Tokens are transient: they borrow their lexeme from the source text and
//! do not outlive a single scanning/compilation step. Error tokens carry
//! their message in the lexeme field (a `&'static str` coerces into the
//! source lifetime).

use std::fmt;

/// The closed set of token kinds produced by the scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    /// "("
    LeftParen,
    /// ")"
    RightParen,
    /// "{"
    LeftBrace,
    /// "}"
    RightBrace,
    /// ","
    Comma,
    /// "."
    Dot,
    /// ";"
    Semicolon,
    /// "-"
    Minus,
    /// "+"
    Plus,
    /// "/"
    Slash,
    /// "*"
    Star,
    /// "->" - match arm separator
    Arrow,

    // =========================================================================
    // ONE- OR TWO-CHARACTER OPERATORS
    // =========================================================================
    /// "!"
    Bang,
    /// "!="
    BangEqual,
    /// "="
    Equal,
    /// "=="
    EqualEqual,
    /// ">"
    Greater,
    /// ">="
    GreaterEqual,
    /// "<"
    Less,
    /// "<="
    LessEqual,

    // =========================================================================
    // LITERALS
    // =========================================================================
    /// Identifier (variable name)
    Identifier,
    /// String literal, lexeme includes the enclosing quotes
    String,
    /// Number literal
    Number,

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    And,
    Break,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Match,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Unless,
    Until,
    Var,
    While,

    // =========================================================================
    // SPECIAL
    // =========================================================================
    /// Scan error; the message is in the lexeme
    Error,
    /// End of input
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A lexical unit: kind, source slice, and the line it was scanned on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'src> {
    /// What was scanned.
    pub kind: TokenKind,
    /// The matched source text (or an error message for `Error` tokens).
    pub lexeme: &'src str,
    /// Line number (1-based).
    pub line: u32,
}

impl<'src> Token<'src> {
    /// A synthetic token usable before the first real token is scanned.
    pub fn sentinel() -> Token<'static> {
        Token {
            kind: TokenKind::Eof,
            lexeme: "",
            line: 1,
        }
    }
}

/// Recognizes reserved words with a decision tree over the first one or two
/// characters of the lexeme.
///
/// A candidate becomes a keyword only when the remaining characters match
/// exactly; the scanner guarantees no identifier characters follow.
///
/// # Example
///
/// ```
/// use loxvm_lex::token::{keyword_from_ident, TokenKind};
///
/// assert_eq!(keyword_from_ident("unless"), Some(TokenKind::Unless));
/// assert_eq!(keyword_from_ident("unlesss"), None);
/// assert_eq!(keyword_from_ident("foo"), None);
/// ```
pub fn keyword_from_ident(text: &str) -> Option<TokenKind> {
    let bytes = text.as_bytes();
    let first = *bytes.first()?;

    let check = |rest: &str, kind: TokenKind| {
        if text.len() == 1 + rest.len() && &text[1..] == rest {
            Some(kind)
        } else {
            None
        }
    };

    match first {
        b'a' => check("nd", TokenKind::And),
        b'b' => check("reak", TokenKind::Break),
        b'c' => check("lass", TokenKind::Class),
        b'e' => check("lse", TokenKind::Else),
        b'f' => match bytes.get(1) {
            Some(b'a') => (text == "false").then_some(TokenKind::False),
            Some(b'o') => (text == "for").then_some(TokenKind::For),
            Some(b'u') => (text == "fun").then_some(TokenKind::Fun),
            _ => None,
        },
        b'i' => check("f", TokenKind::If),
        b'm' => check("atch", TokenKind::Match),
        b'n' => check("il", TokenKind::Nil),
        b'o' => check("r", TokenKind::Or),
        b'p' => check("rint", TokenKind::Print),
        b'r' => check("eturn", TokenKind::Return),
        b's' => check("uper", TokenKind::Super),
        b't' => match bytes.get(1) {
            Some(b'h') => (text == "this").then_some(TokenKind::This),
            Some(b'r') => (text == "true").then_some(TokenKind::True),
            _ => None,
        },
        b'u' => match bytes.get(2) {
            Some(b'l') => (text == "unless").then_some(TokenKind::Unless),
            Some(b't') => (text == "until").then_some(TokenKind::Until),
            _ => None,
        },
        b'v' => check("ar", TokenKind::Var),
        b'w' => check("hile", TokenKind::While),
        _ => None,
    }
}
