//! loxvm-lex - Lexical analysis for the Lox bytecode pipeline.
//!
//! The scanner turns source text into a lazy stream of tokens, one per call
//! to [`Scanner::scan_token`]. It is the first phase of the pipeline and
//! knows nothing about the chunk format or the VM.
//!
//! Design points:
//!
//! - Tokens borrow their lexeme from the source; nothing is interned or
//!   allocated here.
//! - Errors are in-band: a token of kind [`TokenKind::Error`] carries its
//!   message in the lexeme field, and the compiler decides how to report it.
//! - String escapes pass through raw; the compiler owns escape decoding
//!   because only it can report decode errors with proper locations.

pub mod cursor;
mod edge_cases;
pub mod scanner;
pub mod token;

pub use cursor::Cursor;
pub use scanner::Scanner;
pub use token::{keyword_from_ident, Token, TokenKind};
