//! String escape rendering.
//!
//! The scanner hands string literals through raw; this module decodes the
//! escape sequences into the final contents before the compiler interns
//! them. Recognized escapes: `\n`, `\r`, `\t`, `\"`, `\\`, and `\uX…X;`
//! with one to six case-insensitive hex digits terminated by a semicolon.
//! Every other byte, including non-ASCII source bytes, copies through
//! unchanged.

use thiserror::Error;

/// Largest valid Unicode scalar value.
const MAX_CODE_POINT: u32 = 0x10FFFF;

/// A malformed escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EscapeError {
    /// `\` followed by a character that is not an escape.
    #[error("Unknown escape sequence '\\{0}'.")]
    Unknown(char),

    /// `\` at the very end of the literal.
    #[error("Unterminated escape sequence.")]
    Unterminated,

    /// `\u` not followed by a hex digit.
    #[error("Expected a hex digit after '\\u'.")]
    ExpectedHexDigit,

    /// `\u` escape missing its `;` terminator (or running past six
    /// digits).
    #[error("Expected ';' to terminate '\\u' escape.")]
    MissingTerminator,

    /// A UTF-16 surrogate code point.
    #[error("Invalid code point {0:#x}: surrogates are not allowed.")]
    Surrogate(u32),

    /// A code point above U+10FFFF.
    #[error("Invalid code point {0:#x}: larger than U+10FFFF.")]
    OutOfRange(u32),
}

/// Decodes escape sequences in `raw` (the literal contents, excluding the
/// enclosing quotes) into the final string.
pub fn render_escapes(raw: &str) -> Result<String, EscapeError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            None => return Err(EscapeError::Unterminated),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('u') => out.push(render_unicode_escape(&mut chars)?),
            Some(other) => return Err(EscapeError::Unknown(other)),
        }
    }

    Ok(out)
}

/// Decodes the digits of a `\uX…X;` escape, positioned just after the `u`.
fn render_unicode_escape(chars: &mut std::str::Chars<'_>) -> Result<char, EscapeError> {
    let mut value: u32 = 0;
    let mut digits = 0;

    loop {
        match chars.next() {
            None => return Err(EscapeError::MissingTerminator),
            Some(';') => {
                if digits == 0 {
                    return Err(EscapeError::ExpectedHexDigit);
                }
                break;
            }
            Some(c) => {
                let digit = c.to_digit(16).ok_or(if digits == 0 {
                    EscapeError::ExpectedHexDigit
                } else {
                    EscapeError::MissingTerminator
                })?;
                if digits == 6 {
                    // Six digits cover the whole code space; anything more
                    // means the terminator is missing.
                    return Err(EscapeError::MissingTerminator);
                }
                value = value * 16 + digit;
                digits += 1;
            }
        }
    }

    if (0xD800..=0xDFFF).contains(&value) {
        return Err(EscapeError::Surrogate(value));
    }
    if value > MAX_CODE_POINT {
        return Err(EscapeError::OutOfRange(value));
    }

    // from_u32 only fails on surrogates and out-of-range values, both
    // excluded above.
    char::from_u32(value).ok_or(EscapeError::OutOfRange(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(render_escapes("hello").unwrap(), "hello");
        assert_eq!(render_escapes("").unwrap(), "");
        assert_eq!(render_escapes("déjà vu").unwrap(), "déjà vu");
    }

    #[test]
    fn test_simple_escapes() {
        assert_eq!(render_escapes(r"a\nb").unwrap(), "a\nb");
        assert_eq!(render_escapes(r"a\rb").unwrap(), "a\rb");
        assert_eq!(render_escapes(r"a\tb").unwrap(), "a\tb");
        assert_eq!(render_escapes(r#"say \"hi\""#).unwrap(), "say \"hi\"");
        assert_eq!(render_escapes(r"c:\\dir").unwrap(), "c:\\dir");
    }

    #[test]
    fn test_unicode_escape_ascii() {
        assert_eq!(render_escapes(r"\u41;").unwrap(), "A");
        assert_eq!(render_escapes(r"\u0041;").unwrap(), "A");
    }

    #[test]
    fn test_unicode_escape_multibyte() {
        // Two-byte, three-byte, and four-byte UTF-8 encodings.
        assert_eq!(render_escapes(r"caf\u00e9;").unwrap(), "café");
        assert_eq!(render_escapes(r"\u20AC;").unwrap(), "€");
        assert_eq!(render_escapes(r"\u1F600;").unwrap(), "😀");
    }

    #[test]
    fn test_unicode_escape_case_insensitive() {
        assert_eq!(render_escapes(r"\u00E9;").unwrap(), render_escapes(r"\u00e9;").unwrap());
    }

    #[test]
    fn test_unicode_escape_max_digits() {
        assert_eq!(render_escapes(r"\u10FFFF;").unwrap(), "\u{10FFFF}");
    }

    #[test]
    fn test_unknown_escape() {
        assert_eq!(render_escapes(r"\q"), Err(EscapeError::Unknown('q')));
    }

    #[test]
    fn test_trailing_backslash() {
        assert_eq!(render_escapes("abc\\"), Err(EscapeError::Unterminated));
    }

    #[test]
    fn test_missing_terminator() {
        assert_eq!(render_escapes(r"\u41"), Err(EscapeError::MissingTerminator));
        assert_eq!(render_escapes(r"\u41x;"), Err(EscapeError::MissingTerminator));
        // A seventh digit means the semicolon never came.
        assert_eq!(
            render_escapes(r"\u0010FFFF;"),
            Err(EscapeError::MissingTerminator)
        );
    }

    #[test]
    fn test_non_hex_first_digit() {
        assert_eq!(render_escapes(r"\uz;"), Err(EscapeError::ExpectedHexDigit));
        assert_eq!(render_escapes(r"\u;"), Err(EscapeError::ExpectedHexDigit));
    }

    #[test]
    fn test_surrogates_rejected() {
        assert_eq!(render_escapes(r"\uD800;"), Err(EscapeError::Surrogate(0xD800)));
        assert_eq!(render_escapes(r"\uDFFF;"), Err(EscapeError::Surrogate(0xDFFF)));
        // Just outside the range is fine.
        assert!(render_escapes(r"\uD7FF;").is_ok());
        assert!(render_escapes(r"\uE000;").is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(
            render_escapes(r"\u110000;"),
            Err(EscapeError::OutOfRange(0x110000))
        );
    }

    #[test]
    fn test_escapes_mixed_with_text() {
        assert_eq!(
            render_escapes(r"line1\nline2\t\u2713; done").unwrap(),
            "line1\nline2\t✓ done"
        );
    }
}
