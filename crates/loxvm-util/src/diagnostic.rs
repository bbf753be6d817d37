//! Diagnostic module - error reporting infrastructure.
//!
//! The compiler reports into a [`Handler`], which collects diagnostics
//! during a compilation pass; the driver drains them to stderr afterwards.
//! Rendering is part of the external contract: every diagnostic prints as
//!
//! ```text
//! <line>: error:<location> <message>
//! ```
//!
//! where `<location>` is `" at end"`, the empty string (the token itself
//! was an error token), or `" at '<lexeme>'"`.
//!
//! # Examples
//!
//! ```
//! use loxvm_util::diagnostic::{Diagnostic, ErrorLocation, Handler};
//!
//! let handler = Handler::new();
//! handler.error(1, ErrorLocation::AtEnd, "Expected expression.");
//!
//! assert!(handler.has_errors());
//! assert_eq!(
//!     handler.diagnostics()[0].to_string(),
//!     "1: error: at end Expected expression."
//! );
//! ```

use std::cell::RefCell;
use std::fmt;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// An error that prevents the chunk from being produced.
    Error,
    /// A warning that does not prevent compilation.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// Where in the token stream a diagnostic points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorLocation {
    /// The offending token was the end of input.
    AtEnd,
    /// The offending token was itself an error token; the message already
    /// describes it.
    None,
    /// The offending token's lexeme.
    At(String),
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorLocation::AtEnd => write!(f, " at end"),
            ErrorLocation::None => Ok(()),
            ErrorLocation::At(lexeme) => write!(f, " at '{}'", lexeme),
        }
    }
}

/// A diagnostic message with severity, line, and location.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    /// Diagnostic severity level.
    pub level: Level,
    /// Source line the diagnostic points at (1-based).
    pub line: u32,
    /// Token-stream location rendered after `error`.
    pub location: ErrorLocation,
    /// Main diagnostic message.
    pub message: String,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(
        level: Level,
        line: u32,
        location: ErrorLocation,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            line,
            location,
            message: message.into(),
        }
    }

    /// Create an error diagnostic.
    pub fn error(line: u32, location: ErrorLocation, message: impl Into<String>) -> Self {
        Self::new(Level::Error, line, location, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}:{} {}",
            self.line, self.level, self.location, self.message
        )
    }
}

/// Handler for collecting and querying diagnostics.
///
/// Interior mutability lets deeply nested parser code report errors without
/// threading `&mut` through every call.
///
/// # Examples
///
/// ```
/// use loxvm_util::diagnostic::{ErrorLocation, Handler};
///
/// let handler = Handler::new();
/// handler.error(3, ErrorLocation::At("}".into()), "Expected expression.");
///
/// assert_eq!(handler.error_count(), 1);
/// ```
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    /// Create a new, empty handler.
    pub fn new() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    /// Report an error.
    pub fn error(&self, line: u32, location: ErrorLocation, message: impl Into<String>) {
        self.emit(Diagnostic::error(line, location, message));
    }

    /// Emit a pre-built diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Check whether any errors have been reported.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    /// Number of reported errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// Snapshot of all collected diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Clear all diagnostics.
    pub fn clear(&self) {
        self.diagnostics.borrow_mut().clear();
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_display() {
        assert_eq!(format!("{}", Level::Error), "error");
        assert_eq!(format!("{}", Level::Warning), "warning");
    }

    #[test]
    fn test_location_display() {
        assert_eq!(ErrorLocation::AtEnd.to_string(), " at end");
        assert_eq!(ErrorLocation::None.to_string(), "");
        assert_eq!(ErrorLocation::At("var".into()).to_string(), " at 'var'");
    }

    #[test]
    fn test_diagnostic_rendering() {
        let diag = Diagnostic::error(2, ErrorLocation::At("=".into()), "Invalid assignment target");
        assert_eq!(diag.to_string(), "2: error: at '=' Invalid assignment target");
    }

    #[test]
    fn test_runtime_error_shape() {
        // Runtime errors reuse the empty location; the message carries the
        // "Runtime Error: " prefix.
        let diag = Diagnostic::error(
            1,
            ErrorLocation::None,
            "Runtime Error: Undefined variable 'x'",
        );
        assert_eq!(
            diag.to_string(),
            "1: error: Runtime Error: Undefined variable 'x'"
        );
    }

    #[test]
    fn test_handler_collects() {
        let handler = Handler::new();
        assert!(!handler.has_errors());

        handler.error(1, ErrorLocation::AtEnd, "Expected expression.");
        handler.error(2, ErrorLocation::None, "Unterminated string");

        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 2);
        assert_eq!(handler.diagnostics().len(), 2);
    }

    #[test]
    fn test_handler_clear() {
        let handler = Handler::new();
        handler.error(1, ErrorLocation::None, "boom");
        handler.clear();
        assert!(!handler.has_errors());
        assert_eq!(handler.error_count(), 0);
    }
}
