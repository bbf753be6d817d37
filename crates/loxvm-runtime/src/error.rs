//! Runtime error types.
//!
//! Display strings are part of the external contract; tests and the CLI
//! depend on them verbatim.

use thiserror::Error;

/// Errors that abort execution of a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Read or write of a global whose declaration has not executed.
    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),

    /// Arithmetic or comparison on non-numeric operands.
    #[error("Operands must both be numbers.")]
    NumberOperands,

    /// `+` applied to a string and a non-string object.
    #[error("Operands must both be strings")]
    StringOperands,

    /// Unary `-` applied to a non-number.
    #[error("Operand to '-' must be a number.")]
    NegateNonNumber,

    /// The operand stack ran out of slots.
    #[error("Stack overflow.")]
    StackOverflow,

    /// The instruction stream decoded to a byte that is not an opcode.
    #[error("Unknown opcode {0:#04x}.")]
    UnknownOpcode(u8),
}

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_messages() {
        assert_eq!(
            RuntimeError::UndefinedVariable("x".into()).to_string(),
            "Undefined variable 'x'"
        );
        assert_eq!(
            RuntimeError::NumberOperands.to_string(),
            "Operands must both be numbers."
        );
        assert_eq!(
            RuntimeError::StringOperands.to_string(),
            "Operands must both be strings"
        );
        assert_eq!(
            RuntimeError::NegateNonNumber.to_string(),
            "Operand to '-' must be a number."
        );
    }
}
