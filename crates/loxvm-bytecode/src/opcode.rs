//! The opcode set.
//!
//! Each instruction is one opcode byte followed by zero or more operand
//! bytes. Multi-byte operands are little-endian. Opcode tags are stable
//! only within a build; bytecode is never persisted.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use static_assertions::assert_eq_size;

/// One-byte instruction tags.
///
/// The `*Long` variants take a 3-byte operand where the short form takes
/// one byte. Only the constant-pool-style opcodes have long variants; the
/// unconditional jump's operand is a 3-byte absolute address and is always
/// emitted in the long form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    /// Halt execution successfully.
    Return,
    /// Pop, render, write to stdout.
    Print,
    /// Push `constants[operand]`.
    Constant,
    ConstantLong,
    /// `globals.define(operand, peek)`, then pop.
    DefineGlobal,
    DefineGlobalLong,
    /// Push `globals[operand]`, or fail if undefined.
    ReadGlobal,
    ReadGlobalLong,
    /// `globals[operand] = peek`, or fail if undefined.
    SetGlobal,
    SetGlobalLong,
    /// Push `stack[operand]` (slot from the stack base).
    ReadLocal,
    /// `stack[operand] = peek`.
    SetLocal,
    /// If `peek` is truthy, `ip = operand`.
    JumpIfTrue,
    /// If `peek` is falsey, `ip = operand`.
    JumpIfFalse,
    /// Unconditional `ip = operand`. Loops are backward jumps.
    Jump,
    JumpLong,
    /// Push the literal.
    Nil,
    True,
    False,
    /// Replace top with its logical negation.
    Not,
    /// Replace top with its arithmetic negation.
    Negate,
    /// Pop two, push bool.
    Equal,
    Less,
    Greater,
    /// Like `Equal`, but on mismatch the left operand stays on the stack
    /// (drives `match` arms).
    Match,
    /// Pop two, push result.
    Add,
    Subtract,
    Multiply,
    Divide,
    /// Discard top.
    Pop,
}

assert_eq_size!(OpCode, u8);

impl OpCode {
    /// Number of operand bytes following the opcode byte.
    pub fn operand_width(self) -> usize {
        use OpCode::*;
        match self {
            Constant | DefineGlobal | ReadGlobal | SetGlobal | ReadLocal | SetLocal => 1,
            ConstantLong | DefineGlobalLong | ReadGlobalLong | SetGlobalLong | JumpIfTrue
            | JumpIfFalse | Jump | JumpLong => 3,
            Return | Print | Nil | True | False | Not | Negate | Equal | Less | Greater
            | Match | Add | Subtract | Multiply | Divide | Pop => 0,
        }
    }

    /// The 3-byte-operand counterpart of a short-operand opcode.
    pub fn long_variant(self) -> Option<OpCode> {
        match self {
            OpCode::Constant => Some(OpCode::ConstantLong),
            OpCode::DefineGlobal => Some(OpCode::DefineGlobalLong),
            OpCode::ReadGlobal => Some(OpCode::ReadGlobalLong),
            OpCode::SetGlobal => Some(OpCode::SetGlobalLong),
            OpCode::Jump => Some(OpCode::JumpLong),
            _ => None,
        }
    }
}
