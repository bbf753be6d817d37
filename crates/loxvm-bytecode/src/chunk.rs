//! The bytecode container.
//!
//! A chunk holds the code bytes, the constants pool, and a run-length
//! encoded mapping from byte offsets back to source lines. It is
//! append-only during compilation and read-only during execution.
//!
//! Invariants:
//! - the RLE counts sum to `code.len()`
//! - every byte is an opcode or part of the preceding opcode's operand
//!   (the compiler maintains this)
//! - the constants pool holds at most 2^24 entries

use thiserror::Error;

use loxvm_runtime::Value;

use crate::opcode::OpCode;

/// Largest representable operand index plus one (3-byte little-endian).
pub const MAX_CONSTANTS: usize = 1 << 24;

/// Errors raised while emitting bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChunkError {
    /// An operand index exceeded the 3-byte encoding.
    #[error("Constant storage limit exceeded.")]
    ConstantLimit,
}

/// One run of consecutive bytes sharing a source line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineRun {
    pub line: u32,
    pub count: u32,
}

/// Bytecode, constants, and line map for one compilation unit.
#[derive(Default)]
pub struct Chunk {
    code: Vec<u8>,
    constants: Vec<Value>,
    lines: Vec<LineRun>,
}

impl Chunk {
    /// Creates an empty chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// The code bytes.
    #[inline]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// The constants pool.
    #[inline]
    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// The run-length encoded line map.
    #[inline]
    pub fn lines(&self) -> &[LineRun] {
        &self.lines
    }

    /// Current code length; the offset the next write lands at.
    #[inline]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether any code has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Appends one byte attributed to `line`. Extends the last line run
    /// when the line matches, otherwise starts a new run.
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        match self.lines.last_mut() {
            Some(run) if run.line == line => run.count += 1,
            _ => self.lines.push(LineRun { line, count: 1 }),
        }
    }

    /// Appends an opcode byte.
    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write(op.into(), line);
    }

    /// Appends an opcode with a one- or three-byte operand, choosing the
    /// long variant when `index` does not fit a byte.
    ///
    /// Fails once `index` exceeds the 3-byte encoding.
    pub fn write_indexed(&mut self, op: OpCode, index: usize, line: u32) -> Result<(), ChunkError> {
        if index <= u8::MAX as usize {
            self.write_op(op, line);
            self.write(index as u8, line);
            return Ok(());
        }

        if index >= MAX_CONSTANTS {
            return Err(ChunkError::ConstantLimit);
        }

        let long = op.long_variant().unwrap_or(op);
        self.write_op(long, line);
        self.write_u24(index, line);
        Ok(())
    }

    /// Appends a 3-byte little-endian integer.
    pub fn write_u24(&mut self, value: usize, line: u32) {
        debug_assert!(value < MAX_CONSTANTS);
        self.write((value & 0xff) as u8, line);
        self.write(((value >> 8) & 0xff) as u8, line);
        self.write(((value >> 16) & 0xff) as u8, line);
    }

    /// Adds a constant and returns its index. String constants are
    /// deduplicated with a linear first-equal search: compile-time code
    /// relies on a string constant's index being unique per content.
    pub fn add_constant(&mut self, value: Value) -> usize {
        if matches!(value, Value::Obj(_)) {
            if let Some(index) = self.constants.iter().position(|c| *c == value) {
                return index;
            }
        }
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Overwrites three bytes at `at` with the little-endian encoding of
    /// `with`. Used to fill in forward jump targets.
    pub fn patch_u24(&mut self, at: usize, with: usize) {
        debug_assert!(at + 3 <= self.code.len());
        debug_assert!(with < MAX_CONSTANTS);
        self.code[at] = (with & 0xff) as u8;
        self.code[at + 1] = ((with >> 8) & 0xff) as u8;
        self.code[at + 2] = ((with >> 16) & 0xff) as u8;
    }

    /// Decodes the 3-byte little-endian integer at `at`.
    #[inline]
    pub fn read_u24(&self, at: usize) -> usize {
        self.code[at] as usize
            | (self.code[at + 1] as usize) << 8
            | (self.code[at + 2] as usize) << 16
    }

    /// Source line for the byte at `offset`: scans the runs, summing counts
    /// until the cumulative count exceeds the offset.
    pub fn line_for(&self, offset: usize) -> u32 {
        let mut covered = 0;
        for run in &self.lines {
            covered += run.count as usize;
            if offset < covered {
                return run.line;
            }
        }
        self.lines.last().map_or(0, |run| run.line)
    }
}
