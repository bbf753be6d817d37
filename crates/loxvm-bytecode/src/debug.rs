//! Chunk disassembler.
//!
//! Debug aid only: renders a chunk to a string for `--dump-bytecode` and
//! for tests asserting emitted code shapes. Nothing in the execution path
//! depends on it.

use std::fmt::Write as _;

use loxvm_runtime::{Heap, Value};

use crate::chunk::Chunk;
use crate::opcode::OpCode;

/// Renders a full chunk listing under a header.
pub fn disassemble(chunk: &Chunk, heap: &Heap, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", name);

    let mut offset = 0;
    let mut previous_line = None;
    while offset < chunk.len() {
        let line = chunk.line_for(offset);
        let line_column = if previous_line == Some(line) {
            "   |".to_string()
        } else {
            format!("{:4}", line)
        };
        previous_line = Some(line);

        let (text, next) = disassemble_instruction(chunk, heap, offset);
        let _ = writeln!(out, "{:04} {} {}", offset, line_column, text);
        offset = next;
    }
    out
}

/// Renders one instruction; returns the text and the next offset.
pub fn disassemble_instruction(chunk: &Chunk, heap: &Heap, offset: usize) -> (String, usize) {
    let byte = chunk.code()[offset];
    let Ok(op) = OpCode::try_from(byte) else {
        return (format!("(bad opcode {:#04x})", byte), offset + 1);
    };

    let operand_at = offset + 1;
    let next = operand_at + op.operand_width();

    let text = match op.operand_width() {
        0 => format!("{:?}", op),
        1 => {
            let index = chunk.code()[operand_at] as usize;
            format!("{:?} {}{}", op, index, operand_note(chunk, heap, op, index))
        }
        _ => {
            let index = chunk.read_u24(operand_at);
            format!("{:?} {}{}", op, index, operand_note(chunk, heap, op, index))
        }
    };
    (text, next)
}

/// Resolves constant operands to their value for the listing.
fn operand_note(chunk: &Chunk, heap: &Heap, op: OpCode, index: usize) -> String {
    match op {
        OpCode::Constant | OpCode::ConstantLong => match chunk.constants().get(index) {
            Some(value) => format!(" '{}'", render(heap, *value)),
            None => " <out of range>".to_string(),
        },
        _ => String::new(),
    }
}

fn render(heap: &Heap, value: Value) -> String {
    value.display(heap.objects()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disassembles_simple_chunk() {
        let heap = Heap::new();
        let mut chunk = Chunk::new();

        let index = chunk.add_constant(Value::Number(7.0));
        chunk.write_indexed(OpCode::Constant, index, 1).unwrap();
        chunk.write_op(OpCode::Print, 1);
        chunk.write_op(OpCode::Return, 2);

        let listing = disassemble(&chunk, &heap, "test");
        assert!(listing.starts_with("== test =="));
        assert!(listing.contains("Constant 0 '7'"));
        assert!(listing.contains("Print"));
        assert!(listing.contains("Return"));

        // Second instruction on the same line collapses to a pipe.
        assert!(listing.contains("   |"));
    }

    #[test]
    fn test_disassembles_string_constant() {
        let mut heap = Heap::new();
        let mut chunk = Chunk::new();

        let s = heap.intern("hi");
        let index = chunk.add_constant(Value::Obj(s));
        chunk.write_indexed(OpCode::Constant, index, 1).unwrap();

        let listing = disassemble(&chunk, &heap, "strings");
        assert!(listing.contains("'hi'"));
    }

    #[test]
    fn test_bad_opcode_does_not_panic() {
        let heap = Heap::new();
        let mut chunk = Chunk::new();
        chunk.write(0xfe, 1);

        let listing = disassemble(&chunk, &heap, "bad");
        assert!(listing.contains("bad opcode"));
    }
}
