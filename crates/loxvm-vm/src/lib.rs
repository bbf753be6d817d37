//! loxvm-vm - The stack-based virtual machine.
//!
//! [`Vm::interpret`] compiles a source string and executes the resulting
//! chunk in a direct-dispatch loop over `(chunk, instruction offset)`. The
//! VM owns the operand stack, the heap (and with it the interned-string
//! table), and the global store; all three persist across `interpret`
//! calls, which is what makes a REPL session accumulate state and keeps
//! string interning VM-wide.
//!
//! Runtime errors abort the current chunk: the stack is cleared, the
//! message is printed to stderr with the source line recovered from the
//! chunk's line map, and the error is returned to the caller. The VM stays
//! usable afterwards.

use std::io::{self, Write};

use thiserror::Error;
use tracing::{debug, trace};

use loxvm_bytecode::{Chunk, OpCode};
use loxvm_compiler::compile;
use loxvm_runtime::{
    GlobalVariables, Heap, RuntimeError, RuntimeResult, Stack, Value,
};
use loxvm_util::Handler;

/// How an `interpret` call failed; maps one-to-one onto process exit codes.
#[derive(Debug, Error)]
pub enum InterpretError {
    /// The source did not compile; diagnostics went to stderr.
    #[error("compile error")]
    Compile,

    /// Execution aborted; the message went to stderr.
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

/// Loop control for one dispatched instruction.
enum Flow {
    Continue,
    Halt,
}

/// The virtual machine.
pub struct Vm {
    stack: Stack,
    heap: Heap,
    globals: GlobalVariables,
    output: Box<dyn Write>,
}

impl Vm {
    /// A VM printing to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// A VM printing to the given sink; tests use this to capture `print`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self {
            stack: Stack::new(),
            heap: Heap::new(),
            globals: GlobalVariables::new(),
            output,
        }
    }

    /// The heap, exposed for intern-identity assertions in tests.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Compiles and runs one source unit.
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let handler = Handler::new();
        let chunk = compile(source, &mut self.heap, &mut self.globals, &handler);

        for diagnostic in handler.diagnostics() {
            eprintln!("{}", diagnostic);
        }
        let Some(chunk) = chunk else {
            return Err(InterpretError::Compile);
        };

        debug!(
            code_bytes = chunk.len(),
            constants = chunk.constants().len(),
            "chunk compiled"
        );
        self.run(&chunk)
    }

    /// The dispatch loop.
    fn run(&mut self, chunk: &Chunk) -> Result<(), InterpretError> {
        let mut ip = 0usize;
        loop {
            let at = ip;
            match self.step(chunk, &mut ip) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt) => return Ok(()),
                Err(err) => {
                    eprintln!("{}: error: Runtime Error: {}", chunk.line_for(at), err);
                    self.stack.clear();
                    return Err(InterpretError::Runtime(err));
                }
            }
        }
    }

    /// Executes the instruction at `*ip`, advancing it past the operand.
    fn step(&mut self, chunk: &Chunk, ip: &mut usize) -> RuntimeResult<Flow> {
        let at = *ip;
        let byte = chunk.code()[at];
        let op = OpCode::try_from(byte).map_err(|_| RuntimeError::UnknownOpcode(byte))?;
        *ip += 1;
        trace!(offset = at, ?op, depth = self.stack.len(), "dispatch");

        match op {
            OpCode::Return => return Ok(Flow::Halt),

            OpCode::Print => {
                let value = self.stack.pop();
                let _ = writeln!(self.output, "{}", value.display(self.heap.objects()));
            }

            OpCode::Constant => {
                let index = read_byte(chunk, ip);
                self.stack.push(chunk.constants()[index])?;
            }
            OpCode::ConstantLong => {
                let index = read_u24(chunk, ip);
                self.stack.push(chunk.constants()[index])?;
            }

            OpCode::DefineGlobal => {
                let index = read_byte(chunk, ip);
                self.define_global(index);
            }
            OpCode::DefineGlobalLong => {
                let index = read_u24(chunk, ip);
                self.define_global(index);
            }

            OpCode::ReadGlobal => {
                let index = read_byte(chunk, ip);
                let value = self.globals.read(self.heap.objects(), index)?;
                self.stack.push(value)?;
            }
            OpCode::ReadGlobalLong => {
                let index = read_u24(chunk, ip);
                let value = self.globals.read(self.heap.objects(), index)?;
                self.stack.push(value)?;
            }

            OpCode::SetGlobal => {
                let index = read_byte(chunk, ip);
                let value = self.stack.peek(0);
                self.globals.store(self.heap.objects(), index, value)?;
            }
            OpCode::SetGlobalLong => {
                let index = read_u24(chunk, ip);
                let value = self.stack.peek(0);
                self.globals.store(self.heap.objects(), index, value)?;
            }

            OpCode::ReadLocal => {
                let slot = read_byte(chunk, ip);
                let value = self.stack.get(slot);
                self.stack.push(value)?;
            }
            OpCode::SetLocal => {
                let slot = read_byte(chunk, ip);
                let value = self.stack.peek(0);
                self.stack.set(slot, value);
            }

            OpCode::JumpIfTrue => {
                let target = chunk.read_u24(*ip);
                if self.stack.peek(0).is_truthy() {
                    *ip = target;
                } else {
                    *ip += 3;
                }
            }
            OpCode::JumpIfFalse => {
                let target = chunk.read_u24(*ip);
                if self.stack.peek(0).is_falsey() {
                    *ip = target;
                } else {
                    *ip += 3;
                }
            }
            OpCode::Jump | OpCode::JumpLong => {
                *ip = chunk.read_u24(*ip);
            }

            OpCode::Nil => self.stack.push(Value::Nil)?,
            OpCode::True => self.stack.push(Value::Bool(true))?,
            OpCode::False => self.stack.push(Value::Bool(false))?,

            OpCode::Not => {
                let value = self.stack.pop();
                self.stack.push(Value::Bool(value.is_falsey()))?;
            }
            OpCode::Negate => match self.stack.pop() {
                Value::Number(n) => self.stack.push(Value::Number(-n))?,
                _ => return Err(RuntimeError::NegateNonNumber),
            },

            OpCode::Equal => {
                let right = self.stack.pop();
                let left = self.stack.pop();
                self.stack.push(Value::Bool(left == right))?;
            }
            OpCode::Less => {
                let (left, right) = self.pop_numbers()?;
                self.stack.push(Value::Bool(left < right))?;
            }
            OpCode::Greater => {
                let (left, right) = self.pop_numbers()?;
                self.stack.push(Value::Bool(left > right))?;
            }

            OpCode::Match => {
                let pattern = self.stack.pop();
                let scrutinee = self.stack.pop();
                if scrutinee == pattern {
                    self.stack.push(Value::Bool(true))?;
                } else {
                    // A miss keeps the scrutinee for the next arm.
                    self.stack.push(scrutinee)?;
                    self.stack.push(Value::Bool(false))?;
                }
            }

            OpCode::Add => {
                let right = self.stack.pop();
                let left = self.stack.pop();
                match (left, right) {
                    (Value::Number(x), Value::Number(y)) => {
                        self.stack.push(Value::Number(x + y))?;
                    }
                    // The only object kind is the string; further kinds
                    // would raise RuntimeError::StringOperands here.
                    (Value::Obj(x), Value::Obj(y)) => {
                        let joined = self.heap.concatenate(x, y);
                        self.stack.push(Value::Obj(joined))?;
                    }
                    _ => return Err(RuntimeError::NumberOperands),
                }
            }
            OpCode::Subtract => {
                let (left, right) = self.pop_numbers()?;
                self.stack.push(Value::Number(left - right))?;
            }
            OpCode::Multiply => {
                let (left, right) = self.pop_numbers()?;
                self.stack.push(Value::Number(left * right))?;
            }
            OpCode::Divide => {
                let (left, right) = self.pop_numbers()?;
                self.stack.push(Value::Number(left / right))?;
            }

            OpCode::Pop => {
                self.stack.pop();
            }
        }

        Ok(Flow::Continue)
    }

    fn define_global(&mut self, index: usize) {
        let value = self.stack.peek(0);
        self.globals.define(index, value);
        self.stack.pop();
    }

    fn pop_numbers(&mut self) -> RuntimeResult<(f64, f64)> {
        let right = self.stack.pop();
        let left = self.stack.pop();
        match (left, right) {
            (Value::Number(x), Value::Number(y)) => Ok((x, y)),
            _ => Err(RuntimeError::NumberOperands),
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a one-byte operand.
#[inline]
fn read_byte(chunk: &Chunk, ip: &mut usize) -> usize {
    let value = chunk.code()[*ip] as usize;
    *ip += 1;
    value
}

/// Reads a three-byte little-endian operand.
#[inline]
fn read_u24(chunk: &Chunk, ip: &mut usize) -> usize {
    let value = chunk.read_u24(*ip);
    *ip += 3;
    value
}
