//! loxvm-bytecode - The chunk format and opcode set.
//!
//! A [`Chunk`] is the unit of compiled code: a byte stream, a constants
//! pool, and a run-length encoded line map. The compiler appends to it;
//! the VM reads it. Three-byte operands are little-endian, jump operands
//! are absolute offsets into the same chunk, and the constants pool is
//! addressable up to 2^24 entries through the long opcode variants.

pub mod chunk;
pub mod debug;
pub mod opcode;

pub use chunk::{Chunk, ChunkError, LineRun, MAX_CONSTANTS};
pub use opcode::OpCode;
