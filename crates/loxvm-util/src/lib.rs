//! loxvm-util - Foundation types shared across the loxvm pipeline.
//!
//! This crate provides the two primitives every other phase leans on:
//!
//! 1. DIAGNOSTICS
//!    - Severity levels and error locations
//!    - A `Handler` that collects diagnostics during compilation
//!    - The stable stderr rendering the CLI contract requires
//!
//! 2. HASHING
//!    - The FNV-1a 32-bit hash used by the string interner and the
//!      open-addressed hash table
//!
//! Both are deliberately dependency-light: the hash must be deterministic
//! and independent of allocation addresses, and diagnostics must render
//! byte-for-byte identical strings across builds.

pub mod diagnostic;
pub mod fnv;

pub use diagnostic::{Diagnostic, ErrorLocation, Handler, Level};
pub use fnv::{fnv1a, hash_string};
