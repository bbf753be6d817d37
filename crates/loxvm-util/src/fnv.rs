//! FNV-1a hashing.
//!
//! The interner and the open-addressed table both key strings by a 32-bit
//! FNV-1a hash. The hash is a pure function of the bytes, which keeps it
//! stable across runs and independent of where the string happens to be
//! allocated.

/// FNV-1a 32-bit offset basis.
const OFFSET_BASIS: u32 = 2_166_136_261;

/// FNV-1a 32-bit prime.
const PRIME: u32 = 16_777_619;

/// Hashes a byte slice with 32-bit FNV-1a.
///
/// # Example
///
/// ```
/// use loxvm_util::fnv::fnv1a;
///
/// assert_eq!(fnv1a(b""), 0x811c9dc5);
/// assert_eq!(fnv1a(b"foobar"), 0xbf9cf968);
/// ```
#[inline]
pub fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash = OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Hashes the contents of a heap string.
///
/// String storage is NUL-terminated, and the terminator participates in the
/// hash, so this folds one extra zero byte after the contents.
///
/// # Example
///
/// ```
/// use loxvm_util::fnv::{fnv1a, hash_string};
///
/// assert_eq!(hash_string("lox"), fnv1a(b"lox\0"));
/// ```
#[inline]
pub fn hash_string(text: &str) -> u32 {
    // One extra round for the NUL terminator; XOR with zero is the identity,
    // leaving only the multiply.
    fnv1a(text.as_bytes()).wrapping_mul(PRIME)
}
