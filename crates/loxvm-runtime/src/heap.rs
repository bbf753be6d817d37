//! The object heap.
//!
//! The heap owns every runtime object. Objects live in a push-only arena
//! whose iteration order is allocation order; nothing is freed until the
//! heap itself drops, at which point everything goes at once. This replaces
//! the classic intrusive free-list walk with the ownership the language
//! already gives us.
//!
//! The heap also owns the `strings` intern table. The interning contract:
//! after [`Heap::intern`], two string objects with identical contents share
//! one [`ObjRef`], so equality tests elsewhere are handle comparisons.

use loxvm_util::hash_string;

use crate::object::{Obj, ObjRef, StrObj};
use crate::table::Table;
use crate::value::Value;

/// Owns all heap objects and the intern table.
pub struct Heap {
    /// Arena of every allocated object, in allocation order.
    objects: Vec<Obj>,
    /// The unique set of heap strings, keyed by themselves with `nil`
    /// values. Keys are owned by the arena, not the table.
    strings: Table,
}

impl Heap {
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            strings: Table::new(),
        }
    }

    /// Interns a string: returns the existing object for equal contents, or
    /// allocates and registers a new one.
    pub fn intern(&mut self, text: &str) -> ObjRef {
        let hash = hash_string(text);
        if let Some(existing) = self.strings.find_string(&self.objects, text, hash) {
            return existing;
        }

        let reference = ObjRef(self.objects.len() as u32);
        self.objects.push(Obj::Str(StrObj::new(text)));
        self.strings.insert(&self.objects, reference, Value::Nil);
        reference
    }

    /// Concatenates two heap strings and interns the result.
    pub fn concatenate(&mut self, left: ObjRef, right: ObjRef) -> ObjRef {
        let mut text = String::with_capacity(
            self.string(left).len() + self.string(right).len(),
        );
        text.push_str(self.string(left).as_str());
        text.push_str(self.string(right).as_str());
        self.intern(&text)
    }

    /// Resolves a reference to its string object.
    #[inline]
    pub fn string(&self, reference: ObjRef) -> &StrObj {
        self.objects[reference.index()].as_str_obj()
    }

    /// The arena contents, for table operations and value rendering.
    #[inline]
    pub fn objects(&self) -> &[Obj] {
        &self.objects
    }

    /// Number of allocated objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the heap has no objects.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_deduplicates() {
        let mut heap = Heap::new();
        let a = heap.intern("hello");
        let b = heap.intern("hello");
        assert_eq!(a, b);
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn test_intern_distinct_contents() {
        let mut heap = Heap::new();
        let a = heap.intern("a");
        let b = heap.intern("b");
        assert_ne!(a, b);
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn test_intern_survives_many_allocations() {
        let mut heap = Heap::new();
        let first = heap.intern("target");
        for i in 0..100 {
            heap.intern(&format!("filler_{}", i));
        }
        assert_eq!(heap.intern("target"), first);
    }

    #[test]
    fn test_allocation_order_is_iteration_order() {
        let mut heap = Heap::new();
        heap.intern("one");
        heap.intern("two");
        heap.intern("three");

        let contents: Vec<&str> = heap
            .objects()
            .iter()
            .map(|o| o.as_str_obj().as_str())
            .collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_concatenate_interns_result() {
        let mut heap = Heap::new();
        let a = heap.intern("foo");
        let b = heap.intern("bar");

        let joined = heap.concatenate(a, b);
        assert_eq!(heap.string(joined).as_str(), "foobar");

        // Concatenating again reuses the interned result.
        assert_eq!(heap.concatenate(a, b), joined);
        // A literal with the same contents also unifies.
        assert_eq!(heap.intern("foobar"), joined);
    }

    #[test]
    fn test_empty_string() {
        let mut heap = Heap::new();
        let empty = heap.intern("");
        assert_eq!(heap.string(empty).len(), 0);
        assert_eq!(heap.intern(""), empty);
    }

    #[test]
    fn test_unicode_contents() {
        let mut heap = Heap::new();
        let s = heap.intern("café");
        assert_eq!(heap.string(s).as_str(), "café");
        assert_eq!(heap.intern("café"), s);
    }
}
