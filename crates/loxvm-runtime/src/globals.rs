//! Global variable storage.
//!
//! Globals are resolved to dense indices at compile time: the compiler asks
//! [`GlobalVariables::index`] for a slot and embeds the index in the
//! bytecode, which makes the emitted code independent of the order in which
//! declarations later execute. At runtime a slot holds `None` until its
//! declaration actually runs; reading or assigning an undeclared global is
//! a runtime error, while re-declaring one simply overwrites the slot.

use crate::error::{RuntimeError, RuntimeResult};
use crate::object::{Obj, ObjRef};
use crate::table::Table;
use crate::value::Value;

/// The paired name-to-index table and slot array.
pub struct GlobalVariables {
    /// Interned name -> slot index (stored as a number value).
    names: Table,
    /// Slot values; `None` until the declaration executes.
    values: Vec<Option<Value>>,
}

impl GlobalVariables {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            names: Table::new(),
            values: Vec::new(),
        }
    }

    /// Returns the slot index for `name`, allocating a fresh undefined slot
    /// on first sight. Called by the compiler.
    pub fn index(&mut self, objs: &[Obj], name: ObjRef) -> usize {
        if let Some(Value::Number(index)) = self.names.get(objs, name) {
            return index as usize;
        }

        let index = self.values.len();
        self.values.push(None);
        self.names.insert(objs, name, Value::Number(index as f64));
        index
    }

    /// Number of slots handed out so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no globals exist.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Executes a declaration: writes the slot unconditionally.
    /// Re-declaration is permitted.
    pub fn define(&mut self, index: usize, value: Value) {
        self.values[index] = Some(value);
    }

    /// Reads a slot, failing if the declaration has not executed.
    pub fn read(&self, objs: &[Obj], index: usize) -> RuntimeResult<Value> {
        self.values[index]
            .ok_or_else(|| RuntimeError::UndefinedVariable(self.name_for_index(objs, index)))
    }

    /// Assigns to a slot, failing if the declaration has not executed.
    /// Declaration-before-assignment is required.
    pub fn store(&mut self, objs: &[Obj], index: usize, value: Value) -> RuntimeResult<()> {
        if self.values[index].is_none() {
            return Err(RuntimeError::UndefinedVariable(
                self.name_for_index(objs, index),
            ));
        }
        self.values[index] = Some(value);
        Ok(())
    }

    /// Reverse lookup, for error messages only. Linear scan of the name
    /// table.
    pub fn name_for_index(&self, objs: &[Obj], index: usize) -> String {
        for (key, value) in self.names.iter() {
            if value == Value::Number(index as f64) {
                return objs[key.index()].as_str_obj().as_str().to_string();
            }
        }
        String::from("<unknown>")
    }
}

impl Default for GlobalVariables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;

    #[test]
    fn test_index_is_stable() {
        let mut heap = Heap::new();
        let mut globals = GlobalVariables::new();

        let a = heap.intern("a");
        let b = heap.intern("b");

        assert_eq!(globals.index(heap.objects(), a), 0);
        assert_eq!(globals.index(heap.objects(), b), 1);
        assert_eq!(globals.index(heap.objects(), a), 0);
        assert_eq!(globals.len(), 2);
    }

    #[test]
    fn test_read_before_define_fails() {
        let mut heap = Heap::new();
        let mut globals = GlobalVariables::new();

        let name = heap.intern("missing");
        let index = globals.index(heap.objects(), name);

        assert_eq!(
            globals.read(heap.objects(), index),
            Err(RuntimeError::UndefinedVariable("missing".into()))
        );
    }

    #[test]
    fn test_define_then_read() {
        let mut heap = Heap::new();
        let mut globals = GlobalVariables::new();

        let name = heap.intern("x");
        let index = globals.index(heap.objects(), name);
        globals.define(index, Value::Number(4.0));

        assert_eq!(globals.read(heap.objects(), index), Ok(Value::Number(4.0)));
    }

    #[test]
    fn test_redeclaration_is_permitted() {
        let mut heap = Heap::new();
        let mut globals = GlobalVariables::new();

        let name = heap.intern("x");
        let index = globals.index(heap.objects(), name);
        globals.define(index, Value::Number(1.0));
        globals.define(index, Value::Bool(true));

        assert_eq!(globals.read(heap.objects(), index), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_store_before_define_fails() {
        let mut heap = Heap::new();
        let mut globals = GlobalVariables::new();

        let name = heap.intern("y");
        let index = globals.index(heap.objects(), name);

        assert_eq!(
            globals.store(heap.objects(), index, Value::Nil),
            Err(RuntimeError::UndefinedVariable("y".into()))
        );
    }

    #[test]
    fn test_store_after_define() {
        let mut heap = Heap::new();
        let mut globals = GlobalVariables::new();

        let name = heap.intern("y");
        let index = globals.index(heap.objects(), name);
        globals.define(index, Value::Nil);

        assert!(globals.store(heap.objects(), index, Value::Number(8.0)).is_ok());
        assert_eq!(globals.read(heap.objects(), index), Ok(Value::Number(8.0)));
    }

    #[test]
    fn test_name_for_index() {
        let mut heap = Heap::new();
        let mut globals = GlobalVariables::new();

        let name = heap.intern("answer");
        let index = globals.index(heap.objects(), name);
        assert_eq!(globals.name_for_index(heap.objects(), index), "answer");
    }
}
