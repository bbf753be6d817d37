//! Open-addressed hash table keyed by heap strings.
//!
//! The table backs both the string interner and the global-name-to-index
//! map. It uses linear probing with wraparound and tombstone marking, so a
//! delete never breaks the probe sequence of entries inserted after the
//! deleted key.
//!
//! Keys are [`ObjRef`]s to interned strings, which makes key comparison a
//! handle comparison. The one place where content comparison is required is
//! [`Table::find_string`], used by the interner *before* a candidate string
//! has been deduplicated; handle equality would be wrong there.
//!
//! Methods take the heap's object slice as a parameter instead of holding a
//! heap reference, so the heap can own a table without borrowing itself.
//! Slot indices returned by the internal probe are never held across a
//! resize.

use crate::object::{Obj, ObjRef};
use crate::value::Value;

/// Load factor numerator/denominator: expand past 3/4 full.
const LOAD_FACTOR_NUM: usize = 3;
const LOAD_FACTOR_DEN: usize = 4;

/// Smallest non-empty capacity.
const MIN_CAPACITY: usize = 8;

/// One slot of the backing buffer.
#[derive(Clone, Debug, PartialEq)]
enum Slot {
    /// Never occupied. Probing stops here.
    Empty,
    /// Previously occupied; probing continues past it, and insertion may
    /// reclaim it.
    Tombstone,
    /// A live entry.
    Live { key: ObjRef, value: Value },
}

/// What the probe found.
enum Found {
    /// Slot holding the key.
    Existing(usize),
    /// Best slot to insert into (a reclaimed tombstone or the terminating
    /// empty slot).
    Vacant(usize),
}

/// Open-addressed, linear-probing hash table.
///
/// `count` includes tombstones; expansion rehashes live entries only and
/// recomputes it.
pub struct Table {
    /// Live entries plus tombstones.
    count: usize,
    /// Backing buffer; allocated lazily on first insertion.
    slots: Vec<Slot>,
}

#[inline]
fn key_hash(objs: &[Obj], key: ObjRef) -> u32 {
    objs[key.index()].as_str_obj().hash
}

impl Table {
    /// Creates an empty table. No allocation happens until the first
    /// insertion.
    pub fn new() -> Self {
        Self {
            count: 0,
            slots: Vec::new(),
        }
    }

    /// Slot count of the backing buffer (zero before first insertion).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live entries plus tombstones.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of live entries.
    pub fn live_len(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Live { .. }))
            .count()
    }

    /// Core probe: walk forward from `hash mod capacity` until the key or
    /// an empty slot is found. Returns the key's slot, or the best vacant
    /// slot (the first tombstone seen, else the empty slot).
    ///
    /// The buffer must be non-empty.
    fn find_slot(&self, key: ObjRef, hash: u32) -> Found {
        debug_assert!(!self.slots.is_empty());

        let capacity = self.slots.len();
        let mut index = hash as usize % capacity;
        let mut tombstone: Option<usize> = None;

        loop {
            match &self.slots[index] {
                Slot::Empty => return Found::Vacant(tombstone.unwrap_or(index)),
                Slot::Tombstone => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Slot::Live { key: existing, .. } => {
                    if *existing == key {
                        return Found::Existing(index);
                    }
                }
            }
            index = (index + 1) % capacity;
        }
    }

    /// Inserts or overwrites `value` for `key`. Returns true when the key
    /// was not previously present.
    pub fn insert(&mut self, objs: &[Obj], key: ObjRef, value: Value) -> bool {
        if (self.count + 1) * LOAD_FACTOR_DEN > self.slots.len() * LOAD_FACTOR_NUM {
            self.expand(objs);
        }

        let hash = key_hash(objs, key);
        match self.find_slot(key, hash) {
            Found::Existing(index) => {
                self.slots[index] = Slot::Live { key, value };
                false
            }
            Found::Vacant(index) => {
                // Reclaiming a tombstone does not change `count`; it was
                // already counted when the dead entry went in.
                if self.slots[index] == Slot::Empty {
                    self.count += 1;
                }
                self.slots[index] = Slot::Live { key, value };
                true
            }
        }
    }

    /// Looks up the value stored for `key`.
    pub fn get(&self, objs: &[Obj], key: ObjRef) -> Option<Value> {
        if self.slots.is_empty() {
            return None;
        }

        match self.find_slot(key, key_hash(objs, key)) {
            Found::Existing(index) => match &self.slots[index] {
                Slot::Live { value, .. } => Some(*value),
                _ => None,
            },
            Found::Vacant(_) => None,
        }
    }

    /// Deletes `key`, leaving a tombstone. Returns whether a live entry was
    /// removed. `count` is unchanged.
    pub fn delete(&mut self, objs: &[Obj], key: ObjRef) -> bool {
        if self.slots.is_empty() {
            return false;
        }

        match self.find_slot(key, key_hash(objs, key)) {
            Found::Existing(index) => {
                self.slots[index] = Slot::Tombstone;
                true
            }
            Found::Vacant(_) => false,
        }
    }

    /// Content-comparing lookup used during interning: finds a key whose
    /// string has the given length, hash, and bytes. Handle equality is not
    /// valid here because the candidate has not been interned yet.
    pub fn find_string(&self, objs: &[Obj], text: &str, hash: u32) -> Option<ObjRef> {
        if self.slots.is_empty() {
            return None;
        }

        let capacity = self.slots.len();
        let mut index = hash as usize % capacity;

        loop {
            match &self.slots[index] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Live { key, .. } => {
                    let stored = objs[key.index()].as_str_obj();
                    if stored.len() == text.len()
                        && stored.hash == hash
                        && stored.as_str() == text
                    {
                        return Some(*key);
                    }
                }
            }
            index = (index + 1) % capacity;
        }
    }

    /// Iterates over live entries in buffer order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjRef, Value)> + '_ {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Live { key, value } => Some((*key, *value)),
            _ => None,
        })
    }

    /// Grows the buffer to `max(8, ceil(count * 1.6))` slots and rehashes
    /// live entries. Tombstones are dropped and `count` recomputed.
    fn expand(&mut self, objs: &[Obj]) {
        let new_capacity = MIN_CAPACITY.max((self.count * 8 + 4) / 5);
        let old = std::mem::replace(&mut self.slots, vec![Slot::Empty; new_capacity]);

        self.count = 0;
        for slot in old {
            if let Slot::Live { key, value } = slot {
                let hash = key_hash(objs, key);
                match self.find_slot(key, hash) {
                    Found::Vacant(index) => {
                        self.slots[index] = Slot::Live { key, value };
                        self.count += 1;
                    }
                    // Keys are unique in the old buffer.
                    Found::Existing(_) => unreachable!("duplicate key during rehash"),
                }
            }
        }
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::StrObj;
    use proptest::prelude::*;
    use std::collections::HashMap;

    /// Builds a slice of string objects and handles to them, one per text.
    fn strings(texts: &[&str]) -> (Vec<Obj>, Vec<ObjRef>) {
        let objs: Vec<Obj> = texts.iter().map(|t| Obj::Str(StrObj::new(t))).collect();
        let refs = (0..texts.len() as u32).map(ObjRef).collect();
        (objs, refs)
    }

    #[test]
    fn test_lazy_allocation() {
        let table = Table::new();
        assert_eq!(table.capacity(), 0);
        assert_eq!(table.count(), 0);
    }

    #[test]
    fn test_insert_and_get() {
        let (objs, keys) = strings(&["a", "b"]);
        let mut table = Table::new();

        assert!(table.insert(&objs, keys[0], Value::Number(1.0)));
        assert!(table.insert(&objs, keys[1], Value::Number(2.0)));
        assert_eq!(table.capacity(), 8);

        assert_eq!(table.get(&objs, keys[0]), Some(Value::Number(1.0)));
        assert_eq!(table.get(&objs, keys[1]), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_overwrite_returns_false() {
        let (objs, keys) = strings(&["a"]);
        let mut table = Table::new();

        assert!(table.insert(&objs, keys[0], Value::Number(1.0)));
        assert!(!table.insert(&objs, keys[0], Value::Number(9.0)));
        assert_eq!(table.get(&objs, keys[0]), Some(Value::Number(9.0)));
        assert_eq!(table.count(), 1);
    }

    #[test]
    fn test_get_missing() {
        let (objs, keys) = strings(&["a", "b"]);
        let mut table = Table::new();
        assert_eq!(table.get(&objs, keys[0]), None);
        table.insert(&objs, keys[0], Value::Nil);
        assert_eq!(table.get(&objs, keys[1]), None);
    }

    #[test]
    fn test_delete_leaves_tombstone() {
        let (objs, keys) = strings(&["a"]);
        let mut table = Table::new();

        table.insert(&objs, keys[0], Value::Number(1.0));
        assert!(table.delete(&objs, keys[0]));
        assert!(!table.delete(&objs, keys[0]));
        assert_eq!(table.get(&objs, keys[0]), None);
        // The tombstone still counts.
        assert_eq!(table.count(), 1);
        assert_eq!(table.live_len(), 0);
    }

    #[test]
    fn test_insert_reclaims_tombstone() {
        let (objs, keys) = strings(&["a"]);
        let mut table = Table::new();

        table.insert(&objs, keys[0], Value::Number(1.0));
        table.delete(&objs, keys[0]);

        // Equal-content key (the same handle after interning) finds the
        // tombstoned slot; count stays flat.
        assert!(table.insert(&objs, keys[0], Value::Number(2.0)));
        assert_eq!(table.count(), 1);
        assert_eq!(table.get(&objs, keys[0]), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_probe_sequence_survives_delete() {
        // Force collisions by filling a small table, then delete a key in
        // the middle of a probe chain and verify later keys still resolve.
        let texts: Vec<String> = (0..6).map(|i| format!("k{}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let (objs, keys) = strings(&refs);

        let mut table = Table::new();
        for (i, key) in keys.iter().enumerate() {
            table.insert(&objs, *key, Value::Number(i as f64));
        }
        table.delete(&objs, keys[2]);

        for (i, key) in keys.iter().enumerate() {
            let expected = if i == 2 { None } else { Some(Value::Number(i as f64)) };
            assert_eq!(table.get(&objs, *key), expected, "key {}", i);
        }
    }

    #[test]
    fn test_expansion_preserves_entries_and_drops_tombstones() {
        let texts: Vec<String> = (0..64).map(|i| format!("key_{}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let (objs, keys) = strings(&refs);

        let mut table = Table::new();
        // Insert half, delete some, then insert the rest to force
        // expansions with tombstones present.
        for i in 0..32 {
            table.insert(&objs, keys[i], Value::Number(i as f64));
        }
        for i in 0..8 {
            table.delete(&objs, keys[i]);
        }
        for i in 32..64 {
            table.insert(&objs, keys[i], Value::Number(i as f64));
        }

        for i in 0..64 {
            let expected = if i < 8 { None } else { Some(Value::Number(i as f64)) };
            assert_eq!(table.get(&objs, keys[i]), expected, "key {}", i);
        }

        // After the last expansion the tombstones are gone: count equals
        // the number of live entries.
        assert_eq!(table.live_len(), 56);
    }

    #[test]
    fn test_find_string_compares_content() {
        // Two distinct objects with identical contents: find_string must
        // match on bytes, not handles.
        let objs = vec![
            Obj::Str(StrObj::new("dup")),
            Obj::Str(StrObj::new("dup")),
        ];
        let mut table = Table::new();
        table.insert(&objs, ObjRef(0), Value::Nil);

        let hash = loxvm_util::hash_string("dup");
        assert_eq!(table.find_string(&objs, "dup", hash), Some(ObjRef(0)));
        assert_eq!(
            table.find_string(&objs, "nope", loxvm_util::hash_string("nope")),
            None
        );
    }

    #[test]
    fn test_find_string_on_empty_table() {
        let table = Table::new();
        assert_eq!(table.find_string(&[], "x", loxvm_util::hash_string("x")), None);
    }

    proptest! {
        /// Model test: the table agrees with a HashMap under arbitrary
        /// insert/delete interleavings.
        #[test]
        fn prop_matches_model(ops in proptest::collection::vec((0usize..24, any::<bool>(), -100f64..100.0), 1..200)) {
            let texts: Vec<String> = (0..24).map(|i| format!("name_{}", i)).collect();
            let objs: Vec<Obj> = texts.iter().map(|t| Obj::Str(StrObj::new(t))).collect();

            let mut table = Table::new();
            let mut model: HashMap<usize, f64> = HashMap::new();

            for (slot, is_insert, payload) in ops {
                let key = ObjRef(slot as u32);
                if is_insert {
                    table.insert(&objs, key, Value::Number(payload));
                    model.insert(slot, payload);
                } else {
                    table.delete(&objs, key);
                    model.remove(&slot);
                }
            }

            for i in 0..24 {
                let key = ObjRef(i as u32);
                let expected = model.get(&i).map(|n| Value::Number(*n));
                prop_assert_eq!(table.get(&objs, key), expected);
            }
            prop_assert_eq!(table.live_len(), model.len());
        }
    }
}
