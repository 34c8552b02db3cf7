use crate::runtime::gc::GcHandle;
use crate::runtime::value::Value;

/// Open-addressed, linear-probing hash table keyed by interned strings.
///
/// Keys are string handles; because interning guarantees one object per
/// distinct content, regular lookups compare handles only. Each entry keeps
/// the key's hash so the table never needs heap access to probe or resize.
/// Deleted entries become tombstones that probing walks past. Capacity is a
/// power of two; the table grows at 75% load (tombstones included, as in
/// the load count).
///
/// Shared by VM globals, module globals/exports, class method tables,
/// instance fields, maps, the intern set, and the module cache.
#[derive(Debug, Clone, Default)]
pub struct Table {
    // live entries + tombstones, for the load factor
    count: usize,
    entries: Vec<Entry>,
}

#[derive(Debug, Clone)]
enum Entry {
    Empty,
    Tombstone,
    Full { key: GcHandle, hash: u32, value: Value },
}

const MAX_LOAD_NUM: usize = 3;
const MAX_LOAD_DEN: usize = 4;
const INITIAL_CAPACITY: usize = 8;

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of live (non-tombstone) entries.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, Entry::Full { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: GcHandle, hash: u32) -> Option<Value> {
        if self.entries.is_empty() {
            return None;
        }
        match &self.entries[self.find_slot_hashed(key, hash)] {
            Entry::Full { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Inserts or updates. Returns `true` when `key` was not present.
    pub fn set(&mut self, key: GcHandle, hash: u32, value: Value) -> bool {
        if (self.count + 1) * MAX_LOAD_DEN > self.entries.len() * MAX_LOAD_NUM {
            self.grow();
        }

        let slot = self.find_slot_hashed(key, hash);
        let is_new = !matches!(self.entries[slot], Entry::Full { .. });
        if matches!(self.entries[slot], Entry::Empty) {
            // Tombstone reuse does not raise the load count.
            self.count += 1;
        }
        self.entries[slot] = Entry::Full { key, hash, value };
        is_new
    }

    /// Removes `key`, leaving a tombstone. Returns whether it was present.
    pub fn delete(&mut self, key: GcHandle, hash: u32) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let slot = self.find_slot_hashed(key, hash);
        match self.entries[slot] {
            Entry::Full { .. } => {
                self.entries[slot] = Entry::Tombstone;
                true
            }
            _ => false,
        }
    }

    /// Copies every live entry of `other` into `self`.
    pub fn add_all(&mut self, other: &Table) {
        for entry in &other.entries {
            if let Entry::Full { key, hash, value } = entry {
                self.set(*key, *hash, *value);
            }
        }
    }

    /// Iterates live `(key, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (GcHandle, Value)> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Full { key, value, .. } => Some((*key, *value)),
            _ => None,
        })
    }

    /// Intern-table probe: walks the cluster for `hash`, calling `matches`
    /// on each candidate key until one compares content-equal.
    pub fn find_string_with(
        &self,
        hash: u32,
        mut matches: impl FnMut(GcHandle) -> bool,
    ) -> Option<GcHandle> {
        if self.entries.is_empty() {
            return None;
        }
        let mask = self.entries.len() - 1;
        let mut index = hash as usize & mask;
        loop {
            match &self.entries[index] {
                Entry::Empty => return None,
                Entry::Tombstone => {}
                Entry::Full {
                    key,
                    hash: entry_hash,
                    ..
                } => {
                    if *entry_hash == hash && matches(*key) {
                        return Some(*key);
                    }
                }
            }
            index = (index + 1) & mask;
        }
    }

    /// Turns entries whose key is no longer live into tombstones. Called
    /// after a sweep so the intern set drops freed strings.
    pub fn remove_dead_keys(&mut self, is_live: impl Fn(GcHandle) -> bool) {
        for entry in &mut self.entries {
            if let Entry::Full { key, .. } = entry {
                if !is_live(*key) {
                    *entry = Entry::Tombstone;
                }
            }
        }
    }

    /// Probe for `key` starting at its hash cluster. Returns the key's slot
    /// when present, else the first reusable slot on its chain. Only valid
    /// on a non-empty table.
    fn find_slot_hashed(&self, key: GcHandle, hash: u32) -> usize {
        let mask = self.entries.len() - 1;
        let mut index = hash as usize & mask;
        let mut tombstone: Option<usize> = None;
        loop {
            match &self.entries[index] {
                Entry::Empty => return tombstone.unwrap_or(index),
                Entry::Tombstone => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Entry::Full { key: entry_key, .. } => {
                    if *entry_key == key {
                        return index;
                    }
                }
            }
            index = (index + 1) & mask;
        }
    }

    fn grow(&mut self) {
        let new_capacity = if self.entries.is_empty() {
            INITIAL_CAPACITY
        } else {
            self.entries.len() * 2
        };
        let old = std::mem::replace(&mut self.entries, vec![Entry::Empty; new_capacity]);
        self.count = 0;
        for entry in old {
            if let Entry::Full { key, hash, value } = entry {
                let slot = self.find_slot_hashed(key, hash);
                self.entries[slot] = Entry::Full { key, hash, value };
                self.count += 1;
            }
        }
    }
}

/// FNV-1a over raw bytes; the hash every interned string carries.
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &byte in bytes {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}
