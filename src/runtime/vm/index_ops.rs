use crate::runtime::gc::GcHandle;
use crate::runtime::object::HeapObject;
use crate::runtime::value::Value;

use super::Vm;

enum IndexTarget {
    List(GcHandle),
    Map(GcHandle),
    Other,
}

impl Vm {
    /// `target[index]`: lists take range-checked numeric indices; maps take
    /// string keys and yield `nil` for missing ones.
    pub(super) fn index_get(&mut self) -> Result<(), String> {
        let index = self.pop();
        let target = self.pop();

        match self.index_target(target) {
            IndexTarget::List(list) => {
                let slot = self.list_index(list, index)?;
                let value = self.heap.list(list)[slot];
                self.push(value)
            }
            IndexTarget::Map(map) => {
                let key = self
                    .heap
                    .as_string(index)
                    .ok_or_else(|| "Map key must be a string.".to_string())?;
                let hash = self.heap.string_hash(key);
                let value = self.heap.map(map).get(key, hash).unwrap_or(Value::Nil);
                self.push(value)
            }
            IndexTarget::Other => Err("Can only index into lists and maps.".to_string()),
        }
    }

    /// `target[index] = value`: stores and leaves the value as the
    /// expression result.
    pub(super) fn index_store(&mut self) -> Result<(), String> {
        let item = self.pop();
        let index = self.pop();
        let target = self.pop();

        match self.index_target(target) {
            IndexTarget::List(list) => {
                let slot = self.list_index(list, index)?;
                self.heap.list_mut(list)[slot] = item;
                self.push(item)
            }
            IndexTarget::Map(map) => {
                let key = self
                    .heap
                    .as_string(index)
                    .ok_or_else(|| "Map key must be a string.".to_string())?;
                let hash = self.heap.string_hash(key);
                self.heap.map_mut(map).set(key, hash, item);
                self.push(item)
            }
            IndexTarget::Other => Err("Can only index into lists and maps.".to_string()),
        }
    }

    fn index_target(&self, target: Value) -> IndexTarget {
        match target {
            Value::Obj(handle) => match self.heap.get(handle) {
                HeapObject::List(_) => IndexTarget::List(handle),
                HeapObject::Map(_) => IndexTarget::Map(handle),
                _ => IndexTarget::Other,
            },
            _ => IndexTarget::Other,
        }
    }

    fn list_index(&self, list: GcHandle, index: Value) -> Result<usize, String> {
        let number = index
            .as_number()
            .ok_or_else(|| "List index must be a number.".to_string())?;
        let length = self.heap.list(list).len();
        // Fractional indices truncate toward zero.
        let slot = number as isize;
        if slot < 0 || slot as usize >= length {
            return Err("Index out of range.".to_string());
        }
        Ok(slot as usize)
    }
}
