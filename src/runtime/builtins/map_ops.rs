use crate::runtime::object::HeapObject;
use crate::runtime::value::Value;
use crate::runtime::vm::Vm;

use super::helpers::{arg_map, arg_string};

/// `m.keys()` returns the key strings, in table slot order.
pub(super) fn keys(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let receiver = arg_map(vm, arg_count, 0, "Receiver must be a map.")?;
    let keys: Vec<Value> = vm
        .heap
        .map(receiver)
        .iter()
        .map(|(key, _)| Value::Obj(key))
        .collect();
    let list = vm.gc_alloc(HeapObject::List(keys));
    Ok(Value::Obj(list))
}

pub(super) fn values(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let receiver = arg_map(vm, arg_count, 0, "Receiver must be a map.")?;
    let values: Vec<Value> = vm
        .heap
        .map(receiver)
        .iter()
        .map(|(_, value)| value)
        .collect();
    let list = vm.gc_alloc(HeapObject::List(values));
    Ok(Value::Obj(list))
}

pub(super) fn has(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let key = arg_string(vm, arg_count, 0, "Map key must be a string.")?;
    let receiver = arg_map(vm, arg_count, 1, "Receiver must be a map.")?;
    let hash = vm.heap.string_hash(key);
    Ok(Value::Bool(vm.heap.map(receiver).get(key, hash).is_some()))
}

pub(super) fn remove(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let key = arg_string(vm, arg_count, 0, "Map key must be a string.")?;
    let receiver = arg_map(vm, arg_count, 1, "Receiver must be a map.")?;
    let hash = vm.heap.string_hash(key);
    vm.heap.map_mut(receiver).delete(key, hash);
    Ok(Value::Obj(receiver))
}

pub(super) fn length(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let receiver = arg_map(vm, arg_count, 0, "Receiver must be a map.")?;
    Ok(Value::Number(vm.heap.map(receiver).len() as f64))
}
