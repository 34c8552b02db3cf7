use crate::runtime::object::HeapObject;
use crate::runtime::value::Value;
use crate::runtime::vm::Vm;

use super::helpers::{arg_number, arg_string};

pub(super) fn length(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let receiver = arg_string(vm, arg_count, 0, "Receiver must be a string.")?;
    Ok(Value::Number(vm.heap.string_bytes(receiver).len() as f64))
}

/// `s.split(sep)`. An empty separator splits into individual bytes; a
/// trailing separator yields a trailing empty string.
pub(super) fn split(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let separator = arg_string(vm, arg_count, 0, "Can only split using a string.")?;
    let receiver = arg_string(vm, arg_count, 1, "Receiver must be a string.")?;

    let separator = vm.heap.string_bytes(separator).to_vec();
    let bytes = vm.heap.string_bytes(receiver).to_vec();

    // Each freshly interned part must stay reachable while the next one
    // allocates, hence the temp roots.
    let mut parts: Vec<Value> = Vec::new();
    let mut push_part = |vm: &mut Vm, parts: &mut Vec<Value>, slice: &[u8]| {
        let handle = vm.intern(slice);
        vm.heap.push_temp_root(Value::Obj(handle));
        parts.push(Value::Obj(handle));
    };

    if separator.is_empty() {
        for index in 0..bytes.len() {
            push_part(vm, &mut parts, &bytes[index..index + 1]);
        }
    } else {
        let mut start = 0;
        let mut index = 0;
        while index + separator.len() <= bytes.len() {
            if bytes[index..index + separator.len()] == separator[..] {
                push_part(vm, &mut parts, &bytes[start..index]);
                index += separator.len();
                start = index;
            } else {
                index += 1;
            }
        }
        push_part(vm, &mut parts, &bytes[start..]);
    }

    let rooted = parts.len();
    let list = vm.gc_alloc(HeapObject::List(parts));
    for _ in 0..rooted {
        vm.heap.pop_temp_root();
    }
    Ok(Value::Obj(list))
}

/// `s.charAt(i)`, byte-indexed; negative indices count from the end.
pub(super) fn char_at(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let index = arg_number(vm, arg_count, 0, "Index must be a number.")?;
    let receiver = arg_string(vm, arg_count, 1, "Receiver must be a string.")?;

    let length = vm.heap.string_bytes(receiver).len() as isize;
    let mut at = index as isize;
    if at < 0 {
        at += length;
    }
    if at < 0 || at >= length {
        return Err("Index out of bounds.".to_string());
    }

    let byte = vm.heap.string_bytes(receiver)[at as usize];
    let handle = vm.intern(&[byte]);
    Ok(Value::Obj(handle))
}

/// `s.slice(start)` / `s.slice(start, end)`. Negative positions count from
/// the end; everything clamps into range, so out-of-range slices are empty
/// rather than errors.
pub(super) fn slice(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    if arg_count > 3 {
        return Err(format!("Expected 1 or 2 arguments but got {}", arg_count - 1));
    }
    let receiver = arg_string(vm, arg_count, arg_count - 1, "Receiver must be a string.")?;
    let length = vm.heap.string_bytes(receiver).len() as isize;

    let clamp = |position: f64| -> usize {
        let mut at = position as isize;
        if at < 0 {
            at += length;
        }
        at.clamp(0, length) as usize
    };

    let start = clamp(arg_number(vm, arg_count, 0, "Slice bounds must be numbers.")?);
    let end = if arg_count == 3 {
        clamp(arg_number(vm, arg_count, 1, "Slice bounds must be numbers.")?)
    } else {
        length as usize
    };

    let bytes = if start >= end {
        Vec::new()
    } else {
        vm.heap.string_bytes(receiver)[start..end].to_vec()
    };
    let handle = vm.intern(&bytes);
    Ok(Value::Obj(handle))
}
