use crate::runtime::object::HeapObject;
use crate::runtime::value::Value;
use crate::runtime::vm::Vm;

use super::helpers::{arg_list, arg_number};

pub(super) fn add(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let item = vm.native_arg(arg_count, 0);
    let receiver = arg_list(vm, arg_count, 1, "Receiver must be a list.")?;
    vm.heap.list_mut(receiver).push(item);
    Ok(Value::Obj(receiver))
}

pub(super) fn remove(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let index = arg_number(vm, arg_count, 0, "Index must be a number.")?;
    let receiver = arg_list(vm, arg_count, 1, "Receiver must be a list.")?;

    let length = vm.heap.list(receiver).len();
    // Fractional indices truncate toward zero.
    let at = index as isize;
    if at < 0 || at as usize >= length {
        return Err("Index out of bounds.".to_string());
    }
    vm.heap.list_mut(receiver).remove(at as usize);
    Ok(Value::Obj(receiver))
}

pub(super) fn length(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let receiver = arg_list(vm, arg_count, 0, "Receiver must be a list.")?;
    Ok(Value::Number(vm.heap.list(receiver).len() as f64))
}

/// `list.map(f)` builds a new list; each mapped value is temp-rooted so a
/// collection during the next callback cannot free it.
pub(super) fn map(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let callback = vm.native_arg(arg_count, 0);
    let receiver = arg_list(vm, arg_count, 1, "Receiver must be a list.")?;

    let length = vm.heap.list(receiver).len();
    let mut results: Vec<Value> = Vec::with_capacity(length);
    for index in 0..length {
        let item = match vm.heap.list(receiver).get(index) {
            Some(&item) => item,
            None => break,
        };
        match vm.call_function(callback, &[item]) {
            Ok(mapped) => {
                vm.heap.push_temp_root(mapped);
                results.push(mapped);
            }
            Err(error) => {
                for _ in 0..results.len() {
                    vm.heap.pop_temp_root();
                }
                return Err(error);
            }
        }
    }

    let rooted = results.len();
    let list = vm.gc_alloc(HeapObject::List(results));
    for _ in 0..rooted {
        vm.heap.pop_temp_root();
    }
    Ok(Value::Obj(list))
}

/// `list.filter(f)` keeps items whose callback result is truthy. The kept
/// items stay reachable through the receiver, so no rooting is needed.
pub(super) fn filter(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let callback = vm.native_arg(arg_count, 0);
    let receiver = arg_list(vm, arg_count, 1, "Receiver must be a list.")?;

    let length = vm.heap.list(receiver).len();
    let mut kept: Vec<Value> = Vec::new();
    for index in 0..length {
        let item = match vm.heap.list(receiver).get(index) {
            Some(&item) => item,
            None => break,
        };
        let verdict = vm.call_function(callback, &[item])?;
        if !verdict.is_falsey() {
            kept.push(item);
        }
    }

    let list = vm.gc_alloc(HeapObject::List(kept));
    Ok(Value::Obj(list))
}

/// `list.find(f)` returns the first item whose callback result is truthy,
/// or nil.
pub(super) fn find(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let callback = vm.native_arg(arg_count, 0);
    let receiver = arg_list(vm, arg_count, 1, "Receiver must be a list.")?;

    let length = vm.heap.list(receiver).len();
    for index in 0..length {
        let item = match vm.heap.list(receiver).get(index) {
            Some(&item) => item,
            None => break,
        };
        let verdict = vm.call_function(callback, &[item])?;
        if !verdict.is_falsey() {
            return Ok(item);
        }
    }
    Ok(Value::Nil)
}

pub(super) fn contains(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let needle = vm.native_arg(arg_count, 0);
    let receiver = arg_list(vm, arg_count, 1, "Receiver must be a list.")?;
    let found = vm.heap.list(receiver).iter().any(|&item| item == needle);
    Ok(Value::Bool(found))
}

/// `list.reverse()` returns a new list; the receiver is untouched.
pub(super) fn reverse(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let receiver = arg_list(vm, arg_count, 0, "Receiver must be a list.")?;
    let mut items = vm.heap.list(receiver).clone();
    items.reverse();
    let list = vm.gc_alloc(HeapObject::List(items));
    Ok(Value::Obj(list))
}

pub(super) fn sum(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let receiver = arg_list(vm, arg_count, 0, "Receiver must be a list.")?;
    let mut total = 0.0;
    for item in vm.heap.list(receiver) {
        match item.as_number() {
            Some(number) => total += number,
            None => return Err("Can only sum a list of numbers.".to_string()),
        }
    }
    Ok(Value::Number(total))
}
