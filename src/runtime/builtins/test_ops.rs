//! The test-protocol natives. While test mode is on, runtime errors land in
//! the VM's failure list instead of halting execution; these natives let
//! the embedded test framework drive and inspect that state.

use crate::runtime::value::Value;
use crate::runtime::vm::Vm;

use super::helpers::arg_string;

pub(super) fn enter_test_mode(vm: &mut Vm, _arg_count: usize) -> Result<Value, String> {
    vm.test_mode = true;
    vm.test_failures.clear();
    vm.current_test = None;
    Ok(Value::Nil)
}

pub(super) fn exit_test_mode(vm: &mut Vm, _arg_count: usize) -> Result<Value, String> {
    vm.test_mode = false;
    Ok(Value::Nil)
}

pub(super) fn set_current_test(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let name = arg_string(vm, arg_count, 0, "Test name must be a string.")?;
    vm.current_test = Some(vm.heap.string_lossy(name).into_owned());
    Ok(Value::Nil)
}

pub(super) fn test_failed(vm: &mut Vm, _arg_count: usize) -> Result<Value, String> {
    Ok(Value::Bool(!vm.test_failures.is_empty()))
}

pub(super) fn get_last_failure(vm: &mut Vm, _arg_count: usize) -> Result<Value, String> {
    match vm.test_failures.last().cloned() {
        Some(message) => {
            let handle = vm.intern(message.as_bytes());
            Ok(Value::Obj(handle))
        }
        None => Ok(Value::Nil),
    }
}

pub(super) fn clear_last_failure(vm: &mut Vm, _arg_count: usize) -> Result<Value, String> {
    vm.test_failures.pop();
    Ok(Value::Nil)
}
