use crate::runtime::gc::GcHandle;
use crate::runtime::object::HeapObject;
use crate::runtime::vm::Vm;

pub(super) fn arg_number(
    vm: &Vm,
    arg_count: usize,
    index: usize,
    message: &str,
) -> Result<f64, String> {
    vm.native_arg(arg_count, index)
        .as_number()
        .ok_or_else(|| message.to_string())
}

pub(super) fn arg_string(
    vm: &Vm,
    arg_count: usize,
    index: usize,
    message: &str,
) -> Result<GcHandle, String> {
    vm.heap
        .as_string(vm.native_arg(arg_count, index))
        .ok_or_else(|| message.to_string())
}

pub(super) fn arg_list(
    vm: &Vm,
    arg_count: usize,
    index: usize,
    message: &str,
) -> Result<GcHandle, String> {
    match vm.native_arg(arg_count, index) {
        crate::runtime::value::Value::Obj(handle) => match vm.heap.get(handle) {
            HeapObject::List(_) => Ok(handle),
            _ => Err(message.to_string()),
        },
        _ => Err(message.to_string()),
    }
}

pub(super) fn arg_map(
    vm: &Vm,
    arg_count: usize,
    index: usize,
    message: &str,
) -> Result<GcHandle, String> {
    match vm.native_arg(arg_count, index) {
        crate::runtime::value::Value::Obj(handle) => match vm.heap.get(handle) {
            HeapObject::Map(_) => Ok(handle),
            _ => Err(message.to_string()),
        },
        _ => Err(message.to_string()),
    }
}
