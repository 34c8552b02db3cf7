use crate::runtime::value::Value;
use crate::runtime::vm::Vm;

/// `assert(cond)` / `assert(cond, message)`.
pub(super) fn assert(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    if arg_count > 2 {
        return Err(format!("Expected 1 or 2 arguments but got {}", arg_count));
    }
    let condition = vm.native_arg(arg_count, 0);
    if !condition.is_falsey() {
        return Ok(Value::Nil);
    }
    if arg_count == 2 {
        let message = vm.native_arg(arg_count, 1);
        Err(vm.heap.display_value(message))
    } else {
        Err("Assertion failed.".to_string())
    }
}

pub(super) fn assert_equal(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let expected = vm.native_arg(arg_count, 0);
    let actual = vm.native_arg(arg_count, 1);
    // Interning makes string comparison identity; everything else follows
    // value equality.
    if expected == actual {
        Ok(Value::Nil)
    } else {
        Err(format!(
            "Assertion failed: expected {} but got {}.",
            vm.heap.display_value(expected),
            vm.heap.display_value(actual)
        ))
    }
}
