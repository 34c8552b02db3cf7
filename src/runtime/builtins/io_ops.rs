use std::io::BufRead;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::runtime::value::Value;
use crate::runtime::vm::Vm;

use super::helpers::arg_string;

pub(super) fn clock(_vm: &mut Vm, _arg_count: usize) -> Result<Value, String> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    Ok(Value::Number(seconds))
}

/// Reads one line from stdin. The bound is deliberate: anything past 255
/// bytes (plus the newline) is an error, not a truncation.
pub(super) fn input(vm: &mut Vm, _arg_count: usize) -> Result<Value, String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|error| format!("Could not read input: {}.", error))?;

    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    if line.len() > 255 {
        return Err("Input cannot be longer than 256 characters.".to_string());
    }
    let handle = vm.intern(line.as_bytes());
    Ok(Value::Obj(handle))
}

pub(super) fn read_file(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let path = arg_string(vm, arg_count, 0, "Argument must be a string.")?;
    let path_text = vm.heap.string_lossy(path).into_owned();
    let contents = std::fs::read(&path_text)
        .map_err(|_| format!("Could not open file \"{}\".", path_text))?;
    let handle = vm.intern(&contents);
    Ok(Value::Obj(handle))
}
