use crate::runtime::value::Value;
use crate::runtime::vm::Vm;

use super::helpers::arg_number;

/// `number(v)` converts numbers (identity), bools (0/1), and strings
/// (longest leading numeric prefix, `strtof`-style; 0 when no prefix
/// parses). Everything else is an error.
pub(super) fn number(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let value = vm.native_arg(arg_count, 0);
    match value {
        Value::Number(_) => Ok(value),
        Value::Bool(b) => Ok(Value::Number(if b { 1.0 } else { 0.0 })),
        Value::Obj(handle) => match vm.heap.as_string(value) {
            Some(_) => {
                let text = vm.heap.string_lossy(handle).into_owned();
                Ok(Value::Number(leading_number(text.trim_start())))
            }
            None => Err("Given type cannot be converted to a number.".to_string()),
        },
        Value::Nil => Err("Given type cannot be converted to a number.".to_string()),
    }
}

/// Parses the longest leading float prefix, ignoring trailing garbage:
/// optional sign, digits with at most one dot, then an exponent only when
/// digits follow the marker. Returns 0 when nothing parses.
fn leading_number(text: &str) -> f64 {
    let bytes = text.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => {
                seen_digit = true;
                end += 1;
            }
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    if !seen_digit {
        return 0.0;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exponent_end = end + 1;
        if matches!(bytes.get(exponent_end), Some(b'+') | Some(b'-')) {
            exponent_end += 1;
        }
        let digits_start = exponent_end;
        while exponent_end < bytes.len() && bytes[exponent_end].is_ascii_digit() {
            exponent_end += 1;
        }
        if exponent_end > digits_start {
            end = exponent_end;
        }
    }

    text[..end].parse().unwrap_or(0.0)
}

/// `n.add(m)` on the Number primitive class; the receiver is the trailing
/// argument.
pub(super) fn add(vm: &mut Vm, arg_count: usize) -> Result<Value, String> {
    let operand = arg_number(vm, arg_count, 0, "Operands must be numbers.")?;
    let receiver = arg_number(vm, arg_count, 1, "Operands must be numbers.")?;
    Ok(Value::Number(receiver + operand))
}
