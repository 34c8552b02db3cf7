use crate::runtime::gc::GcHandle;

/// Runtime value used by the VM stack, globals, constants, and upvalues.
///
/// Heap data lives behind `Obj` handles into the [`Heap`](crate::runtime::gc::Heap)
/// arena, so `Value` itself stays `Copy` and equality on objects is handle
/// identity. Interning collapses content-equal strings to one handle, which
/// makes string equality coincide with content equality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Obj(GcHandle),
}

impl Value {
    /// Only `nil` and `false` are falsey; every other value (including `0`)
    /// is truthy.
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_obj(&self) -> Option<GcHandle> {
        match self {
            Value::Obj(handle) => Some(*handle),
            _ => None,
        }
    }
}

/// Formats a number the way `print` shows it: shortest text that reads back
/// as the same f64, with whole numbers rendered without a decimal point.
pub fn format_number(n: f64) -> String {
    n.to_string()
}
