use crate::runtime::value::Value;

use super::Vm;

impl Vm {
    /// `+` concatenates when either operand is a string (the other side is
    /// stringified); otherwise both operands must be numbers.
    pub(super) fn binary_add(&mut self) -> Result<(), String> {
        let b = self.peek(0);
        let a = self.peek(1);

        let a_string = self.heap.as_string(a).is_some();
        let b_string = self.heap.as_string(b).is_some();
        if a_string || b_string {
            let mut bytes = Vec::new();
            match self.heap.as_string(a) {
                Some(handle) => bytes.extend_from_slice(self.heap.string_bytes(handle)),
                None => bytes.extend_from_slice(self.heap.display_value(a).as_bytes()),
            }
            match self.heap.as_string(b) {
                Some(handle) => bytes.extend_from_slice(self.heap.string_bytes(handle)),
                None => bytes.extend_from_slice(self.heap.display_value(b).as_bytes()),
            }
            // Operands stay on the stack until after the allocation so a
            // collection here cannot free them.
            let result = self.intern(&bytes);
            self.pop();
            self.pop();
            return self.push(Value::Obj(result));
        }

        match (a.as_number(), b.as_number()) {
            (Some(a), Some(b)) => {
                self.pop();
                self.pop();
                self.push(Value::Number(a + b))
            }
            _ => Err("Operands must be two numbers or two strings.".to_string()),
        }
    }

    pub(super) fn binary_arithmetic(&mut self, op: fn(f64, f64) -> f64) -> Result<(), String> {
        let (a, b) = self.numeric_operands()?;
        self.push(Value::Number(op(a, b)))
    }

    pub(super) fn binary_compare(&mut self, op: fn(f64, f64) -> bool) -> Result<(), String> {
        let (a, b) = self.numeric_operands()?;
        self.push(Value::Bool(op(a, b)))
    }

    fn numeric_operands(&mut self) -> Result<(f64, f64), String> {
        let b = self.peek(0).as_number();
        let a = self.peek(1).as_number();
        match (a, b) {
            (Some(a), Some(b)) => {
                self.pop();
                self.pop();
                Ok((a, b))
            }
            _ => Err("Operands must be numbers.".to_string()),
        }
    }
}
