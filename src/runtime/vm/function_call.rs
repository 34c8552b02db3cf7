use crate::runtime::frame::Frame;
use crate::runtime::gc::GcHandle;
use crate::runtime::object::{BoundMethod, BoundNative, HeapObject, NativeFunction, Upvalue};
use crate::runtime::value::Value;

use super::{Vm, FRAMES_MAX};

enum Callee {
    Closure(GcHandle),
    BoundMethod(Value, GcHandle),
    BoundNative(Value, GcHandle),
    Class(GcHandle),
    Native(NativeFunction),
    NotCallable,
}

enum InvokeTarget {
    Instance(GcHandle),
    Primitive(GcHandle),
    Module(GcHandle),
    NotInvokable,
}

impl Vm {
    pub(super) fn call_value(&mut self, callee: Value, arg_count: usize) -> Result<(), String> {
        let kind = match callee {
            Value::Obj(handle) => match self.heap.get(handle) {
                HeapObject::Closure(_) => Callee::Closure(handle),
                HeapObject::BoundMethod(bound) => Callee::BoundMethod(bound.receiver, bound.method),
                HeapObject::BoundNative(bound) => Callee::BoundNative(bound.receiver, bound.native),
                HeapObject::Class(_) => Callee::Class(handle),
                HeapObject::Native(native) => Callee::Native(*native),
                _ => Callee::NotCallable,
            },
            _ => Callee::NotCallable,
        };

        match kind {
            Callee::Closure(closure) => self.call_closure(closure, arg_count),
            Callee::BoundMethod(receiver, method) => {
                self.stack[self.sp - arg_count - 1] = receiver;
                self.call_closure(method, arg_count)
            }
            Callee::BoundNative(receiver, native) => {
                // The receiver rides along as one extra trailing argument.
                let native = self.heap.native(native);
                self.push(receiver)?;
                self.call_native(native, arg_count + 1)
            }
            Callee::Class(class) => self.call_class(class, arg_count),
            Callee::Native(native) => self.call_native(native, arg_count),
            Callee::NotCallable => Err("Can only call functions and classes.".to_string()),
        }
    }

    pub(super) fn call_closure(&mut self, closure: GcHandle, arg_count: usize) -> Result<(), String> {
        let function = self.heap.closure(closure).function;
        let arity = self.heap.function(function).arity;
        if arg_count != arity {
            return Err(format!(
                "Expected {} arguments but got {}.",
                arity, arg_count
            ));
        }
        if self.frames.len() == FRAMES_MAX {
            return Err("Stack overflow.".to_string());
        }
        self.frames
            .push(Frame::new(closure, self.sp - arg_count - 1));
        Ok(())
    }

    fn call_class(&mut self, class: GcHandle, arg_count: usize) -> Result<(), String> {
        // The class sits in the callee slot and keeps itself reachable
        // until the instance replaces it.
        let instance = self.new_instance(class);
        self.stack[self.sp - arg_count - 1] = Value::Obj(instance);

        let init_hash = self.heap.string_hash(self.init_string);
        let initializer = self
            .heap
            .class(class)
            .methods
            .get(self.init_string, init_hash);
        match initializer {
            Some(Value::Obj(init)) => self.call_closure(init, arg_count),
            Some(_) => Err("Class initializer must be a function.".to_string()),
            None if arg_count != 0 => {
                Err(format!("Expected 0 arguments but got {}.", arg_count))
            }
            None => Ok(()),
        }
    }

    fn call_native(&mut self, native: NativeFunction, arg_count: usize) -> Result<(), String> {
        let matches_arity = if native.arity < 0 {
            arg_count >= (-native.arity) as usize
        } else {
            arg_count == native.arity as usize
        };
        if !matches_arity {
            return Err(format!(
                "Expected {} arguments but got {}",
                native.arity.unsigned_abs(),
                arg_count
            ));
        }

        match (native.func)(self, arg_count) {
            Ok(result) => {
                self.sp -= arg_count + 1;
                self.push(result)
            }
            Err(message) => {
                if self.test_mode {
                    // Failures surface in the failure list; the call itself
                    // evaluates to nil and execution continues.
                    self.test_failures.push(message);
                    self.sp -= arg_count + 1;
                    self.push(Value::Nil)
                } else {
                    Err(message)
                }
            }
        }
    }

    /// Fused property access + call. Instance fields win over methods (a
    /// callable field shadows); primitive and module receivers dispatch to
    /// their method tables and exports.
    pub(super) fn invoke(&mut self, name: GcHandle, arg_count: usize) -> Result<(), String> {
        let receiver = self.peek(arg_count);
        let target = match receiver {
            Value::Obj(handle) => match self.heap.get(handle) {
                HeapObject::Instance(_) => InvokeTarget::Instance(handle),
                HeapObject::Str { .. } => InvokeTarget::Primitive(self.string_class),
                HeapObject::List(_) => InvokeTarget::Primitive(self.list_class),
                HeapObject::Map(_) => InvokeTarget::Primitive(self.map_class),
                HeapObject::Module(_) => InvokeTarget::Module(handle),
                _ => InvokeTarget::NotInvokable,
            },
            Value::Number(_) => InvokeTarget::Primitive(self.number_class),
            _ => InvokeTarget::NotInvokable,
        };

        match target {
            InvokeTarget::Instance(instance) => {
                let hash = self.heap.string_hash(name);
                if let Some(field) = self.heap.instance(instance).fields.get(name, hash) {
                    self.stack[self.sp - arg_count - 1] = field;
                    return self.call_value(field, arg_count);
                }
                let class = self.heap.instance(instance).class;
                self.invoke_from_class(class, name, arg_count)
            }
            InvokeTarget::Primitive(class) => self.invoke_primitive(class, name, arg_count),
            InvokeTarget::Module(module) => {
                let hash = self.heap.string_hash(name);
                match self.heap.module(module).exports.get(name, hash) {
                    Some(value) => {
                        self.stack[self.sp - arg_count - 1] = value;
                        self.call_value(value, arg_count)
                    }
                    None => Err(format!(
                        "Undefined property '{}'.",
                        self.heap.string_lossy(name)
                    )),
                }
            }
            InvokeTarget::NotInvokable => Err(format!(
                "Undefined property '{}'.",
                self.heap.string_lossy(name)
            )),
        }
    }

    pub(super) fn invoke_from_class(
        &mut self,
        class: GcHandle,
        name: GcHandle,
        arg_count: usize,
    ) -> Result<(), String> {
        let hash = self.heap.string_hash(name);
        match self.heap.class(class).methods.get(name, hash) {
            Some(Value::Obj(method)) => self.call_closure(method, arg_count),
            _ => Err(format!(
                "Undefined property '{}'.",
                self.heap.string_lossy(name)
            )),
        }
    }

    fn invoke_primitive(
        &mut self,
        class: GcHandle,
        name: GcHandle,
        arg_count: usize,
    ) -> Result<(), String> {
        let hash = self.heap.string_hash(name);
        let method = match self.heap.class(class).methods.get(name, hash) {
            Some(method) => method,
            None => {
                return Err(format!(
                    "Undefined property '{}'.",
                    self.heap.string_lossy(name)
                ));
            }
        };
        let receiver = self.peek(arg_count);
        self.push(receiver)?;
        self.call_value(method, arg_count + 1)
    }

    /// Replaces the instance on top of the stack with a bound method.
    pub(super) fn bind_method(&mut self, class: GcHandle, name: GcHandle) -> Result<(), String> {
        let hash = self.heap.string_hash(name);
        let method = match self.heap.class(class).methods.get(name, hash) {
            Some(Value::Obj(method)) => method,
            _ => {
                return Err(format!(
                    "Undefined property '{}'.",
                    self.heap.string_lossy(name)
                ));
            }
        };
        let receiver = self.peek(0);
        let bound = self.gc_alloc(HeapObject::BoundMethod(BoundMethod { receiver, method }));
        self.pop();
        self.push(Value::Obj(bound))
    }

    /// Primitive counterpart of [`Self::bind_method`] for native methods.
    pub(super) fn bind_native(&mut self, class: GcHandle, name: GcHandle) -> Result<(), String> {
        let hash = self.heap.string_hash(name);
        let native = match self.heap.class(class).methods.get(name, hash) {
            Some(Value::Obj(native)) => native,
            _ => {
                return Err(format!(
                    "Undefined property '{}'.",
                    self.heap.string_lossy(name)
                ));
            }
        };
        let receiver = self.peek(0);
        let bound = self.gc_alloc(HeapObject::BoundNative(BoundNative { receiver, native }));
        self.pop();
        self.push(Value::Obj(bound))
    }

    /// Re-entrant call used by natives (`map`, `filter`, ...): pushes the
    /// callee and arguments, runs nested frames to completion, and pops the
    /// result.
    pub(crate) fn call_function(&mut self, callee: Value, args: &[Value]) -> Result<Value, String> {
        self.push(callee)?;
        for &arg in args {
            self.push(arg)?;
        }
        let frames_before = self.frames.len();
        self.call_value(callee, args.len())?;
        if self.frames.len() > frames_before {
            self.run(self.frames.len())?;
        }
        Ok(self.pop())
    }

    // ---- upvalues ----

    /// Returns the open upvalue for `slot`, creating and threading a new one
    /// when no closure captured that slot yet. The open list stays sorted by
    /// descending slot.
    pub(super) fn capture_upvalue(&mut self, slot: usize) -> GcHandle {
        let mut insert_at = self.open_upvalues.len();
        for (index, &handle) in self.open_upvalues.iter().enumerate() {
            match self.heap.upvalue(handle) {
                Upvalue::Open(existing) => {
                    if *existing == slot {
                        return handle;
                    }
                    if *existing < slot {
                        insert_at = index;
                        break;
                    }
                }
                Upvalue::Closed(_) => unreachable!("closed upvalue on the open list"),
            }
        }

        let created = self.gc_alloc(HeapObject::Upvalue(Upvalue::Open(slot)));
        self.open_upvalues.insert(insert_at, created);
        created
    }

    /// Closes every open upvalue at or above `last`: the stack value moves
    /// into the upvalue's own cell and the upvalue leaves the open list.
    pub(super) fn close_upvalues(&mut self, last: usize) {
        while let Some(&handle) = self.open_upvalues.first() {
            let slot = match self.heap.upvalue(handle) {
                Upvalue::Open(slot) => *slot,
                Upvalue::Closed(_) => unreachable!("closed upvalue on the open list"),
            };
            if slot < last {
                break;
            }
            let value = self.stack[slot];
            *self.heap.upvalue_mut(handle) = Upvalue::Closed(value);
            self.open_upvalues.remove(0);
        }
    }
}
