use crate::bytecode::op_code::OpCode;
use crate::runtime::gc::GcHandle;
use crate::runtime::object::{Class, Closure, HeapObject, Instance, Upvalue};
use crate::runtime::table::Table;
use crate::runtime::value::Value;

use super::{Flow, Vm};

impl Vm {
    pub(super) fn dispatch(&mut self, op: OpCode, floor: usize) -> Result<Flow, String> {
        match op {
            OpCode::OpConstant => {
                let constant = self.read_constant();
                self.push(constant)?;
            }
            OpCode::OpConstantLong => {
                let index = self.read_u24();
                let constant = self.constant_at(index);
                self.push(constant)?;
            }
            OpCode::OpNil => self.push(Value::Nil)?,
            OpCode::OpTrue => self.push(Value::Bool(true))?,
            OpCode::OpFalse => self.push(Value::Bool(false))?,
            OpCode::OpPop => {
                self.pop();
            }

            OpCode::OpGetLocal => {
                let slot = self.read_byte() as usize;
                let base = self.frames.last().expect("no active frame").slot_base;
                let value = self.stack[base + slot];
                self.push(value)?;
            }
            OpCode::OpSetLocal => {
                let slot = self.read_byte() as usize;
                let value = self.peek(0);
                let base = self.frames.last().expect("no active frame").slot_base;
                self.stack[base + slot] = value;
            }
            OpCode::OpGetGlobal => {
                let name = self.read_string();
                match self.get_current_global(name) {
                    Some(value) => self.push(value)?,
                    None => {
                        return Err(format!(
                            "Undefined variable '{}'.",
                            self.heap.string_lossy(name)
                        ));
                    }
                }
            }
            OpCode::OpDefineGlobal => {
                let name = self.read_string();
                let value = self.peek(0);
                self.set_current_global(name, value);
                self.pop();
            }
            OpCode::OpSetGlobal => {
                let name = self.read_string();
                let value = self.peek(0);
                // Assignment may not create a global; undo the insert the
                // probe just made.
                if self.set_current_global(name, value) {
                    self.delete_current_global(name);
                    return Err(format!(
                        "Undefined variable '{}'.",
                        self.heap.string_lossy(name)
                    ));
                }
            }
            OpCode::OpGetUpvalue => {
                let slot = self.read_byte() as usize;
                let closure = self.frames.last().expect("no active frame").closure;
                let upvalue = self.heap.closure(closure).upvalues[slot];
                let value = match self.heap.upvalue(upvalue) {
                    Upvalue::Open(stack_slot) => self.stack[*stack_slot],
                    Upvalue::Closed(value) => *value,
                };
                self.push(value)?;
            }
            OpCode::OpSetUpvalue => {
                let slot = self.read_byte() as usize;
                let value = self.peek(0);
                let closure = self.frames.last().expect("no active frame").closure;
                let upvalue = self.heap.closure(closure).upvalues[slot];
                match self.heap.upvalue_mut(upvalue) {
                    Upvalue::Open(stack_slot) => {
                        let stack_slot = *stack_slot;
                        self.stack[stack_slot] = value;
                    }
                    Upvalue::Closed(closed) => *closed = value,
                }
            }

            OpCode::OpGetProperty => {
                let name = self.read_string();
                self.get_property(name)?;
            }
            OpCode::OpSetProperty => {
                let name = self.read_string();
                self.set_property(name)?;
            }
            OpCode::OpGetSuper => {
                let name = self.read_string();
                let superclass = self
                    .pop()
                    .as_obj()
                    .expect("superclass slot must hold a class");
                self.bind_method(superclass, name)?;
            }

            OpCode::OpEqual => {
                let b = self.pop();
                let a = self.pop();
                self.push(Value::Bool(a == b))?;
            }
            OpCode::OpGreater => self.binary_compare(|a, b| a > b)?,
            OpCode::OpLess => self.binary_compare(|a, b| a < b)?,
            OpCode::OpAdd => self.binary_add()?,
            OpCode::OpSubtract => self.binary_arithmetic(|a, b| a - b)?,
            OpCode::OpMultiply => self.binary_arithmetic(|a, b| a * b)?,
            OpCode::OpDivide => self.binary_arithmetic(|a, b| a / b)?,
            OpCode::OpModulo => self.binary_arithmetic(|a, b| a % b)?,
            OpCode::OpNot => {
                let value = self.pop();
                self.push(Value::Bool(value.is_falsey()))?;
            }
            OpCode::OpNegate => {
                match self.peek(0).as_number() {
                    Some(number) => {
                        self.pop();
                        self.push(Value::Number(-number))?;
                    }
                    None => return Err("Operand must be a number.".to_string()),
                }
            }

            OpCode::OpPrint => {
                let value = self.pop();
                let text = self.heap.display_value(value);
                self.write_line(&text);
            }
            OpCode::OpJump => {
                let offset = self.read_u16() as usize;
                self.frames.last_mut().expect("no active frame").ip += offset;
            }
            OpCode::OpJumpIfFalse => {
                let offset = self.read_u16() as usize;
                if self.peek(0).is_falsey() {
                    self.frames.last_mut().expect("no active frame").ip += offset;
                }
            }
            OpCode::OpLoop => {
                let offset = self.read_u16() as usize;
                self.frames.last_mut().expect("no active frame").ip -= offset;
            }

            OpCode::OpCall => {
                let arg_count = self.read_byte() as usize;
                let callee = self.peek(arg_count);
                self.call_value(callee, arg_count)?;
            }
            OpCode::OpInvoke => {
                let name = self.read_string();
                let arg_count = self.read_byte() as usize;
                self.invoke(name, arg_count)?;
            }
            OpCode::OpSuperInvoke => {
                let name = self.read_string();
                let arg_count = self.read_byte() as usize;
                let superclass = self
                    .pop()
                    .as_obj()
                    .expect("superclass slot must hold a class");
                self.invoke_from_class(superclass, name, arg_count)?;
            }

            OpCode::OpClosure => {
                self.build_closure()?;
            }
            OpCode::OpCloseUpvalue => {
                self.close_upvalues(self.sp - 1);
                self.pop();
            }
            OpCode::OpReturn => {
                let result = self.pop();
                let frame = self.frames.pop().expect("return with no active frame");
                self.close_upvalues(frame.slot_base);
                self.sp = frame.slot_base;
                self.push(result)?;
                if self.frames.len() < floor {
                    return Ok(Flow::Halt);
                }
            }

            OpCode::OpClass => {
                let name = self.read_string();
                let class = self.gc_alloc(HeapObject::Class(Class {
                    name,
                    methods: Table::new(),
                }));
                self.push(Value::Obj(class))?;
            }
            OpCode::OpInherit => {
                let superclass = self.peek(1);
                let superclass = match superclass {
                    Value::Obj(handle) => match self.heap.get(handle) {
                        HeapObject::Class(_) => handle,
                        _ => return Err("Superclass must be a class.".to_string()),
                    },
                    _ => return Err("Superclass must be a class.".to_string()),
                };
                let subclass = self
                    .peek(0)
                    .as_obj()
                    .expect("subclass slot must hold a class");
                // Copy-down inheritance: method lookup never walks a chain.
                let methods = self.heap.class(superclass).methods.clone();
                self.heap.class_mut(subclass).methods.add_all(&methods);
                self.pop();
            }
            OpCode::OpMethod => {
                let name = self.read_string();
                let method = self.peek(0);
                let class = self
                    .peek(1)
                    .as_obj()
                    .expect("method definition outside class");
                let hash = self.heap.string_hash(name);
                self.heap.class_mut(class).methods.set(name, hash, method);
                self.pop();
            }

            OpCode::OpBuildList => {
                let count = self.read_byte() as usize;
                let start = self.sp - count;
                let items = self.stack[start..self.sp].to_vec();
                let list = self.gc_alloc(HeapObject::List(items));
                self.sp = start;
                self.push(Value::Obj(list))?;
            }
            OpCode::OpBuildMap => {
                let pairs = self.read_byte() as usize;
                let start = self.sp - pairs * 2;
                let mut table = Table::new();
                for pair in 0..pairs {
                    let key = self.stack[start + pair * 2];
                    let value = self.stack[start + pair * 2 + 1];
                    let key = self
                        .heap
                        .as_string(key)
                        .ok_or_else(|| "Map key must be a string.".to_string())?;
                    let hash = self.heap.string_hash(key);
                    table.set(key, hash, value);
                }
                let map = self.gc_alloc(HeapObject::Map(table));
                self.sp = start;
                self.push(Value::Obj(map))?;
            }
            OpCode::OpIndex => self.index_get()?,
            OpCode::OpStore => self.index_store()?,

            OpCode::OpImport => {
                let path = self.read_string();
                self.import_all(path)?;
            }
            OpCode::OpImportFrom => {
                let path = self.read_string();
                let name = self.read_string();
                self.import_from(path, name)?;
            }
            OpCode::OpExport => {
                let name = self.read_string();
                self.export_name(name)?;
            }
        }
        Ok(Flow::Continue)
    }

    fn build_closure(&mut self) -> Result<(), String> {
        let function = self
            .read_constant()
            .as_obj()
            .expect("closure constant must be a function");
        let upvalue_count = self.heap.function(function).upvalue_count;
        let module = self.current_module();

        let closure = self.gc_alloc(HeapObject::Closure(Closure {
            function,
            upvalues: Vec::with_capacity(upvalue_count),
            module,
        }));
        self.push(Value::Obj(closure))?;

        for _ in 0..upvalue_count {
            let is_local = self.read_byte() != 0;
            let index = self.read_byte() as usize;
            let upvalue = if is_local {
                let base = self.frames.last().expect("no active frame").slot_base;
                self.capture_upvalue(base + index)
            } else {
                let enclosing = self.frames.last().expect("no active frame").closure;
                self.heap.closure(enclosing).upvalues[index]
            };
            self.heap.closure_mut(closure).upvalues.push(upvalue);
        }
        Ok(())
    }

    /// Property reads dispatch on the receiver: instance fields shadow
    /// methods; primitive receivers bind their class natives; modules give
    /// out their exports.
    fn get_property(&mut self, name: GcHandle) -> Result<(), String> {
        enum Receiver {
            Instance(GcHandle),
            Primitive(GcHandle),
            Module(GcHandle),
            Other,
        }

        let receiver = self.peek(0);
        let kind = match receiver {
            Value::Obj(handle) => match self.heap.get(handle) {
                HeapObject::Instance(_) => Receiver::Instance(handle),
                HeapObject::Str { .. } => Receiver::Primitive(self.string_class),
                HeapObject::List(_) => Receiver::Primitive(self.list_class),
                HeapObject::Map(_) => Receiver::Primitive(self.map_class),
                HeapObject::Module(_) => Receiver::Module(handle),
                _ => Receiver::Other,
            },
            Value::Number(_) => Receiver::Primitive(self.number_class),
            _ => Receiver::Other,
        };

        match kind {
            Receiver::Instance(instance) => {
                let hash = self.heap.string_hash(name);
                if let Some(value) = self.heap.instance(instance).fields.get(name, hash) {
                    self.pop();
                    self.push(value)?;
                    return Ok(());
                }
                let class = self.heap.instance(instance).class;
                self.bind_method(class, name)
            }
            Receiver::Primitive(class) => self.bind_native(class, name),
            Receiver::Module(module) => {
                let hash = self.heap.string_hash(name);
                match self.heap.module(module).exports.get(name, hash) {
                    Some(value) => {
                        self.pop();
                        self.push(value)
                    }
                    None => Err(format!(
                        "Undefined property '{}'.",
                        self.heap.string_lossy(name)
                    )),
                }
            }
            Receiver::Other => Err("Only instances have properties".to_string()),
        }
    }

    fn set_property(&mut self, name: GcHandle) -> Result<(), String> {
        let target = self.peek(1);
        let instance = match target {
            Value::Obj(handle) => match self.heap.get(handle) {
                HeapObject::Instance(_) => handle,
                _ => return Err("Only instances have fields".to_string()),
            },
            _ => return Err("Only instances have fields".to_string()),
        };

        let value = self.peek(0);
        let hash = self.heap.string_hash(name);
        self.heap
            .instance_mut(instance)
            .fields
            .set(name, hash, value);

        // Leave the assigned value as the expression result.
        let value = self.pop();
        self.pop();
        self.push(value)
    }

    pub(super) fn new_instance(&mut self, class: GcHandle) -> GcHandle {
        self.gc_alloc(HeapObject::Instance(Instance {
            class,
            fields: Table::new(),
        }))
    }
}
