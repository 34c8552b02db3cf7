use crate::bytecode::chunk::Chunk;
use crate::runtime::gc::GcHandle;
use crate::runtime::table::Table;
use crate::runtime::value::Value;
use crate::runtime::vm::Vm;

/// A compiled function: the chunk plus its calling metadata. The top-level
/// script compiles to a function with arity 0 and no name.
#[derive(Debug)]
pub struct Function {
    pub arity: usize,
    pub upvalue_count: usize,
    pub name: Option<GcHandle>,
    pub chunk: Chunk,
}

/// Native functions receive the VM and their argument count; arguments sit
/// in the VM's argument window, the receiver last for bound natives. A
/// failure is reported through `Err` and becomes a runtime error (or a
/// test-mode failure entry).
pub type NativeFn = fn(&mut Vm, usize) -> Result<Value, String>;

/// A builtin function handle. Negative arity means variadic with a minimum
/// of `-arity` arguments.
#[derive(Debug, Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: i32,
    pub func: NativeFn,
}

/// A runtime closure over a compiled function. `module` is set for closures
/// created while a module body runs, routing global accesses to that
/// module's namespace.
#[derive(Debug)]
pub struct Closure {
    pub function: GcHandle,
    pub upvalues: Vec<GcHandle>,
    pub module: Option<GcHandle>,
}

/// A captured variable: open while its slot is still live on the VM stack,
/// closed (owning the value) afterwards.
#[derive(Debug)]
pub enum Upvalue {
    Open(usize),
    Closed(Value),
}

#[derive(Debug)]
pub struct Class {
    pub name: GcHandle,
    pub methods: Table,
}

#[derive(Debug)]
pub struct Instance {
    pub class: GcHandle,
    pub fields: Table,
}

/// A method closure paired with the instance it was read from.
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub method: GcHandle,
}

/// A primitive-class native paired with its receiver.
#[derive(Debug)]
pub struct BoundNative {
    pub receiver: Value,
    pub native: GcHandle,
}

/// A loaded module: its own globals namespace plus the subset promoted
/// through `export`.
#[derive(Debug)]
pub struct Module {
    pub name: GcHandle,
    pub globals: Table,
    pub exports: Table,
}

/// Everything that lives in the GC arena. Strings are immutable byte
/// arrays interned by content; all inter-object references are handles.
#[derive(Debug)]
pub enum HeapObject {
    Str { bytes: Box<[u8]>, hash: u32 },
    Function(Function),
    Closure(Closure),
    Upvalue(Upvalue),
    Class(Class),
    Instance(Instance),
    BoundMethod(BoundMethod),
    BoundNative(BoundNative),
    Native(NativeFunction),
    List(Vec<Value>),
    Map(Table),
    Module(Module),
}

impl HeapObject {
    pub fn type_name(&self) -> &'static str {
        match self {
            HeapObject::Str { .. } => "string",
            HeapObject::Function(_) => "function",
            HeapObject::Closure(_) => "function",
            HeapObject::Upvalue(_) => "upvalue",
            HeapObject::Class(_) => "class",
            HeapObject::Instance(_) => "instance",
            HeapObject::BoundMethod(_) => "method",
            HeapObject::BoundNative(_) => "method",
            HeapObject::Native(_) => "function",
            HeapObject::List(_) => "list",
            HeapObject::Map(_) => "map",
            HeapObject::Module(_) => "module",
        }
    }

    /// Rough heap footprint used for the collection threshold. Precision
    /// does not matter; monotonicity with real usage does.
    pub(crate) fn size_estimate(&self) -> usize {
        let payload = match self {
            HeapObject::Str { bytes, .. } => bytes.len(),
            HeapObject::Function(f) => {
                f.chunk.code.len()
                    + f.chunk.lines.len() * std::mem::size_of::<usize>()
                    + f.chunk.constants.len() * std::mem::size_of::<Value>()
            }
            HeapObject::Closure(c) => c.upvalues.len() * std::mem::size_of::<GcHandle>(),
            HeapObject::Class(c) => c.methods.capacity() * 24,
            HeapObject::Instance(i) => i.fields.capacity() * 24,
            HeapObject::List(items) => items.capacity() * std::mem::size_of::<Value>(),
            HeapObject::Map(table) => table.capacity() * 24,
            HeapObject::Module(m) => (m.globals.capacity() + m.exports.capacity()) * 24,
            HeapObject::Upvalue(_)
            | HeapObject::BoundMethod(_)
            | HeapObject::BoundNative(_)
            | HeapObject::Native(_) => 0,
        };
        std::mem::size_of::<HeapObject>() + payload
    }
}
