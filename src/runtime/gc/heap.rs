use std::borrow::Cow;

use crate::bytecode::chunk::Chunk;
use crate::runtime::gc::GcHandle;
use crate::runtime::object::{
    BoundMethod, BoundNative, Class, Closure, Function, HeapObject, Instance, Module,
    NativeFunction, Upvalue,
};
use crate::runtime::table::{hash_bytes, Table};
use crate::runtime::value::{format_number, Value};

/// First collection happens once a megabyte of estimated heap is live.
const FIRST_GC_THRESHOLD: usize = 1024 * 1024;
const HEAP_GROW_FACTOR: usize = 2;

struct HeapEntry {
    object: HeapObject,
    marked: bool,
}

/// Root set handed to [`Heap::collect`] by the VM. Temp roots are already
/// inside the heap and marked implicitly.
pub struct GcRoots<'a> {
    pub stack: &'a [Value],
    pub handles: &'a [GcHandle],
    pub tables: &'a [&'a Table],
}

/// Single-owner arena for every Cmel heap object, with a stop-the-world
/// tri-color mark-and-sweep collector.
///
/// Objects reference each other through [`GcHandle`]s. Slots are reused via
/// a free list but never compacted, so handles stay stable. The heap also
/// owns the string intern set, which is weak: after sweeping it is
/// traversed to drop entries whose string died.
///
/// Collection is driven from VM allocation sites; the heap itself only
/// tracks the byte estimate and the threshold.
pub struct Heap {
    entries: Vec<Option<HeapEntry>>,
    free_list: Vec<u32>,
    bytes_allocated: usize,
    next_gc: usize,
    gc_enabled: bool,
    strings: Table,
    temp_roots: Vec<Value>,
    gray: Vec<GcHandle>,
    total_collections: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            bytes_allocated: 0,
            next_gc: FIRST_GC_THRESHOLD,
            gc_enabled: true,
            strings: Table::new(),
            temp_roots: Vec::new(),
            gray: Vec::new(),
            total_collections: 0,
        }
    }

    /// Disables or re-enables threshold-driven collection (used by tests
    /// that need deterministic heap contents).
    pub fn set_gc_enabled(&mut self, enabled: bool) {
        self.gc_enabled = enabled;
    }

    pub fn should_collect(&self) -> bool {
        self.gc_enabled && self.bytes_allocated > self.next_gc
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    pub fn total_collections(&self) -> usize {
        self.total_collections
    }

    /// Allocates an object and returns its handle. Never collects on its
    /// own; callers that can reach a collection point go through the VM's
    /// allocation wrapper.
    pub fn alloc(&mut self, object: HeapObject) -> GcHandle {
        self.bytes_allocated += object.size_estimate();
        let entry = HeapEntry {
            object,
            marked: false,
        };
        if let Some(index) = self.free_list.pop() {
            self.entries[index as usize] = Some(entry);
            GcHandle(index)
        } else {
            let index = self.entries.len() as u32;
            self.entries.push(Some(entry));
            GcHandle(index)
        }
    }

    pub fn get(&self, handle: GcHandle) -> &HeapObject {
        &self.entries[handle.index() as usize]
            .as_ref()
            .expect("Heap::get: invalid or free handle")
            .object
    }

    pub fn get_mut(&mut self, handle: GcHandle) -> &mut HeapObject {
        &mut self.entries[handle.index() as usize]
            .as_mut()
            .expect("Heap::get_mut: invalid or free handle")
            .object
    }

    pub fn is_live(&self, handle: GcHandle) -> bool {
        self.entries
            .get(handle.index() as usize)
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|slot| slot.is_some()).count()
    }

    // ---- strings ----

    /// Interns a byte string: returns the existing handle for this content
    /// or allocates a new string object and records it in the intern set.
    pub fn intern(&mut self, bytes: &[u8]) -> GcHandle {
        let hash = hash_bytes(bytes);
        if let Some(existing) = self.find_interned(bytes, hash) {
            return existing;
        }
        let handle = self.alloc(HeapObject::Str {
            bytes: bytes.into(),
            hash,
        });
        self.strings.set(handle, hash, Value::Nil);
        handle
    }

    pub fn intern_str(&mut self, text: &str) -> GcHandle {
        self.intern(text.as_bytes())
    }

    fn find_interned(&self, bytes: &[u8], hash: u32) -> Option<GcHandle> {
        let entries = &self.entries;
        self.strings.find_string_with(hash, |candidate| {
            match entries[candidate.index() as usize].as_ref() {
                Some(entry) => match &entry.object {
                    HeapObject::Str {
                        bytes: candidate_bytes,
                        hash: candidate_hash,
                    } => *candidate_hash == hash && **candidate_bytes == *bytes,
                    _ => false,
                },
                None => false,
            }
        })
    }

    pub fn string_bytes(&self, handle: GcHandle) -> &[u8] {
        match self.get(handle) {
            HeapObject::Str { bytes, .. } => bytes,
            other => panic!("expected string, found {}", other.type_name()),
        }
    }

    pub fn string_hash(&self, handle: GcHandle) -> u32 {
        match self.get(handle) {
            HeapObject::Str { hash, .. } => *hash,
            other => panic!("expected string, found {}", other.type_name()),
        }
    }

    pub fn string_lossy(&self, handle: GcHandle) -> Cow<'_, str> {
        String::from_utf8_lossy(self.string_bytes(handle))
    }

    pub fn as_string(&self, value: Value) -> Option<GcHandle> {
        match value {
            Value::Obj(handle) => match self.get(handle) {
                HeapObject::Str { .. } => Some(handle),
                _ => None,
            },
            _ => None,
        }
    }

    // ---- typed accessors ----

    pub fn function(&self, handle: GcHandle) -> &Function {
        match self.get(handle) {
            HeapObject::Function(function) => function,
            other => panic!("expected function, found {}", other.type_name()),
        }
    }

    pub fn closure(&self, handle: GcHandle) -> &Closure {
        match self.get(handle) {
            HeapObject::Closure(closure) => closure,
            other => panic!("expected closure, found {}", other.type_name()),
        }
    }

    pub fn closure_mut(&mut self, handle: GcHandle) -> &mut Closure {
        match self.get_mut(handle) {
            HeapObject::Closure(closure) => closure,
            other => panic!("expected closure, found {}", other.type_name()),
        }
    }

    /// The chunk behind a closure handle; the hot path of the dispatch loop.
    pub fn closure_chunk(&self, closure: GcHandle) -> &Chunk {
        &self.function(self.closure(closure).function).chunk
    }

    pub fn upvalue(&self, handle: GcHandle) -> &Upvalue {
        match self.get(handle) {
            HeapObject::Upvalue(upvalue) => upvalue,
            other => panic!("expected upvalue, found {}", other.type_name()),
        }
    }

    pub fn upvalue_mut(&mut self, handle: GcHandle) -> &mut Upvalue {
        match self.get_mut(handle) {
            HeapObject::Upvalue(upvalue) => upvalue,
            other => panic!("expected upvalue, found {}", other.type_name()),
        }
    }

    pub fn class(&self, handle: GcHandle) -> &Class {
        match self.get(handle) {
            HeapObject::Class(class) => class,
            other => panic!("expected class, found {}", other.type_name()),
        }
    }

    pub fn class_mut(&mut self, handle: GcHandle) -> &mut Class {
        match self.get_mut(handle) {
            HeapObject::Class(class) => class,
            other => panic!("expected class, found {}", other.type_name()),
        }
    }

    pub fn instance(&self, handle: GcHandle) -> &Instance {
        match self.get(handle) {
            HeapObject::Instance(instance) => instance,
            other => panic!("expected instance, found {}", other.type_name()),
        }
    }

    pub fn instance_mut(&mut self, handle: GcHandle) -> &mut Instance {
        match self.get_mut(handle) {
            HeapObject::Instance(instance) => instance,
            other => panic!("expected instance, found {}", other.type_name()),
        }
    }

    pub fn list(&self, handle: GcHandle) -> &Vec<Value> {
        match self.get(handle) {
            HeapObject::List(items) => items,
            other => panic!("expected list, found {}", other.type_name()),
        }
    }

    pub fn list_mut(&mut self, handle: GcHandle) -> &mut Vec<Value> {
        match self.get_mut(handle) {
            HeapObject::List(items) => items,
            other => panic!("expected list, found {}", other.type_name()),
        }
    }

    pub fn map(&self, handle: GcHandle) -> &Table {
        match self.get(handle) {
            HeapObject::Map(table) => table,
            other => panic!("expected map, found {}", other.type_name()),
        }
    }

    pub fn map_mut(&mut self, handle: GcHandle) -> &mut Table {
        match self.get_mut(handle) {
            HeapObject::Map(table) => table,
            other => panic!("expected map, found {}", other.type_name()),
        }
    }

    pub fn module(&self, handle: GcHandle) -> &Module {
        match self.get(handle) {
            HeapObject::Module(module) => module,
            other => panic!("expected module, found {}", other.type_name()),
        }
    }

    pub fn module_mut(&mut self, handle: GcHandle) -> &mut Module {
        match self.get_mut(handle) {
            HeapObject::Module(module) => module,
            other => panic!("expected module, found {}", other.type_name()),
        }
    }

    pub fn native(&self, handle: GcHandle) -> NativeFunction {
        match self.get(handle) {
            HeapObject::Native(native) => *native,
            other => panic!("expected native, found {}", other.type_name()),
        }
    }

    pub fn bound_method(&self, handle: GcHandle) -> &BoundMethod {
        match self.get(handle) {
            HeapObject::BoundMethod(bound) => bound,
            other => panic!("expected bound method, found {}", other.type_name()),
        }
    }

    pub fn bound_native(&self, handle: GcHandle) -> &BoundNative {
        match self.get(handle) {
            HeapObject::BoundNative(bound) => bound,
            other => panic!("expected bound native, found {}", other.type_name()),
        }
    }

    /// The runtime type label of a value, for error messages.
    pub fn type_name(&self, value: Value) -> &'static str {
        match value {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Obj(handle) => self.get(handle).type_name(),
        }
    }

    // ---- temp roots ----

    /// Keeps `value` reachable across allocations. Strictly LIFO with
    /// [`Self::pop_temp_root`].
    pub fn push_temp_root(&mut self, value: Value) {
        self.temp_roots.push(value);
    }

    pub fn pop_temp_root(&mut self) {
        self.temp_roots
            .pop()
            .expect("pop_temp_root without matching push");
    }

    // ---- display ----

    /// Text form used by `print` and by string concatenation. Strings render
    /// raw (no quotes), numbers in shortest round-trip form.
    pub fn display_value(&self, value: Value) -> String {
        match value {
            Value::Nil => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(n),
            Value::Obj(handle) => self.display_object(handle),
        }
    }

    fn display_function(&self, function: GcHandle) -> String {
        match self.function(function).name {
            Some(name) => format!("<fn {}>", self.string_lossy(name)),
            None => "<script>".to_string(),
        }
    }

    fn display_object(&self, handle: GcHandle) -> String {
        match self.get(handle) {
            HeapObject::Str { .. } => self.string_lossy(handle).into_owned(),
            HeapObject::Function(_) => self.display_function(handle),
            HeapObject::Closure(closure) => self.display_function(closure.function),
            HeapObject::Upvalue(_) => "upvalue".to_string(),
            HeapObject::Class(class) => self.string_lossy(class.name).into_owned(),
            HeapObject::Instance(instance) => format!(
                "{} instance",
                self.string_lossy(self.class(instance.class).name)
            ),
            HeapObject::BoundMethod(bound) => {
                self.display_function(self.closure(bound.method).function)
            }
            HeapObject::BoundNative(_) => "<native method>".to_string(),
            HeapObject::Native(_) => "<native fn>".to_string(),
            HeapObject::List(items) => {
                let rendered: Vec<String> =
                    items.iter().map(|item| self.display_value(*item)).collect();
                format!("[{}]", rendered.join(", "))
            }
            HeapObject::Map(table) => {
                let rendered: Vec<String> = table
                    .iter()
                    .map(|(key, value)| {
                        format!(
                            "{}: {}",
                            self.string_lossy(key),
                            self.display_value(value)
                        )
                    })
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            HeapObject::Module(module) => {
                format!("<module {}>", self.string_lossy(module.name))
            }
        }
    }

    // ---- collection ----

    /// Stop-the-world mark-and-sweep over the arena.
    pub fn collect(&mut self, roots: &GcRoots) {
        self.gray.clear();

        for value in roots.stack {
            if let Value::Obj(handle) = value {
                self.gray.push(*handle);
            }
        }
        for handle in roots.handles {
            self.gray.push(*handle);
        }
        for table in roots.tables {
            for (key, value) in table.iter() {
                self.gray.push(key);
                if let Value::Obj(handle) = value {
                    self.gray.push(handle);
                }
            }
        }
        for index in 0..self.temp_roots.len() {
            if let Value::Obj(handle) = self.temp_roots[index] {
                self.gray.push(handle);
            }
        }

        self.trace_references();
        self.sweep();

        let entries = &self.entries;
        self.strings
            .remove_dead_keys(|key| match entries.get(key.index() as usize) {
                Some(slot) => slot.is_some(),
                None => false,
            });

        self.total_collections += 1;
        self.next_gc = self.bytes_allocated * HEAP_GROW_FACTOR;
    }

    /// Drains the gray worklist. An object is marked when popped; its
    /// outgoing references are then pushed, so shared and cyclic structures
    /// are visited once.
    fn trace_references(&mut self) {
        while let Some(handle) = self.gray.pop() {
            let index = handle.index() as usize;
            match self.entries.get_mut(index) {
                Some(Some(entry)) if !entry.marked => entry.marked = true,
                _ => continue,
            }

            let entry = self.entries[index]
                .as_ref()
                .expect("gray object disappeared mid-trace");
            match &entry.object {
                HeapObject::Str { .. } | HeapObject::Native(_) => {}
                HeapObject::Function(function) => {
                    if let Some(name) = function.name {
                        self.gray.push(name);
                    }
                    for constant in &function.chunk.constants {
                        if let Value::Obj(child) = constant {
                            self.gray.push(*child);
                        }
                    }
                }
                HeapObject::Closure(closure) => {
                    self.gray.push(closure.function);
                    for upvalue in &closure.upvalues {
                        self.gray.push(*upvalue);
                    }
                    if let Some(module) = closure.module {
                        self.gray.push(module);
                    }
                }
                HeapObject::Upvalue(upvalue) => {
                    if let Upvalue::Closed(Value::Obj(child)) = upvalue {
                        self.gray.push(*child);
                    }
                }
                HeapObject::Class(class) => {
                    self.gray.push(class.name);
                    for (key, value) in class.methods.iter() {
                        self.gray.push(key);
                        if let Value::Obj(child) = value {
                            self.gray.push(child);
                        }
                    }
                }
                HeapObject::Instance(instance) => {
                    self.gray.push(instance.class);
                    for (key, value) in instance.fields.iter() {
                        self.gray.push(key);
                        if let Value::Obj(child) = value {
                            self.gray.push(child);
                        }
                    }
                }
                HeapObject::BoundMethod(bound) => {
                    if let Value::Obj(receiver) = bound.receiver {
                        self.gray.push(receiver);
                    }
                    self.gray.push(bound.method);
                }
                HeapObject::BoundNative(bound) => {
                    if let Value::Obj(receiver) = bound.receiver {
                        self.gray.push(receiver);
                    }
                    self.gray.push(bound.native);
                }
                HeapObject::List(items) => {
                    for item in items {
                        if let Value::Obj(child) = item {
                            self.gray.push(*child);
                        }
                    }
                }
                HeapObject::Map(table) => {
                    for (key, value) in table.iter() {
                        self.gray.push(key);
                        if let Value::Obj(child) = value {
                            self.gray.push(child);
                        }
                    }
                }
                HeapObject::Module(module) => {
                    self.gray.push(module.name);
                    for (key, value) in module.globals.iter().chain(module.exports.iter()) {
                        self.gray.push(key);
                        if let Value::Obj(child) = value {
                            self.gray.push(child);
                        }
                    }
                }
            }
        }
    }

    fn sweep(&mut self) {
        for index in 0..self.entries.len() {
            let freed = match &mut self.entries[index] {
                Some(entry) if entry.marked => {
                    entry.marked = false;
                    None
                }
                Some(entry) => Some(entry.object.size_estimate()),
                None => None,
            };
            if let Some(bytes) = freed {
                self.bytes_allocated = self.bytes_allocated.saturating_sub(bytes);
                self.entries[index] = None;
                self.free_list.push(index as u32);
            }
        }
    }
}
