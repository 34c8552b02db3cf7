//! The Cmel virtual machine: a stack machine executing compiled chunks
//! through call frames, with closures sharing upvalues, class dispatch,
//! and per-module global namespaces.

use crate::bytecode::compiler::compile;
use crate::bytecode::op_code::OpCode;
use crate::frontend::diagnostics::Diagnostic;
use crate::runtime::builtins;
use crate::runtime::frame::Frame;
use crate::runtime::gc::{GcHandle, GcRoots, Heap};
use crate::runtime::object::{Closure, HeapObject};
use crate::runtime::table::Table;
use crate::runtime::value::Value;

mod binary_ops;
mod dispatch;
mod function_call;
mod index_ops;
mod modules;


pub const FRAMES_MAX: usize = 64;
/// The stack never reallocates, so open-upvalue slot indices stay stable
/// for as long as the slots are live.
pub const STACK_MAX: usize = FRAMES_MAX * 256;

/// Why an `interpret` call failed; the CLI maps these to exit codes 65/70.
#[derive(Debug)]
pub enum InterpretError {
    Compile(Vec<Diagnostic>),
    Runtime(String),
}

pub(super) enum Flow {
    Continue,
    Halt,
}

enum Output {
    Stdout,
    Capture(Vec<u8>),
}

pub struct Vm {
    pub heap: Heap,
    stack: Vec<Value>,
    sp: usize,
    frames: Vec<Frame>,
    globals: Table,
    /// Canonical path string -> module object; a module body runs once.
    modules: Table,
    /// Paths currently being loaded, for circular-import detection.
    loading: Vec<GcHandle>,
    /// Open upvalues ordered by descending stack slot.
    open_upvalues: Vec<GcHandle>,
    init_string: GcHandle,
    string_class: GcHandle,
    number_class: GcHandle,
    list_class: GcHandle,
    map_class: GcHandle,
    pub(crate) test_mode: bool,
    pub(crate) test_failures: Vec<String>,
    pub(crate) current_test: Option<String>,
    out: Output,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let init_string = heap.intern_str("init");

        let mut globals = Table::new();
        builtins::define_natives(&mut heap, &mut globals);

        let string_class = builtins::primitive_class(&mut heap, "String", builtins::STRING_METHODS);
        let number_class = builtins::primitive_class(&mut heap, "Number", builtins::NUMBER_METHODS);
        let list_class = builtins::primitive_class(&mut heap, "List", builtins::LIST_METHODS);
        let map_class = builtins::primitive_class(&mut heap, "Map", builtins::MAP_METHODS);

        Self {
            heap,
            stack: vec![Value::Nil; STACK_MAX],
            sp: 0,
            frames: Vec::with_capacity(FRAMES_MAX),
            globals,
            modules: Table::new(),
            loading: Vec::new(),
            open_upvalues: Vec::new(),
            init_string,
            string_class,
            number_class,
            list_class,
            map_class,
            test_mode: false,
            test_failures: Vec::new(),
            current_test: None,
            out: Output::Stdout,
        }
    }

    /// Compiles and runs a source string to completion.
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let function = compile(source, &mut self.heap).map_err(InterpretError::Compile)?;

        self.push(Value::Obj(function))
            .map_err(|message| InterpretError::Runtime(self.runtime_error(&message)))?;
        let closure = self.gc_alloc(HeapObject::Closure(Closure {
            function,
            upvalues: Vec::new(),
            module: None,
        }));
        self.pop();
        self.push(Value::Obj(closure))
            .map_err(|message| InterpretError::Runtime(self.runtime_error(&message)))?;

        let result = self
            .call_closure(closure, 0)
            .and_then(|_| self.run(self.frames.len()));
        match result {
            Ok(()) => {
                // Discard the script's implicit return value.
                self.pop();
                Ok(())
            }
            Err(message) => Err(InterpretError::Runtime(self.runtime_error(&message))),
        }
    }

    /// Executes frames until the frame count drops below `floor`. Raw error
    /// messages propagate; the caller of the outermost `run` turns them into
    /// a formatted trace exactly once.
    pub(crate) fn run(&mut self, floor: usize) -> Result<(), String> {
        loop {
            match self.step(floor) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt) => return Ok(()),
                Err(message) => {
                    if self.test_mode {
                        if self.divert_test_failure(message, floor)? {
                            return Ok(());
                        }
                    } else {
                        return Err(message);
                    }
                }
            }
        }
    }

    fn step(&mut self, floor: usize) -> Result<Flow, String> {
        let op = OpCode::from(self.read_byte());
        self.dispatch(op, floor)
    }

    /// Test-mode error diversion: the failing frame unwinds, `nil` stands in
    /// for its result, and execution resumes in the caller. The stack is not
    /// reset.
    fn divert_test_failure(&mut self, message: String, floor: usize) -> Result<bool, String> {
        self.test_failures.push(message);
        let frame = self.frames.pop().expect("error with no active frame");
        self.close_upvalues(frame.slot_base);
        self.sp = frame.slot_base;
        self.push(Value::Nil)?;
        Ok(self.frames.len() < floor)
    }

    /// Formats a runtime error with its stack trace, then resets the VM.
    pub(crate) fn runtime_error(&mut self, message: &str) -> String {
        let mut rendered = String::new();
        rendered.push_str(message);
        rendered.push('\n');

        for frame in self.frames.iter().rev() {
            let closure = self.heap.closure(frame.closure);
            let function = self.heap.function(closure.function);
            let line = function.chunk.line_at(frame.ip.saturating_sub(1));
            match function.name {
                Some(name) => {
                    rendered.push_str(&format!(
                        "[line {}] in {}\n",
                        line,
                        self.heap.string_lossy(name)
                    ));
                }
                None => {
                    rendered.push_str(&format!("[line {}] in script\n", line));
                }
            }
        }

        self.reset_stack();
        rendered
    }

    fn reset_stack(&mut self) {
        self.sp = 0;
        self.frames.clear();
        self.open_upvalues.clear();
        self.loading.clear();
    }

    // ---- stack ----

    pub(crate) fn push(&mut self, value: Value) -> Result<(), String> {
        if self.sp == STACK_MAX {
            return Err("Stack overflow.".to_string());
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Value {
        debug_assert!(self.sp > 0, "pop on empty stack");
        self.sp -= 1;
        self.stack[self.sp]
    }

    pub(crate) fn peek(&self, distance: usize) -> Value {
        self.stack[self.sp - 1 - distance]
    }

    /// A native's `index`th argument; for bound natives the receiver is the
    /// last one.
    pub(crate) fn native_arg(&self, arg_count: usize, index: usize) -> Value {
        self.stack[self.sp - arg_count + index]
    }

    // ---- instruction reading ----

    fn read_byte(&mut self) -> u8 {
        let frame = self.frames.last_mut().expect("no active frame");
        let byte = self.heap.closure_chunk(frame.closure).code[frame.ip];
        frame.ip += 1;
        byte
    }

    fn read_u16(&mut self) -> u16 {
        let high = self.read_byte() as u16;
        let low = self.read_byte() as u16;
        (high << 8) | low
    }

    fn read_u24(&mut self) -> usize {
        let b0 = self.read_byte() as usize;
        let b1 = self.read_byte() as usize;
        let b2 = self.read_byte() as usize;
        b0 | (b1 << 8) | (b2 << 16)
    }

    fn constant_at(&self, index: usize) -> Value {
        let frame = self.frames.last().expect("no active frame");
        self.heap.closure_chunk(frame.closure).constants[index]
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_byte() as usize;
        self.constant_at(index)
    }

    fn read_string(&mut self) -> GcHandle {
        let value = self.read_constant();
        self.heap
            .as_string(value)
            .expect("name constant must be an interned string")
    }

    // ---- namespaces ----

    /// The module the executing closure belongs to, if any. Global reads and
    /// writes inside a module body (and inside functions defined there) go
    /// to that module's namespace.
    pub(super) fn current_module(&self) -> Option<GcHandle> {
        self.frames
            .last()
            .and_then(|frame| self.heap.closure(frame.closure).module)
    }

    pub(super) fn get_current_global(&self, name: GcHandle) -> Option<Value> {
        let hash = self.heap.string_hash(name);
        match self.current_module() {
            Some(module) => self.heap.module(module).globals.get(name, hash),
            None => self.globals.get(name, hash),
        }
    }

    /// Returns `true` when the name was not previously defined.
    pub(super) fn set_current_global(&mut self, name: GcHandle, value: Value) -> bool {
        let hash = self.heap.string_hash(name);
        match self.current_module() {
            Some(module) => self.heap.module_mut(module).globals.set(name, hash, value),
            None => self.globals.set(name, hash, value),
        }
    }

    pub(super) fn delete_current_global(&mut self, name: GcHandle) {
        let hash = self.heap.string_hash(name);
        match self.current_module() {
            Some(module) => {
                self.heap.module_mut(module).globals.delete(name, hash);
            }
            None => {
                self.globals.delete(name, hash);
            }
        }
    }

    // ---- allocation ----

    /// Heap allocation from inside the running VM: collects first when the
    /// threshold was crossed, so every allocation site is a safe GC point.
    pub(crate) fn gc_alloc(&mut self, object: HeapObject) -> GcHandle {
        if self.heap.should_collect() {
            self.collect_garbage();
        }
        self.heap.alloc(object)
    }

    /// Interning counterpart of [`Self::gc_alloc`].
    pub(crate) fn intern(&mut self, bytes: &[u8]) -> GcHandle {
        if self.heap.should_collect() {
            self.collect_garbage();
        }
        self.heap.intern(bytes)
    }

    fn collect_garbage(&mut self) {
        let mut handles: Vec<GcHandle> = Vec::new();
        handles.extend(self.frames.iter().map(|frame| frame.closure));
        handles.extend(self.open_upvalues.iter().copied());
        handles.push(self.init_string);
        handles.extend([
            self.string_class,
            self.number_class,
            self.list_class,
            self.map_class,
        ]);
        handles.extend(self.loading.iter().copied());

        let tables = [&self.globals, &self.modules];
        let roots = GcRoots {
            stack: &self.stack[..self.sp],
            handles: &handles,
            tables: &tables,
        };
        self.heap.collect(&roots);
    }

    /// Name set by `__setCurrentTest`, for embedders reporting failures.
    pub fn current_test(&self) -> Option<&str> {
        self.current_test.as_deref()
    }

    /// Messages collected while test mode diverted runtime errors.
    pub fn test_failures(&self) -> &[String] {
        &self.test_failures
    }

    // ---- output ----

    /// Redirects `print` into an internal buffer; tests read it back with
    /// [`Self::take_output`].
    pub fn capture_output(&mut self) {
        self.out = Output::Capture(Vec::new());
    }

    pub fn take_output(&mut self) -> String {
        match &mut self.out {
            Output::Capture(buffer) => {
                String::from_utf8_lossy(&std::mem::take(buffer)).into_owned()
            }
            Output::Stdout => String::new(),
        }
    }

    pub(super) fn write_line(&mut self, text: &str) {
        match &mut self.out {
            Output::Stdout => println!("{}", text),
            Output::Capture(buffer) => {
                buffer.extend_from_slice(text.as_bytes());
                buffer.push(b'\n');
            }
        }
    }
}
