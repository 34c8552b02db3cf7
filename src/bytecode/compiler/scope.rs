use crate::bytecode::chunk::Chunk;
use crate::runtime::gc::GcHandle;

/// Hard limit on locals and upvalues per function: slot operands are one
/// byte.
pub(super) const MAX_LOCALS: usize = 256;
pub(super) const MAX_UPVALUES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FunctionKind {
    Script,
    Function,
    Method,
    Initializer,
}

/// A block-scoped variable slot. `depth` is `None` between declaration and
/// definition, which is what makes `var a = a;` detectable.
#[derive(Debug)]
pub(super) struct Local {
    pub name: String,
    pub depth: Option<usize>,
    pub is_captured: bool,
    pub is_const: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct UpvalueRef {
    pub index: u8,
    pub is_local: bool,
    pub is_const: bool,
}

/// An enclosing loop: where `break` jumps get collected and how deep the
/// loop's scope is (so `break` can discard inner locals).
#[derive(Debug)]
pub(super) struct LoopState {
    pub scope_depth: usize,
    pub break_jumps: Vec<usize>,
}

/// Per-class compile state, stacked for nested class declarations.
#[derive(Debug)]
pub(super) struct ClassState {
    pub has_superclass: bool,
}

/// Everything the compiler tracks for one function being compiled. These
/// stack up as function declarations nest; upvalue resolution walks the
/// stack outward.
#[derive(Debug)]
pub(super) struct FunctionState {
    pub kind: FunctionKind,
    pub name: Option<GcHandle>,
    pub arity: usize,
    pub chunk: Chunk,
    pub locals: Vec<Local>,
    pub upvalues: Vec<UpvalueRef>,
    pub scope_depth: usize,
    pub loops: Vec<LoopState>,
}

impl FunctionState {
    pub fn new(kind: FunctionKind, name: Option<GcHandle>) -> Self {
        // Slot 0 belongs to the callee; methods expose it as `this`.
        let slot_zero = Local {
            name: match kind {
                FunctionKind::Method | FunctionKind::Initializer => "this".to_string(),
                _ => String::new(),
            },
            depth: Some(0),
            is_captured: false,
            is_const: false,
        };
        Self {
            kind,
            name,
            arity: 0,
            chunk: Chunk::new(),
            locals: vec![slot_zero],
            upvalues: Vec::new(),
            scope_depth: 0,
            loops: Vec::new(),
        }
    }
}
