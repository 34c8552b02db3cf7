//! The single-pass Cmel compiler: a Pratt parser that emits bytecode as it
//! goes, with no AST in between. Function compilation states stack up as
//! declarations nest; identifier resolution walks that stack to wire
//! locals, upvalues, and globals.

use std::collections::HashSet;

use crate::bytecode::chunk::Chunk;
use crate::bytecode::op_code::OpCode;
use crate::frontend::diagnostics::Diagnostic;
use crate::frontend::scanner::Scanner;
use crate::frontend::token::Token;
use crate::frontend::token_type::TokenType;
use crate::runtime::gc::{GcHandle, Heap};
use crate::runtime::object::{Function, HeapObject};
use crate::runtime::value::Value;

mod expression;
mod precedence;
mod scope;
mod statement;


use scope::{ClassState, FunctionKind, FunctionState, Local, UpvalueRef, MAX_LOCALS, MAX_UPVALUES};

/// Compiles a source string into a top-level function (arity 0, unnamed).
/// Heap access is needed throughout: identifiers and string literals are
/// interned, and each compiled function becomes a heap object.
pub fn compile(source: &str, heap: &mut Heap) -> Result<GcHandle, Vec<Diagnostic>> {
    let mut compiler = Compiler::new(source, heap);
    compiler.advance();
    while !compiler.match_token(TokenType::Eof) {
        compiler.declaration();
    }
    let (handle, _) = compiler.end_function();
    if compiler.diagnostics.is_empty() {
        Ok(handle)
    } else {
        Err(compiler.diagnostics)
    }
}

pub struct Compiler<'src, 'heap> {
    scanner: Scanner<'src>,
    heap: &'heap mut Heap,
    previous: Token,
    current: Token,
    panic_mode: bool,
    diagnostics: Vec<Diagnostic>,
    functions: Vec<FunctionState>,
    classes: Vec<ClassState>,
    const_globals: HashSet<String>,
}

impl<'src, 'heap> Compiler<'src, 'heap> {
    fn new(source: &'src str, heap: &'heap mut Heap) -> Self {
        Self {
            scanner: Scanner::new(source),
            heap,
            previous: Token::empty(),
            current: Token::empty(),
            panic_mode: false,
            diagnostics: Vec::new(),
            functions: vec![FunctionState::new(FunctionKind::Script, None)],
            classes: Vec::new(),
            const_globals: HashSet::new(),
        }
    }

    // ---- token plumbing ----

    pub(super) fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, Token::empty());
        loop {
            self.current = self.scanner.scan_token();
            if self.current.token_type != TokenType::Error {
                break;
            }
            let message = self.current.lexeme.clone();
            self.error_at_current(&message);
        }
    }

    pub(super) fn consume(&mut self, token_type: TokenType, message: &str) {
        if self.current.token_type == token_type {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    pub(super) fn check(&self, token_type: TokenType) -> bool {
        self.current.token_type == token_type
    }

    pub(super) fn match_token(&mut self, token_type: TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ---- errors ----

    pub(super) fn error(&mut self, message: &str) {
        let token = self.previous.clone();
        self.error_at(&token, message);
    }

    pub(super) fn error_at_current(&mut self, message: &str) {
        let token = self.current.clone();
        self.error_at(&token, message);
    }

    fn error_at(&mut self, token: &Token, message: &str) {
        // While panicking, swallow everything until a statement boundary.
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.diagnostics.push(Diagnostic::at_token(token, message));
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.token_type != TokenType::Eof {
            if self.previous.token_type == TokenType::Semicolon {
                return;
            }
            match self.current.token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::Const
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return
                | TokenType::Import
                | TokenType::Export
                | TokenType::Break => return,
                _ => self.advance(),
            }
        }
    }

    // ---- emit helpers ----

    pub(super) fn state(&self) -> &FunctionState {
        self.functions.last().expect("no function under compilation")
    }

    pub(super) fn state_mut(&mut self) -> &mut FunctionState {
        self.functions
            .last_mut()
            .expect("no function under compilation")
    }

    pub(super) fn current_chunk(&self) -> &Chunk {
        &self.state().chunk
    }

    pub(super) fn current_chunk_mut(&mut self) -> &mut Chunk {
        &mut self.state_mut().chunk
    }

    pub(super) fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.current_chunk_mut().write(byte, line);
    }

    pub(super) fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op as u8);
    }

    pub(super) fn emit_ops(&mut self, first: OpCode, second: OpCode) {
        self.emit_op(first);
        self.emit_op(second);
    }

    pub(super) fn emit_constant(&mut self, value: Value) {
        let line = self.previous.line;
        if self.current_chunk_mut().write_constant(value, line).is_none() {
            self.error("Too many constants in one chunk.");
        }
    }

    /// Adds a constant addressed by a one-byte operand (names, function
    /// objects). The 24-bit long form only exists for value loads.
    pub(super) fn make_constant_u8(&mut self, value: Value) -> u8 {
        match self.current_chunk_mut().add_constant(value) {
            Some(index) if index <= u8::MAX as usize => index as u8,
            _ => {
                self.error("Too many constants in one chunk.");
                0
            }
        }
    }

    pub(super) fn identifier_constant(&mut self, name: &str) -> u8 {
        let handle = self.heap.intern_str(name);
        self.make_constant_u8(Value::Obj(handle))
    }

    /// Interned-string constant addressed by a one-byte operand (import
    /// paths, method names used by `Invoke`).
    pub(super) fn string_constant(&mut self, text: &str) -> u8 {
        let handle = self.heap.intern_str(text);
        self.make_constant_u8(Value::Obj(handle))
    }

    pub(super) fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.current_chunk().code.len() - 2
    }

    pub(super) fn patch_jump(&mut self, offset: usize) {
        // -2 adjusts for the operand itself.
        let jump = self.current_chunk().code.len() - offset - 2;
        if jump > u16::MAX as usize {
            self.error("Too much code to jump over.");
        }
        let code = &mut self.current_chunk_mut().code;
        code[offset] = ((jump >> 8) & 0xff) as u8;
        code[offset + 1] = (jump & 0xff) as u8;
    }

    pub(super) fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::OpLoop);
        let offset = self.current_chunk().code.len() - loop_start + 2;
        if offset > u16::MAX as usize {
            self.error("Loop body too large.");
        }
        self.emit_byte(((offset >> 8) & 0xff) as u8);
        self.emit_byte((offset & 0xff) as u8);
    }

    fn emit_return(&mut self) {
        if self.state().kind == FunctionKind::Initializer {
            self.emit_op(OpCode::OpGetLocal);
            self.emit_byte(0);
        } else {
            self.emit_op(OpCode::OpNil);
        }
        self.emit_op(OpCode::OpReturn);
    }

    /// Finishes the innermost function: emits its implicit return, moves it
    /// into the heap, and hands back the upvalue records the enclosing
    /// `OpClosure` must encode.
    fn end_function(&mut self) -> (GcHandle, Vec<UpvalueRef>) {
        self.emit_return();
        let state = self
            .functions
            .pop()
            .expect("no function under compilation");
        let function = Function {
            arity: state.arity,
            upvalue_count: state.upvalues.len(),
            name: state.name,
            chunk: state.chunk,
        };
        let handle = self.heap.alloc(HeapObject::Function(function));
        (handle, state.upvalues)
    }

    // ---- scopes and variables ----

    pub(super) fn begin_scope(&mut self) {
        self.state_mut().scope_depth += 1;
    }

    pub(super) fn end_scope(&mut self) {
        let state = self.state_mut();
        state.scope_depth -= 1;
        let target = state.scope_depth;

        let mut captured_flags = Vec::new();
        while let Some(local) = state.locals.last() {
            match local.depth {
                Some(depth) if depth > target => {
                    captured_flags.push(local.is_captured);
                    state.locals.pop();
                }
                _ => break,
            }
        }
        for captured in captured_flags {
            if captured {
                self.emit_op(OpCode::OpCloseUpvalue);
            } else {
                self.emit_op(OpCode::OpPop);
            }
        }
    }

    /// Emits pops for every local deeper than `target_depth` without
    /// forgetting them; `break` uses this to unwind mid-scope.
    pub(super) fn emit_pops_to_depth(&mut self, target_depth: usize) {
        let mut captured_flags = Vec::new();
        for local in self.state().locals.iter().rev() {
            match local.depth {
                Some(depth) if depth > target_depth => captured_flags.push(local.is_captured),
                _ => break,
            }
        }
        for captured in captured_flags {
            if captured {
                self.emit_op(OpCode::OpCloseUpvalue);
            } else {
                self.emit_op(OpCode::OpPop);
            }
        }
    }

    fn add_local(&mut self, name: String, is_const: bool) {
        if self.state().locals.len() >= MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }
        self.state_mut().locals.push(Local {
            name,
            depth: None,
            is_captured: false,
            is_const,
        });
    }

    pub(super) fn declare_variable(&mut self, is_const: bool) {
        if self.state().scope_depth == 0 {
            return;
        }
        let name = self.previous.lexeme.clone();

        let state = self.state();
        let mut duplicate = false;
        for local in state.locals.iter().rev() {
            if let Some(depth) = local.depth {
                if depth < state.scope_depth {
                    break;
                }
            }
            if local.name == name {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }
        self.add_local(name, is_const);
    }

    pub(super) fn parse_variable(&mut self, message: &str, is_const: bool) -> u8 {
        self.consume(TokenType::Identifier, message);
        self.declare_variable(is_const);
        if self.state().scope_depth > 0 {
            return 0;
        }
        let name = self.previous.lexeme.clone();
        self.identifier_constant(&name)
    }

    pub(super) fn mark_initialized(&mut self) {
        let state = self.state_mut();
        if state.scope_depth == 0 {
            return;
        }
        let depth = state.scope_depth;
        if let Some(local) = state.locals.last_mut() {
            local.depth = Some(depth);
        }
    }

    pub(super) fn define_variable(&mut self, global: u8, is_const: bool, name: &str) {
        if self.state().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        if is_const {
            self.const_globals.insert(name.to_string());
        }
        self.emit_op(OpCode::OpDefineGlobal);
        self.emit_byte(global);
    }

    fn resolve_local(&mut self, func_index: usize, name: &str) -> Option<u8> {
        let mut found: Option<(usize, bool)> = None;
        for (index, local) in self.functions[func_index].locals.iter().enumerate().rev() {
            if local.name == name {
                found = Some((index, local.depth.is_none()));
                break;
            }
        }
        let (index, uninitialized) = found?;
        if uninitialized {
            self.error("Can't read local variable in its own initializer.");
        }
        Some(index as u8)
    }

    fn resolve_upvalue(&mut self, func_index: usize, name: &str) -> Option<u8> {
        if func_index == 0 {
            return None;
        }

        if let Some(local) = self.resolve_local(func_index - 1, name) {
            let enclosing = &mut self.functions[func_index - 1];
            enclosing.locals[local as usize].is_captured = true;
            let is_const = enclosing.locals[local as usize].is_const;
            return Some(self.add_upvalue(func_index, local, true, is_const));
        }

        if let Some(upvalue) = self.resolve_upvalue(func_index - 1, name) {
            let is_const = self.functions[func_index - 1].upvalues[upvalue as usize].is_const;
            return Some(self.add_upvalue(func_index, upvalue, false, is_const));
        }

        None
    }

    fn add_upvalue(&mut self, func_index: usize, index: u8, is_local: bool, is_const: bool) -> u8 {
        let upvalues = &self.functions[func_index].upvalues;
        for (existing_index, existing) in upvalues.iter().enumerate() {
            if existing.index == index && existing.is_local == is_local {
                return existing_index as u8;
            }
        }
        if upvalues.len() >= MAX_UPVALUES {
            self.error("Too many closure variables in function.");
            return 0;
        }
        let upvalues = &mut self.functions[func_index].upvalues;
        upvalues.push(UpvalueRef {
            index,
            is_local,
            is_const,
        });
        (upvalues.len() - 1) as u8
    }

    /// Emits the load or store for a name, resolving local → upvalue →
    /// global in that order. Assignment through a `const` binding is
    /// rejected at any resolution level.
    pub(super) fn named_variable(&mut self, name: &str, can_assign: bool) {
        let func_index = self.functions.len() - 1;
        let (get_op, set_op, arg, is_const) =
            if let Some(slot) = self.resolve_local(func_index, name) {
                let is_const = self.functions[func_index].locals[slot as usize].is_const;
                (OpCode::OpGetLocal, OpCode::OpSetLocal, slot, is_const)
            } else if let Some(index) = self.resolve_upvalue(func_index, name) {
                let is_const = self.functions[func_index].upvalues[index as usize].is_const;
                (OpCode::OpGetUpvalue, OpCode::OpSetUpvalue, index, is_const)
            } else {
                let arg = self.identifier_constant(name);
                let is_const = self.const_globals.contains(name);
                (OpCode::OpGetGlobal, OpCode::OpSetGlobal, arg, is_const)
            };

        if can_assign && self.match_token(TokenType::Equal) {
            if is_const {
                self.error("Can't assign to constant variable.");
            }
            self.expression();
            self.emit_op(set_op);
            self.emit_byte(arg);
        } else {
            self.emit_op(get_op);
            self.emit_byte(arg);
        }
    }

    // ---- declarations ----

    pub(super) fn declaration(&mut self) {
        if self.match_token(TokenType::Export) {
            self.export_declaration();
        } else if self.match_token(TokenType::Class) {
            self.class_declaration();
        } else if self.match_token(TokenType::Fun) {
            self.fun_declaration();
        } else if self.match_token(TokenType::Var) {
            self.var_declaration(false);
        } else if self.match_token(TokenType::Const) {
            self.var_declaration(true);
        } else {
            self.statement();
        }

        if self.panic_mode {
            self.synchronize();
        }
    }

    fn export_declaration(&mut self) {
        if self.state().scope_depth > 0 {
            self.error("Can't export a local declaration.");
        }
        let name = if self.match_token(TokenType::Var) {
            self.var_declaration(false)
        } else if self.match_token(TokenType::Const) {
            self.var_declaration(true)
        } else if self.match_token(TokenType::Fun) {
            self.fun_declaration()
        } else if self.match_token(TokenType::Class) {
            self.class_declaration()
        } else {
            self.error_at_current("Expect declaration after 'export'.");
            None
        };

        if let Some(name) = name {
            let index = self.identifier_constant(&name);
            self.emit_op(OpCode::OpExport);
            self.emit_byte(index);
        }
    }

    fn var_declaration(&mut self, is_const: bool) -> Option<String> {
        let global = self.parse_variable("Expect variable name.", is_const);
        let name = self.previous.lexeme.clone();

        if self.match_token(TokenType::Equal) {
            self.expression();
        } else {
            if is_const {
                self.error("Const variable must be initialized.");
            }
            self.emit_op(OpCode::OpNil);
        }
        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        );
        self.define_variable(global, is_const, &name);
        Some(name)
    }

    fn fun_declaration(&mut self) -> Option<String> {
        let global = self.parse_variable("Expect function name.", false);
        let name = self.previous.lexeme.clone();
        // Defined before the body compiles, so the function can recurse.
        self.mark_initialized();
        self.function(FunctionKind::Function, Some(name.clone()));
        self.define_variable(global, false, &name);
        Some(name)
    }

    pub(super) fn function(&mut self, kind: FunctionKind, name: Option<String>) {
        let name_handle = name.map(|n| self.heap.intern_str(&n));
        self.functions.push(FunctionState::new(kind, name_handle));
        self.begin_scope();

        self.consume(TokenType::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenType::RightParen) {
            loop {
                self.state_mut().arity += 1;
                if self.state().arity > 255 {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                let param = self.parse_variable("Expect parameter name.", false);
                self.define_variable(param, false, "");
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.");
        self.consume(TokenType::LeftBrace, "Expect '{' before function body.");
        self.block();

        let (handle, upvalues) = self.end_function();
        let index = self.make_constant_u8(Value::Obj(handle));
        self.emit_op(OpCode::OpClosure);
        self.emit_byte(index);
        for upvalue in upvalues {
            self.emit_byte(upvalue.is_local as u8);
            self.emit_byte(upvalue.index);
        }
    }

    fn class_declaration(&mut self) -> Option<String> {
        self.consume(TokenType::Identifier, "Expect class name.");
        let name = self.previous.lexeme.clone();
        let name_const = self.identifier_constant(&name);
        self.declare_variable(false);
        self.emit_op(OpCode::OpClass);
        self.emit_byte(name_const);
        self.define_variable(name_const, false, &name);

        self.classes.push(ClassState {
            has_superclass: false,
        });

        if self.match_token(TokenType::Less) {
            self.consume(TokenType::Identifier, "Expect superclass name.");
            let superclass_name = self.previous.lexeme.clone();
            self.named_variable(&superclass_name, false);
            if superclass_name == name {
                self.error("A class can't inherit from itself.");
            }

            // A scope around the class body defines `super`; methods capture
            // it as an upvalue.
            self.begin_scope();
            self.add_local("super".to_string(), false);
            self.mark_initialized();

            self.named_variable(&name, false);
            self.emit_op(OpCode::OpInherit);
            self.classes
                .last_mut()
                .expect("class state just pushed")
                .has_superclass = true;
        }

        self.named_variable(&name, false);
        self.consume(TokenType::LeftBrace, "Expect '{' before class body.");
        while !self.check(TokenType::RightBrace) && !self.check(TokenType::Eof) {
            self.method();
        }
        self.consume(TokenType::RightBrace, "Expect '}' after class body.");
        self.emit_op(OpCode::OpPop);

        if self
            .classes
            .last()
            .expect("class state still on stack")
            .has_superclass
        {
            self.end_scope();
        }
        self.classes.pop();
        Some(name)
    }

    fn method(&mut self) {
        self.consume(TokenType::Identifier, "Expect method name.");
        let name = self.previous.lexeme.clone();
        let name_const = self.identifier_constant(&name);
        let kind = if name == "init" {
            FunctionKind::Initializer
        } else {
            FunctionKind::Method
        };
        self.function(kind, Some(name));
        self.emit_op(OpCode::OpMethod);
        self.emit_byte(name_const);
    }
}
