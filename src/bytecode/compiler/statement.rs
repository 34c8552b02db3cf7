use crate::bytecode::compiler::scope::{FunctionKind, LoopState};
use crate::bytecode::compiler::Compiler;
use crate::bytecode::op_code::OpCode;
use crate::frontend::token_type::TokenType;

impl Compiler<'_, '_> {
    pub(super) fn statement(&mut self) {
        if self.match_token(TokenType::Print) {
            self.print_statement();
        } else if self.match_token(TokenType::If) {
            self.if_statement();
        } else if self.match_token(TokenType::While) {
            self.while_statement();
        } else if self.match_token(TokenType::For) {
            self.for_statement();
        } else if self.match_token(TokenType::Return) {
            self.return_statement();
        } else if self.match_token(TokenType::Break) {
            self.break_statement();
        } else if self.match_token(TokenType::Import) {
            self.import_statement();
        } else if self.match_token(TokenType::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    pub(super) fn block(&mut self) {
        while !self.check(TokenType::RightBrace) && !self.check(TokenType::Eof) {
            self.declaration();
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.");
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenType::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::OpPrint);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenType::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::OpPop);
    }

    fn if_statement(&mut self) {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::OpJumpIfFalse);
        self.emit_op(OpCode::OpPop);
        self.statement();
        let else_jump = self.emit_jump(OpCode::OpJump);

        self.patch_jump(then_jump);
        self.emit_op(OpCode::OpPop);
        if self.match_token(TokenType::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.current_chunk().code.len();
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::OpJumpIfFalse);
        self.emit_op(OpCode::OpPop);

        let scope_depth = self.state().scope_depth;
        self.state_mut().loops.push(LoopState {
            scope_depth,
            break_jumps: Vec::new(),
        });

        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::OpPop);
        self.finish_loop();
    }

    /// `for (init; cond; incr) body`, compiled in place: the increment
    /// clause is jumped over on entry and looped back to after the body.
    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.");
        if self.match_token(TokenType::Semicolon) {
            // No initializer.
        } else if self.match_token(TokenType::Var) {
            self.var_declaration_in_for();
        } else {
            self.expression_statement_in_for();
        }

        let mut loop_start = self.current_chunk().code.len();
        let mut exit_jump = None;
        if !self.match_token(TokenType::Semicolon) {
            self.expression();
            self.consume(TokenType::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::OpJumpIfFalse));
            self.emit_op(OpCode::OpPop);
        }

        if !self.match_token(TokenType::RightParen) {
            let body_jump = self.emit_jump(OpCode::OpJump);
            let increment_start = self.current_chunk().code.len();
            self.expression();
            self.emit_op(OpCode::OpPop);
            self.consume(TokenType::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        let scope_depth = self.state().scope_depth;
        self.state_mut().loops.push(LoopState {
            scope_depth,
            break_jumps: Vec::new(),
        });

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(OpCode::OpPop);
        }
        self.finish_loop();
        self.end_scope();
    }

    // The for-initializer forms reuse the usual declarations but cannot be
    // `export`ed, so they go through these thin wrappers.
    fn var_declaration_in_for(&mut self) {
        let global = self.parse_variable("Expect variable name.", false);
        let name = self.previous.lexeme.clone();
        if self.match_token(TokenType::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::OpNil);
        }
        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        );
        self.define_variable(global, false, &name);
    }

    fn expression_statement_in_for(&mut self) {
        self.expression();
        self.consume(TokenType::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::OpPop);
    }

    fn return_statement(&mut self) {
        if self.state().kind == FunctionKind::Script {
            self.error("Can't return from top-level code.");
        }

        if self.match_token(TokenType::Semicolon) {
            self.emit_return();
        } else {
            if self.state().kind == FunctionKind::Initializer {
                self.error("Can't return a value from an initializer.");
            }
            self.expression();
            self.consume(TokenType::Semicolon, "Expect ';' after return value.");
            self.emit_op(OpCode::OpReturn);
        }
    }

    /// `break` unwinds the locals of the loop body, then jumps to a
    /// placeholder patched when the loop finishes compiling.
    fn break_statement(&mut self) {
        self.consume(TokenType::Semicolon, "Expect ';' after 'break'.");
        if self.state().loops.is_empty() {
            self.error("Can't use 'break' outside of a loop.");
            return;
        }
        let target_depth = self
            .state()
            .loops
            .last()
            .expect("loop state checked above")
            .scope_depth;
        self.emit_pops_to_depth(target_depth);
        let jump = self.emit_jump(OpCode::OpJump);
        self.state_mut()
            .loops
            .last_mut()
            .expect("loop state checked above")
            .break_jumps
            .push(jump);
    }

    /// Ends the innermost loop: every pending `break` lands here.
    fn finish_loop(&mut self) {
        let loop_state = self
            .state_mut()
            .loops
            .pop()
            .expect("finish_loop without open loop");
        for jump in loop_state.break_jumps {
            self.patch_jump(jump);
        }
    }

    /// `import "path";` pulls every export in; `import a, b from "path";`
    /// pulls the named ones.
    fn import_statement(&mut self) {
        if self.match_token(TokenType::String) {
            let path = self.previous.lexeme.clone();
            let path_const = self.string_constant(&path);
            self.consume(TokenType::Semicolon, "Expect ';' after import path.");
            self.emit_op(OpCode::OpImport);
            self.emit_byte(path_const);
            return;
        }

        let mut names = Vec::new();
        loop {
            self.consume(TokenType::Identifier, "Expect import name.");
            names.push(self.previous.lexeme.clone());
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        self.consume(TokenType::From, "Expect 'from' after import names.");
        self.consume(TokenType::String, "Expect module path string.");
        let path = self.previous.lexeme.clone();
        self.consume(TokenType::Semicolon, "Expect ';' after import path.");

        for name in names {
            let path_const = self.string_constant(&path);
            let name_const = self.identifier_constant(&name);
            self.emit_op(OpCode::OpImportFrom);
            self.emit_byte(path_const);
            self.emit_byte(name_const);
        }
    }
}
