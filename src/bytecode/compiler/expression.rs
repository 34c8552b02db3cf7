use crate::bytecode::compiler::precedence::{rule_for, Precedence};
use crate::bytecode::compiler::scope::FunctionKind;
use crate::bytecode::compiler::Compiler;
use crate::bytecode::op_code::OpCode;
use crate::frontend::token_type::TokenType;
use crate::runtime::value::Value;

impl Compiler<'_, '_> {
    pub(super) fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let prefix = rule_for(self.previous.token_type).prefix;
        let prefix = match prefix {
            Some(prefix) => prefix,
            None => {
                self.error("Expect expression.");
                return;
            }
        };

        // Only the loosest level may treat a following `=` as assignment;
        // deeper in, `a + b = c` must be rejected.
        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign);

        while precedence <= rule_for(self.current.token_type).precedence {
            self.advance();
            let infix = rule_for(self.previous.token_type)
                .infix
                .expect("token with infix precedence must have an infix rule");
            infix(self, can_assign);
        }

        if can_assign && self.match_token(TokenType::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    pub(super) fn number(&mut self, _can_assign: bool) {
        let value: f64 = self
            .previous
            .lexeme
            .parse()
            .expect("scanner only emits valid number lexemes");
        self.emit_constant(Value::Number(value));
    }

    pub(super) fn string(&mut self, _can_assign: bool) {
        let contents = self.previous.lexeme.clone();
        let handle = self.heap.intern(contents.as_bytes());
        self.emit_constant(Value::Obj(handle));
    }

    pub(super) fn literal(&mut self, _can_assign: bool) {
        match self.previous.token_type {
            TokenType::Nil => self.emit_op(OpCode::OpNil),
            TokenType::True => self.emit_op(OpCode::OpTrue),
            TokenType::False => self.emit_op(OpCode::OpFalse),
            _ => unreachable!("literal rule on non-literal token"),
        }
    }

    pub(super) fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after expression.");
    }

    pub(super) fn unary(&mut self, _can_assign: bool) {
        let operator = self.previous.token_type;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenType::Bang => self.emit_op(OpCode::OpNot),
            TokenType::Minus => self.emit_op(OpCode::OpNegate),
            _ => unreachable!("unary rule on non-unary token"),
        }
    }

    pub(super) fn binary(&mut self, _can_assign: bool) {
        let operator = self.previous.token_type;
        let rule = rule_for(operator);
        self.parse_precedence(rule.precedence.next());

        match operator {
            TokenType::Plus => self.emit_op(OpCode::OpAdd),
            TokenType::Minus => self.emit_op(OpCode::OpSubtract),
            TokenType::Star => self.emit_op(OpCode::OpMultiply),
            TokenType::Slash => self.emit_op(OpCode::OpDivide),
            TokenType::Percent => self.emit_op(OpCode::OpModulo),
            TokenType::EqualEqual => self.emit_op(OpCode::OpEqual),
            TokenType::BangEqual => self.emit_ops(OpCode::OpEqual, OpCode::OpNot),
            TokenType::Greater => self.emit_op(OpCode::OpGreater),
            TokenType::Less => self.emit_op(OpCode::OpLess),
            // <= and >= are negated reverse comparisons, NaN quirks and all.
            TokenType::GreaterEqual => self.emit_ops(OpCode::OpLess, OpCode::OpNot),
            TokenType::LessEqual => self.emit_ops(OpCode::OpGreater, OpCode::OpNot),
            _ => unreachable!("binary rule on non-binary token"),
        }
    }

    pub(super) fn and_op(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(OpCode::OpJumpIfFalse);
        self.emit_op(OpCode::OpPop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    pub(super) fn or_op(&mut self, _can_assign: bool) {
        let else_jump = self.emit_jump(OpCode::OpJumpIfFalse);
        let end_jump = self.emit_jump(OpCode::OpJump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::OpPop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    pub(super) fn variable(&mut self, can_assign: bool) {
        let name = self.previous.lexeme.clone();
        self.named_variable(&name, can_assign);
    }

    pub(super) fn call(&mut self, _can_assign: bool) {
        let arg_count = self.argument_list_open();
        self.emit_op(OpCode::OpCall);
        self.emit_byte(arg_count);
    }

    pub(super) fn dot(&mut self, can_assign: bool) {
        self.consume(TokenType::Identifier, "Expect property name after '.'.");
        let name = self.previous.lexeme.clone();
        let name_const = self.identifier_constant(&name);

        if can_assign && self.match_token(TokenType::Equal) {
            self.expression();
            self.emit_op(OpCode::OpSetProperty);
            self.emit_byte(name_const);
        } else if self.match_token(TokenType::LeftParen) {
            // Fused property access + call.
            let arg_count = self.argument_list_open();
            self.emit_op(OpCode::OpInvoke);
            self.emit_byte(name_const);
            self.emit_byte(arg_count);
        } else {
            self.emit_op(OpCode::OpGetProperty);
            self.emit_byte(name_const);
        }
    }

    pub(super) fn subscript(&mut self, can_assign: bool) {
        self.expression();
        self.consume(TokenType::RightBracket, "Expect ']' after index.");
        if can_assign && self.match_token(TokenType::Equal) {
            self.expression();
            self.emit_op(OpCode::OpStore);
        } else {
            self.emit_op(OpCode::OpIndex);
        }
    }

    pub(super) fn list_literal(&mut self, _can_assign: bool) {
        let mut count: usize = 0;
        if !self.check(TokenType::RightBracket) {
            loop {
                self.expression();
                count += 1;
                if count > 255 {
                    self.error("Can't have more than 255 items in a list literal.");
                }
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightBracket, "Expect ']' after list items.");
        self.emit_op(OpCode::OpBuildList);
        self.emit_byte(count.min(255) as u8);
    }

    pub(super) fn map_literal(&mut self, _can_assign: bool) {
        let mut pairs: usize = 0;
        if !self.check(TokenType::RightBrace) {
            loop {
                self.expression();
                self.consume(TokenType::Colon, "Expect ':' after map key.");
                self.expression();
                pairs += 1;
                if pairs > 255 {
                    self.error("Can't have more than 255 entries in a map literal.");
                }
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightBrace, "Expect '}' after map entries.");
        self.emit_op(OpCode::OpBuildMap);
        self.emit_byte(pairs.min(255) as u8);
    }

    pub(super) fn lambda(&mut self, _can_assign: bool) {
        self.function(FunctionKind::Function, None);
    }

    pub(super) fn this_expr(&mut self, _can_assign: bool) {
        if self.classes.is_empty() {
            self.error("Can't use 'this' outside of a class.");
            return;
        }
        self.named_variable("this", false);
    }

    pub(super) fn super_expr(&mut self, _can_assign: bool) {
        match self.classes.last() {
            None => {
                self.error("Can't use 'super' outside of a class.");
            }
            Some(class) if !class.has_superclass => {
                self.error("Can't use 'super' in a class with no superclass.");
            }
            Some(_) => {}
        }

        self.consume(TokenType::Dot, "Expect '.' after 'super'.");
        self.consume(TokenType::Identifier, "Expect superclass method name.");
        let name = self.previous.lexeme.clone();
        let name_const = self.identifier_constant(&name);

        self.named_variable("this", false);
        if self.match_token(TokenType::LeftParen) {
            let arg_count = self.argument_list_open();
            self.named_variable("super", false);
            self.emit_op(OpCode::OpSuperInvoke);
            self.emit_byte(name_const);
            self.emit_byte(arg_count);
        } else {
            self.named_variable("super", false);
            self.emit_op(OpCode::OpGetSuper);
            self.emit_byte(name_const);
        }
    }

    /// Arguments for a call whose `(` has just been matched by the caller.
    fn argument_list_open(&mut self) -> u8 {
        let mut count: usize = 0;
        if !self.check(TokenType::RightParen) {
            loop {
                self.expression();
                count += 1;
                if count > 255 {
                    self.error("Can't have more than 255 arguments.");
                }
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after arguments.");
        count.min(255) as u8
    }
}
