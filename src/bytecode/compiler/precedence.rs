use crate::bytecode::compiler::Compiler;
use crate::frontend::token_type::TokenType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * / %
    Unary,      // ! -
    Call,       // . () []
    Primary,
}

impl Precedence {
    /// The next-tighter level, used for left-associative binary operators.
    pub fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call => Precedence::Primary,
            Precedence::Primary => Precedence::Primary,
        }
    }
}

pub type ParseFn<'src, 'heap> = fn(&mut Compiler<'src, 'heap>, bool);

#[derive(Clone, Copy)]
pub struct ParseRule<'src, 'heap> {
    pub prefix: Option<ParseFn<'src, 'heap>>,
    pub infix: Option<ParseFn<'src, 'heap>>,
    pub precedence: Precedence,
}

fn rule<'src, 'heap>(
    prefix: Option<ParseFn<'src, 'heap>>,
    infix: Option<ParseFn<'src, 'heap>>,
    precedence: Precedence,
) -> ParseRule<'src, 'heap> {
    ParseRule {
        prefix,
        infix,
        precedence,
    }
}

/// The Pratt table: how each token behaves in prefix and infix position.
pub fn rule_for<'src, 'heap>(token_type: TokenType) -> ParseRule<'src, 'heap> {
    match token_type {
        TokenType::LeftParen => rule(
            Some(Compiler::grouping),
            Some(Compiler::call),
            Precedence::Call,
        ),
        TokenType::LeftBracket => rule(
            Some(Compiler::list_literal),
            Some(Compiler::subscript),
            Precedence::Call,
        ),
        TokenType::LeftBrace => rule(Some(Compiler::map_literal), None, Precedence::None),
        TokenType::Dot => rule(None, Some(Compiler::dot), Precedence::Call),
        TokenType::Minus => rule(
            Some(Compiler::unary),
            Some(Compiler::binary),
            Precedence::Term,
        ),
        TokenType::Plus => rule(None, Some(Compiler::binary), Precedence::Term),
        TokenType::Slash | TokenType::Star | TokenType::Percent => {
            rule(None, Some(Compiler::binary), Precedence::Factor)
        }
        TokenType::Bang => rule(Some(Compiler::unary), None, Precedence::None),
        TokenType::BangEqual | TokenType::EqualEqual => {
            rule(None, Some(Compiler::binary), Precedence::Equality)
        }
        TokenType::Greater
        | TokenType::GreaterEqual
        | TokenType::Less
        | TokenType::LessEqual => rule(None, Some(Compiler::binary), Precedence::Comparison),
        TokenType::Identifier => rule(Some(Compiler::variable), None, Precedence::None),
        TokenType::String => rule(Some(Compiler::string), None, Precedence::None),
        TokenType::Number => rule(Some(Compiler::number), None, Precedence::None),
        TokenType::And => rule(None, Some(Compiler::and_op), Precedence::And),
        TokenType::Or => rule(None, Some(Compiler::or_op), Precedence::Or),
        TokenType::True | TokenType::False | TokenType::Nil => {
            rule(Some(Compiler::literal), None, Precedence::None)
        }
        TokenType::This => rule(Some(Compiler::this_expr), None, Precedence::None),
        TokenType::Super => rule(Some(Compiler::super_expr), None, Precedence::None),
        TokenType::Fun => rule(Some(Compiler::lambda), None, Precedence::None),
        _ => rule(None, None, Precedence::None),
    }
}
