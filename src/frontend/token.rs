use std::fmt;

use super::token_type::TokenType;

/// A single lexical token with its source line.
///
/// String tokens carry the unescaped string contents as their lexeme;
/// `Error` tokens carry the scanner's message.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: impl Into<String>, line: usize) -> Self {
        Self {
            token_type,
            lexeme: lexeme.into(),
            line,
        }
    }

    /// Placeholder token used to seed the compiler before the first advance.
    pub fn empty() -> Self {
        Self::new(TokenType::Eof, "", 0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token({}, {:?}, line {})",
            self.token_type, self.lexeme, self.line
        )
    }
}
