use super::Scanner;
use crate::frontend::token::Token;
use crate::frontend::token_type::TokenType;

impl Scanner<'_> {
    pub(super) fn read_number(&mut self) -> Token {
        while self.peek().map(Self::is_digit).unwrap_or(false) {
            self.current += 1;
        }

        // A fractional part only if a digit follows the dot, so `1.abs()`
        // still scans as number-dot-identifier.
        if self.peek() == Some(b'.') && self.peek_next().map(Self::is_digit).unwrap_or(false) {
            self.current += 1;
            while self.peek().map(Self::is_digit).unwrap_or(false) {
                self.current += 1;
            }
        }

        self.make_token(TokenType::Number)
    }
}
