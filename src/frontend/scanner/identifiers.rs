use super::Scanner;
use crate::frontend::token::Token;
use crate::frontend::token_type::{lookup_keyword, TokenType};

impl Scanner<'_> {
    pub(super) fn read_identifier(&mut self) -> Token {
        while let Some(byte) = self.peek() {
            if Self::is_alpha(byte) || Self::is_digit(byte) {
                self.current += 1;
            } else {
                break;
            }
        }

        let lexeme = std::str::from_utf8(&self.source[self.start..self.current])
            .expect("identifier bytes are ASCII");
        match lookup_keyword(lexeme) {
            Some(keyword) => self.make_token(keyword),
            None => self.make_token(TokenType::Identifier),
        }
    }
}
